use askama::Template;

use crate::models::CurrentUser;
use crate::wizard::forms::FieldView;

/// Default step-two template shared by the built-in entries.
#[derive(Template)]
#[template(path = "wizard/create.html")]
pub struct WizardCreateTemplate {
    pub current_user: CurrentUser,
    pub language: String,
    pub action_url: String,
    pub management_field: &'static str,
    pub goto_field: &'static str,
    pub current_step: String,
    pub back_step: String,
    pub step_number: usize,
    pub step_count: usize,
    pub entry_title: String,
    pub entry_description: String,
    pub non_field_errors: Vec<String>,
    pub hidden_fields: Vec<FieldView>,
    pub required_fields: Vec<FieldView>,
    pub optional_fields: Vec<FieldView>,
    pub optional_open: bool,
}
