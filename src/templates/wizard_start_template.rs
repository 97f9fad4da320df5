use askama::Template;

use crate::models::CurrentUser;
use crate::wizard::forms::FieldView;

#[derive(Template)]
#[template(path = "wizard/start.html")]
pub struct WizardStartTemplate {
    pub current_user: CurrentUser,
    pub language: String,
    pub action_url: String,
    pub management_field: &'static str,
    pub current_step: String,
    pub step_number: usize,
    pub step_count: usize,
    pub non_field_errors: Vec<String>,
    pub fields: Vec<FieldView>,
    pub has_entries: bool,
}
