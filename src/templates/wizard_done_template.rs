use askama::Template;

/// Terminal page: sends the client to the created object.
#[derive(Template)]
#[template(path = "wizard/done.html")]
pub struct WizardDoneTemplate {
    pub url: String,
}
