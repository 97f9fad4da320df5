use askama::Template;

/// Bare page carrying one escaped message, used for error responses.
#[derive(Template)]
#[template(path = "message.html")]
pub struct MessageTemplate<'a> {
    pub message: &'a str,
}
