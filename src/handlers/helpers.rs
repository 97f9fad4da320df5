use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use askama::Template;
use axum_extra::extract::cookie::CookieJar;

use crate::models::{AppState, CurrentUser, UserRole};
use crate::templates::MessageTemplate;
use crate::wizard::language::LANGUAGE_COOKIE;
use crate::wizard::storage::SESSION_COOKIE;
use crate::wizard::WizardError;

pub fn session_id_from_jar(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Acting user as asserted by the upstream proxy. Requests without the user
/// header are anonymous; an unknown or missing role means viewer.
pub fn current_user_from_headers(state: &AppState, headers: &HeaderMap) -> CurrentUser {
    let username = headers
        .get(state.remote_user_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty());
    let Some(username) = username else {
        return CurrentUser::anonymous();
    };
    let role = headers
        .get(state.remote_role_header.as_str())
        .and_then(|v| v.to_str().ok())
        .and_then(UserRole::from_str)
        .unwrap_or(UserRole::Viewer);
    CurrentUser::new(username, role)
}

/// Language for this request, fixed for the rest of its handling.
pub fn request_language(state: &AppState, headers: &HeaderMap, jar: &CookieJar, path: &str) -> String {
    let cookie = jar.get(LANGUAGE_COOKIE).map(|c| c.value().to_string());
    let accept = headers
        .get(axum::http::header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());
    state.languages.resolve(path, cookie.as_deref(), accept)
}

pub fn plain_html<S: AsRef<str>>(status: StatusCode, s: S) -> Response {
    let page = MessageTemplate { message: s.as_ref() };
    match page.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            tracing::error!(%e, "Template render error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

pub fn render_template<T: askama::Template>(t: T) -> Response {
    match t.render() {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            tracing::error!(%e, "Template render error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

pub fn wizard_error_response(err: &WizardError) -> Response {
    let status = match err {
        WizardError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(%err, "Wizard request failed");
        plain_html(status, "The content could not be created. Please try again.")
    } else {
        tracing::warn!(%err, "Rejected wizard request");
        plain_html(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn messages_are_html_escaped() {
        let response = plain_html(StatusCode::BAD_REQUEST, "<script>alert('x')</script> & more");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;"));
        assert!(body.contains("&amp; more"));
    }
}
