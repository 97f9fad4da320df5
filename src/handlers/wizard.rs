use std::collections::HashMap;

use axum::{
    body::to_bytes,
    extract::{FromRequest, Multipart, OriginalUri, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::models::{AppState, CurrentUser};
use crate::templates::{WizardCreateTemplate, WizardDoneTemplate, WizardStartTemplate};
use crate::utils::{first_values, parse_urlencoded_body};
use crate::wizard::controller::{GOTO_STEP_FIELD, MANAGEMENT_FIELD, PAGE_HINT_PARAM};
use crate::wizard::registry::DEFAULT_ENTRY_TEMPLATE;
use crate::wizard::storage::SESSION_COOKIE;
use crate::wizard::{
    RawData, Step, StepView, UploadedFile, WizardController, WizardError, WizardRequest, WizardResponse,
    START_TEMPLATE,
};
use super::helpers::{
    current_user_from_headers, plain_html, render_template, request_language, session_id_from_jar,
    wizard_error_response,
};

/// Largest accepted urlencoded step submission.
const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

/// A submission, already split into fields and uploads.
struct Submission {
    data: RawData,
    uploads: Vec<UploadedFile>,
}

pub async fn wizard_get(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    dispatch(&state, jar, &headers, &uri, &q, None).await
}

pub async fn wizard_get_localized(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    jar: CookieJar,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if state.languages.supported_variant(&lang).is_none() {
        return plain_html(StatusCode::NOT_FOUND, "Not Found");
    }
    dispatch(&state, jar, &headers, &uri, &q, None).await
}

pub async fn wizard_post(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Query(q): Query<HashMap<String, String>>,
    request: Request,
) -> Response {
    let submission = match read_submission(&state, request).await {
        Ok(s) => s,
        Err(r) => return r,
    };
    dispatch(&state, jar, &headers, &uri, &q, Some(submission)).await
}

pub async fn wizard_post_localized(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    jar: CookieJar,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Query(q): Query<HashMap<String, String>>,
    request: Request,
) -> Response {
    if state.languages.supported_variant(&lang).is_none() {
        return plain_html(StatusCode::NOT_FOUND, "Not Found");
    }
    let submission = match read_submission(&state, request).await {
        Ok(s) => s,
        Err(r) => return r,
    };
    dispatch(&state, jar, &headers, &uri, &q, Some(submission)).await
}

async fn read_submission(state: &AppState, request: Request) -> Result<Submission, Response> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if !is_multipart {
        let bytes = to_bytes(request.into_body(), MAX_FORM_BYTES).await.map_err(|e| {
            tracing::warn!(%e, "Failed to read form body");
            plain_html(StatusCode::BAD_REQUEST, "Could not read the submitted form.")
        })?;
        let data = first_values(parse_urlencoded_body(&bytes));
        return Ok(Submission {
            data,
            uploads: Vec::new(),
        });
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| e.into_response())?;
    let mut data = RawData::new();
    let mut uploads = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(%e, "Malformed multipart submission");
                return Err(plain_html(StatusCode::BAD_REQUEST, "Could not read the submitted form."));
            }
        };
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        match file_name {
            Some(file_name) => {
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::warn!(%e, field = %name, "Failed to read upload");
                    plain_html(StatusCode::BAD_REQUEST, "Could not read the uploaded file.")
                })?;
                uploads.push(UploadedFile {
                    field: name,
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            None => {
                let value = field.text().await.map_err(|e| {
                    tracing::warn!(%e, field = %name, "Failed to read form field");
                    plain_html(StatusCode::BAD_REQUEST, "Could not read the submitted form.")
                })?;
                data.entry(name).or_insert(value);
            }
        }
    }
    Ok(Submission { data, uploads })
}

/// Run one wizard request. The language and acting user are fixed here and
/// stay the same for everything the request does.
async fn dispatch(
    state: &AppState,
    jar: CookieJar,
    headers: &HeaderMap,
    uri: &axum::http::Uri,
    q: &HashMap<String, String>,
    submission: Option<Submission>,
) -> Response {
    let language = request_language(state, headers, &jar, uri.path());
    let user = current_user_from_headers(state, headers);
    let page_hint = q
        .get(PAGE_HINT_PARAM)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    let request = WizardRequest::new(user.clone(), language.clone(), page_hint);

    let session_id = session_id_from_jar(&jar);
    let session = state.wizard_sessions.load_or_create(session_id.as_deref());
    let mut controller = WizardController::new(state.wizard_context(), request, session);

    let result = match submission {
        None => controller.get().await,
        Some(Submission { data, uploads }) => controller.post(data, uploads).await,
    };

    let session = controller.into_session();
    let jar = if matches!(result, Ok(WizardResponse::Done(_))) {
        // A finished wizard has nothing left to resume.
        state.wizard_sessions.remove(&session.id);
        let mut cookie = Cookie::new(SESSION_COOKIE, "");
        cookie.set_path("/");
        jar.remove(cookie)
    } else {
        let mut cookie = Cookie::new(SESSION_COOKIE, session.id.clone());
        cookie.set_path("/");
        cookie.set_http_only(true);
        state.wizard_sessions.save(session);
        jar.add(cookie)
    };

    let response = match result {
        Ok(WizardResponse::Render(view)) => {
            let action_url = uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| uri.path().to_string());
            render_step(view, user, language, action_url)
        }
        Ok(WizardResponse::Done(completed)) => render_template(WizardDoneTemplate { url: completed.url }),
        Err(e) => wizard_error_response(&e),
    };
    (jar, response).into_response()
}

fn render_step(mut view: StepView, current_user: CurrentUser, language: String, action_url: String) -> Response {
    let step = view.step;
    let non_field_errors = view.form.non_field_errors();
    let fields = view.form.field_views();

    match view.template_name.as_str() {
        START_TEMPLATE => render_template(WizardStartTemplate {
            current_user,
            language,
            action_url,
            management_field: MANAGEMENT_FIELD,
            current_step: step.as_str().to_string(),
            step_number: step.number(),
            step_count: Step::ALL.len(),
            non_field_errors,
            has_entries: fields.iter().any(|f| !f.choices.is_empty()),
            fields,
        }),
        DEFAULT_ENTRY_TEMPLATE => {
            let (entry_title, entry_description) = match &view.entry {
                Some(entry) => (entry.title().to_string(), entry.description().to_string()),
                None => (String::new(), String::new()),
            };
            let (hidden_fields, visible): (Vec<_>, Vec<_>) = fields.into_iter().partition(|f| f.widget == "hidden");
            let (required_fields, optional_fields): (Vec<_>, Vec<_>) = visible.into_iter().partition(|f| f.required);
            let optional_open = optional_fields
                .iter()
                .any(|f| !f.errors.is_empty() || !f.value.is_empty());
            render_template(WizardCreateTemplate {
                current_user,
                language,
                action_url,
                management_field: MANAGEMENT_FIELD,
                goto_field: GOTO_STEP_FIELD,
                current_step: step.as_str().to_string(),
                back_step: step.prev().unwrap_or_else(Step::first).as_str().to_string(),
                step_number: step.number(),
                step_count: Step::ALL.len(),
                entry_title,
                entry_description,
                non_field_errors,
                hidden_fields,
                required_fields,
                optional_fields,
                optional_open,
            })
        }
        other => {
            let err = WizardError::Template(askama::Error::Custom(
                format!("no template named '{}'", other).into(),
            ));
            wizard_error_response(&err)
        }
    }
}
