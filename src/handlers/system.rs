use axum::{extract::State, response::IntoResponse};

use crate::models::AppState;

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!(entries = state.registry.len(), pages = state.store.page_count(), "Health check");
    "ok"
}
