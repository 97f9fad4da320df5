use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::models::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/wizard/create/",
            get(handlers::wizard::wizard_get).post(handlers::wizard::wizard_post),
        )
        .route(
            "/:lang/wizard/create/",
            get(handlers::wizard::wizard_get_localized).post(handlers::wizard::wizard_post_localized),
        )
        .route("/healthz", get(handlers::system::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
