//! Router assembly.

pub mod api;
pub mod webhooks;
pub mod ws;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// The complete application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::api_routes())
        .merge(webhooks::webhook_routes())
        .merge(ws::ws_routes())
        .with_state(state)
}
