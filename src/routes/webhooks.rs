use std::sync::Arc;

use axum::Router;
use axum::routing::post;
use tower_http::trace::TraceLayer;

use crate::handlers::webhooks;
use crate::state::AppState;

pub fn webhook_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/outbound_call", post(webhooks::outbound_call))
        .route("/call_status", post(webhooks::call_status))
        .layer(TraceLayer::new_for_http())
}
