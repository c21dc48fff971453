use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, campaigns};
use crate::state::AppState;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health))
        .route("/api/calls", get(api::list_calls))
        .route("/api/call/{call_sid}", get(api::get_call))
        .route("/api/end_call/{call_sid}", post(api::end_call))
        .route("/upload_csv", post(campaigns::upload_csv))
        .layer(TraceLayer::new_for_http())
}
