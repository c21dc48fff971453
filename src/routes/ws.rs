use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers::stream;
use crate::state::AppState;

pub fn ws_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stream/{call_sid}", get(stream::stream_handler))
        .layer(TraceLayer::new_for_http())
}
