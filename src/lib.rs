//! Reacho: outbound voice AI call server.
//!
//! Drives real-time phone conversations over Twilio media streams: inbound
//! caller audio is buffered and streamed to a speech recognizer, final
//! transcripts drive an LLM token stream, and the reply is synthesized
//! sentence-by-sentence back onto the call, with caller barge-in support.

pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod telephony;
pub mod utils;

pub use config::ServerConfig;
pub use errors::{AppError, AppResult};
pub use state::AppState;
