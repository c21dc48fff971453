//! Telephony provider abstraction.

pub mod twilio;

pub use twilio::TwilioClient;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelephonyError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("telephony API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed telephony response: {0}")]
    Malformed(String),
}

/// Places and ends calls. The dialer and the REST surface only speak
/// through this trait, so tests run against a mock provider.
#[async_trait]
pub trait Telephony: Send + Sync {
    /// Places an outbound call and returns the provider's call sid.
    async fn place_call(&self, to: &str) -> Result<String, TelephonyError>;

    /// Terminates an in-progress call.
    async fn end_call(&self, call_sid: &str) -> Result<(), TelephonyError>;
}
