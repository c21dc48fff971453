//! Twilio REST client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{Telephony, TelephonyError};
use crate::config::ServerConfig;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

/// Thin client over the Calls resource. Outbound calls answer into our
/// `/outbound_call` webhook, which opens the media stream; lifecycle
/// updates arrive on `/call_status`.
pub struct TwilioClient {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    answer_url: String,
    status_callback_url: String,
}

impl TwilioClient {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
            answer_url: config.answer_url(),
            status_callback_url: config.status_callback_url(),
        }
    }

    fn calls_url(&self) -> String {
        format!("{TWILIO_API_BASE}/Accounts/{}/Calls.json", self.account_sid)
    }

    fn call_url(&self, call_sid: &str) -> String {
        format!(
            "{TWILIO_API_BASE}/Accounts/{}/Calls/{call_sid}.json",
            self.account_sid
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TelephonyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TelephonyError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Telephony for TwilioClient {
    async fn place_call(&self, to: &str) -> Result<String, TelephonyError> {
        debug!(%to, "placing call via Twilio");
        let params = [
            ("To", to),
            ("From", self.from_number.as_str()),
            ("Url", self.answer_url.as_str()),
            ("StatusCallback", self.status_callback_url.as_str()),
            ("StatusCallbackEvent", "initiated"),
            ("StatusCallbackEvent", "ringing"),
            ("StatusCallbackEvent", "answered"),
            ("StatusCallbackEvent", "completed"),
        ];
        let response = self
            .client
            .post(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let call: CallResource = response
            .json()
            .await
            .map_err(|e| TelephonyError::Malformed(e.to_string()))?;
        info!(call_sid = %call.sid, %to, "call placed");
        Ok(call.sid)
    }

    async fn end_call(&self, call_sid: &str) -> Result<(), TelephonyError> {
        let response = self
            .client
            .post(self.call_url(call_sid))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Status", "completed")])
            .send()
            .await?;
        Self::check(response).await?;
        info!(%call_sid, "call termination requested");
        Ok(())
    }
}
