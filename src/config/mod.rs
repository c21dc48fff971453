//! Server configuration loaded from environment variables.

pub mod env;
pub mod validation;

use std::path::PathBuf;
use std::time::Duration;

use crate::core::stt::RecognizerConfig;
use crate::scheduler::SchedulerConfig;

/// Complete server configuration.
///
/// Credentials for the telephony, recognition, and generation/synthesis
/// collaborators are required at startup; tunables fall back to the
/// defaults the production deployment runs with.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host for the HTTP server.
    pub host: String,
    /// Bind port for the HTTP server.
    pub port: u16,
    /// Publicly reachable base URL (webhooks and the media stream URL are
    /// derived from it).
    pub public_url: String,

    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    /// E.164 caller ID used as the `From` number on outbound calls.
    pub twilio_from_number: String,

    pub deepgram_api_key: String,
    pub google_api_key: String,

    /// Recognition model name.
    pub stt_model: String,
    /// Generation model name.
    pub llm_model: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Synthesis voice name, provider default when unset.
    pub tts_voice: Option<String>,
    /// BCP-47 language tag used when a campaign does not specify one.
    pub default_language: String,

    /// Bytes of inbound wire audio accumulated before a recognition flush.
    pub audio_flush_threshold: usize,
    /// Pause between consecutive outbound call placements.
    pub inter_call_delay: Duration,
    /// Dialer poll interval while the queue is empty.
    pub idle_poll_interval: Duration,
    /// Consecutive empty polls before the dialer loop exits to idle.
    pub max_idle_polls: u32,

    /// Whether completed call records are appended to disk.
    pub save_call_records: bool,
    /// Directory for the call record log.
    pub call_log_dir: PathBuf,
}

impl ServerConfig {
    /// Loads configuration from the environment. Missing or malformed
    /// required variables are startup errors.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        env::load_config()
    }

    /// WebSocket URL Twilio should open the media stream against.
    pub fn ws_stream_url(&self, call_sid: &str) -> String {
        let base = self.public_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("wss://{base}")
        };
        format!("{ws_base}/stream/{call_sid}")
    }

    /// Answer webhook URL handed to the telephony provider.
    pub fn answer_url(&self) -> String {
        format!("{}/outbound_call", self.public_url.trim_end_matches('/'))
    }

    /// Call lifecycle status callback URL.
    pub fn status_callback_url(&self) -> String {
        format!("{}/call_status", self.public_url.trim_end_matches('/'))
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            inter_call_delay: self.inter_call_delay,
            idle_poll_interval: self.idle_poll_interval,
            max_idle_polls: self.max_idle_polls,
        }
    }

    /// Recognizer configuration for a telephony-leg stream in the given
    /// language: 8 kHz mono mu-law, matching the media stream wire format.
    pub fn recognizer_config(&self, language: &str) -> RecognizerConfig {
        RecognizerConfig::telephony(
            self.deepgram_api_key.clone(),
            self.stt_model.clone(),
            language.to_string(),
        )
    }
}

impl Default for ServerConfig {
    /// Placeholder configuration with inert credentials. Intended for
    /// tests that inject mock collaborators; `from_env` never uses it.
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            public_url: "https://example.invalid".to_string(),
            twilio_account_sid: "ACxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx".to_string(),
            twilio_auth_token: "test-token".to_string(),
            twilio_from_number: "+15550000000".to_string(),
            deepgram_api_key: "test-key".to_string(),
            google_api_key: "test-key".to_string(),
            stt_model: "nova-2".to_string(),
            llm_model: "gemini-1.5-flash".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            tts_voice: None,
            default_language: "en-US".to_string(),
            audio_flush_threshold: crate::core::audio::DEFAULT_FLUSH_THRESHOLD,
            inter_call_delay: Duration::from_secs(5),
            idle_poll_interval: Duration::from_secs(10),
            max_idle_polls: 10,
            save_call_records: false,
            call_log_dir: PathBuf::from("logs"),
        }
    }
}
