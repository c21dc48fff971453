//! Environment variable loading for [`ServerConfig`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use super::ServerConfig;
use super::validation::{require_nonempty, validate_flush_threshold, validate_public_url};
use crate::core::audio::DEFAULT_FLUSH_THRESHOLD;
use crate::utils::parse_bool;

fn required(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    let value = env::var(name).map_err(|_| format!("{name} environment variable is required"))?;
    require_nonempty(name, &value)?;
    Ok(value)
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_number<T: std::str::FromStr>(
    name: &str,
    value: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| format!("{name} must be a number, got '{value}'").into())
}

pub fn load_config() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let host = optional("HOST", "0.0.0.0");
    let port = parse_number::<u16>("PORT", &optional("PORT", "8000"))?;

    let public_url = required("PUBLIC_URL")?;
    validate_public_url(&public_url)?;

    let twilio_account_sid = required("TWILIO_ACCOUNT_SID")?;
    let twilio_auth_token = required("TWILIO_AUTH_TOKEN")?;
    let twilio_from_number = required("TWILIO_PHONE_NUMBER")?;
    let deepgram_api_key = required("DEEPGRAM_API_KEY")?;
    let google_api_key = required("GOOGLE_API_KEY")?;

    let audio_flush_threshold = parse_number::<usize>(
        "AUDIO_FLUSH_THRESHOLD",
        &optional(
            "AUDIO_FLUSH_THRESHOLD",
            &DEFAULT_FLUSH_THRESHOLD.to_string(),
        ),
    )?;
    validate_flush_threshold(audio_flush_threshold)?;

    let inter_call_delay = Duration::from_secs(parse_number::<u64>(
        "INTER_CALL_DELAY_SECS",
        &optional("INTER_CALL_DELAY_SECS", "5"),
    )?);
    let idle_poll_interval = Duration::from_secs(parse_number::<u64>(
        "IDLE_POLL_INTERVAL_SECS",
        &optional("IDLE_POLL_INTERVAL_SECS", "10"),
    )?);
    let max_idle_polls =
        parse_number::<u32>("MAX_IDLE_POLLS", &optional("MAX_IDLE_POLLS", "10"))?;

    Ok(ServerConfig {
        host,
        port,
        public_url,
        twilio_account_sid,
        twilio_auth_token,
        twilio_from_number,
        deepgram_api_key,
        google_api_key,
        stt_model: optional("DEEPGRAM_MODEL", "nova-2"),
        llm_model: optional("GEMINI_MODEL", "gemini-1.5-flash"),
        embedding_model: optional("EMBEDDING_MODEL", "text-embedding-004"),
        tts_voice: env::var("TTS_VOICE").ok().filter(|v| !v.trim().is_empty()),
        default_language: optional("DEFAULT_LANGUAGE", "en-US"),
        audio_flush_threshold,
        inter_call_delay,
        idle_poll_interval,
        max_idle_polls,
        save_call_records: parse_bool(&optional("SAVE_CALL_RECORDS", "true")),
        call_log_dir: PathBuf::from(optional("CALL_LOG_DIR", "logs")),
    })
}
