//! Startup validation for configuration values.

/// Rejects empty or whitespace-only required values.
pub fn require_nonempty(name: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    if value.trim().is_empty() {
        return Err(format!("{name} must not be empty").into());
    }
    Ok(())
}

/// The public base URL must carry an explicit http(s) scheme so webhook
/// and stream URLs can be derived from it.
pub fn validate_public_url(value: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(format!(
            "PUBLIC_URL must start with http:// or https://, got '{value}'"
        )
        .into());
    }
    Ok(())
}

/// Flush thresholds below one wire frame (160 bytes = 20 ms) would flush
/// on every inbound frame and defeat the buffer entirely.
pub fn validate_flush_threshold(value: usize) -> Result<(), Box<dyn std::error::Error>> {
    if value < 160 {
        return Err(format!("AUDIO_FLUSH_THRESHOLD must be at least 160 bytes, got {value}").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_nonempty_rejects_whitespace() {
        assert!(require_nonempty("X", "   ").is_err());
        assert!(require_nonempty("X", "value").is_ok());
    }

    #[test]
    fn public_url_needs_scheme() {
        assert!(validate_public_url("example.ngrok.io").is_err());
        assert!(validate_public_url("https://example.ngrok.io").is_ok());
        assert!(validate_public_url("http://localhost:8000").is_ok());
    }

    #[test]
    fn flush_threshold_floor() {
        assert!(validate_flush_threshold(100).is_err());
        assert!(validate_flush_threshold(12_000).is_ok());
    }
}
