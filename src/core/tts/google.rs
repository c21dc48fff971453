//! Google Cloud Text-to-Speech REST client.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;

use super::base::{BaseSynthesizer, NativeAudio, TtsError};

const SYNTHESIZE_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Native PCM rate requested from the provider. Downsampled to the wire
/// rate by the codec after chunking.
pub const NATIVE_SAMPLE_RATE: u32 = 24_000;

/// LINEAR16 responses arrive as WAV; the header is this many bytes.
const WAV_HEADER_LEN: usize = 44;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Per-request synthesis client. Stateless; one HTTP round trip per
/// sentence unit.
#[derive(Clone)]
pub struct GoogleSynthesizer {
    client: reqwest::Client,
    api_key: String,
    voice: Option<String>,
}

impl GoogleSynthesizer {
    pub fn new(api_key: String, voice: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
        }
    }

    fn request_body(&self, text: &str, language: &str) -> serde_json::Value {
        let mut voice = json!({ "languageCode": language });
        if let Some(name) = &self.voice {
            voice["name"] = json!(name);
        }
        json!({
            "input": { "text": text },
            "voice": voice,
            "audioConfig": {
                "audioEncoding": "LINEAR16",
                "sampleRateHertz": NATIVE_SAMPLE_RATE,
            }
        })
    }
}

/// Strips the RIFF/WAV header the LINEAR16 encoding carries, leaving
/// raw PCM samples.
fn strip_wav_header(audio: Vec<u8>) -> Vec<u8> {
    if audio.len() > WAV_HEADER_LEN && audio.starts_with(b"RIFF") {
        audio[WAV_HEADER_LEN..].to_vec()
    } else {
        audio
    }
}

#[async_trait]
impl BaseSynthesizer for GoogleSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> Result<NativeAudio, TtsError> {
        let response = self
            .client
            .post(SYNTHESIZE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(text, language))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TtsError::Status(response.status().as_u16()));
        }

        let parsed: SynthesizeResponse = response.json().await?;
        let audio = BASE64
            .decode(parsed.audio_content.as_bytes())
            .map_err(|e| TtsError::Malformed(format!("audio content is not base64: {e}")))?;
        if audio.is_empty() {
            return Err(TtsError::Malformed("empty audio content".to_string()));
        }

        Ok(NativeAudio {
            pcm: strip_wav_header(audio),
            sample_rate: NATIVE_SAMPLE_RATE,
        })
    }
}
