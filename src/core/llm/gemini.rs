//! Gemini REST clients for response generation and embeddings.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::base::{EmbeddingClient, FALLBACK_RESPONSE, LlmError, TokenGenerator};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Deserialize)]
struct StreamChunk {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Streaming token generator over `streamGenerateContent` with SSE
/// framing. Tokens are forwarded as they arrive; any failure ends the
/// stream with the fallback apology instead of an error.
#[derive(Clone)]
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    async fn run_stream(&self, prompt: String, tx: &mpsc::Sender<String>) -> Result<(), LlmError> {
        let url = format!(
            "{GEMINI_BASE_URL}/{}:streamGenerateContent?alt=sse",
            self.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LlmError::Status(response.status().as_u16()));
        }

        let mut body = response.bytes_stream();
        let mut pending = String::new();
        let mut sent_any = false;

        while let Some(frame) = body.next().await {
            let frame = frame?;
            pending.push_str(&String::from_utf8_lossy(&frame));

            while let Some(newline) = pending.find('\n') {
                let line = pending[..newline].trim().to_string();
                pending.drain(..=newline);

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() || data == "[DONE]" {
                    continue;
                }
                let chunk: StreamChunk = match serde_json::from_str(data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        debug!(error = %e, "skipping unparseable stream event");
                        continue;
                    }
                };
                for text in extract_texts(&chunk) {
                    if tx.send(text).await.is_err() {
                        // Receiver gone (barge-in); stop consuming upstream.
                        return Ok(());
                    }
                    sent_any = true;
                }
            }
        }

        if !sent_any {
            return Err(LlmError::EmptyStream);
        }
        Ok(())
    }
}

fn extract_texts(chunk: &StreamChunk) -> Vec<String> {
    chunk
        .candidates
        .iter()
        .flatten()
        .filter_map(|c| c.content.as_ref())
        .filter_map(|c| c.parts.as_ref())
        .flatten()
        .filter_map(|p| p.text.clone())
        .filter(|t| !t.is_empty())
        .collect()
}

#[async_trait]
impl TokenGenerator for GeminiGenerator {
    async fn stream_response(&self, prompt: String) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(32);
        let generator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = generator.run_stream(prompt, &tx).await {
                warn!(error = %e, "generation failed, falling back to apology");
                let _ = tx.send(FALLBACK_RESPONSE.to_string()).await;
            }
        });
        rx
    }
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbedValues,
}

#[derive(Debug, Deserialize)]
struct EmbedValues {
    values: Vec<f32>,
}

/// Embedding client over the `embedContent` endpoint.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let url = format!("{GEMINI_BASE_URL}/{}:embedContent", self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "content": { "parts": [{ "text": text }] } }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LlmError::Status(response.status().as_u16()));
        }
        let parsed: EmbedResponse = response.json().await?;
        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl EmbeddingClient for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        match self.request_embedding(text).await {
            Ok(values) => Some(values),
            Err(e) => {
                warn!(error = %e, "embedding request failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_all_parts_from_a_chunk() {
        let chunk: StreamChunk = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello"},{"text":" there."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_texts(&chunk), vec!["Hello", " there."]);
    }

    #[test]
    fn tolerates_missing_fields() {
        let chunk: StreamChunk = serde_json::from_str(r#"{"candidates":[{}]}"#).unwrap();
        assert!(extract_texts(&chunk).is_empty());
        let chunk: StreamChunk = serde_json::from_str(r#"{}"#).unwrap();
        assert!(extract_texts(&chunk).is_empty());
    }
}
