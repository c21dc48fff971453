//! Media stream frame types.
//!
//! Twilio media streams exchange JSON text frames tagged by an `event`
//! field. Inbound audio payloads are base64 8 kHz mono mu-law; outbound
//! audio uses the same encoding, each `media` frame followed by a `mark`
//! frame the bridge echoes back once playback of that audio completes.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundEvent {
    Start {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        start: Option<StartMeta>,
    },
    Media {
        media: MediaPayload,
    },
    Dtmf {
        dtmf: DtmfPayload,
    },
    Mark {
        mark: MarkPayload,
    },
    Stop,
    /// Anything else (`connected`, future event types): logged, ignored.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct StartMeta {
    #[serde(rename = "callSid")]
    pub call_sid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    /// Base64 wire audio.
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct DtmfPayload {
    pub digit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkPayload {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundEvent {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: OutboundMark,
    },
    /// Discards all audio queued on the bridge; the barge-in signal.
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMark {
    pub name: String,
}

impl OutboundEvent {
    pub fn media(stream_sid: &str, wire_audio: &[u8]) -> Self {
        OutboundEvent::Media {
            stream_sid: stream_sid.to_string(),
            media: OutboundMedia {
                payload: BASE64.encode(wire_audio),
            },
        }
    }

    pub fn mark(stream_sid: &str, name: String) -> Self {
        OutboundEvent::Mark {
            stream_sid: stream_sid.to_string(),
            mark: OutboundMark { name },
        }
    }

    pub fn clear(stream_sid: &str) -> Self {
        OutboundEvent::Clear {
            stream_sid: stream_sid.to_string(),
        }
    }
}
