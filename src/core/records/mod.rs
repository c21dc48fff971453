//! Completed-call record hand-off.
//!
//! At teardown the session's final state is handed to a sink. The
//! default sink appends one JSON line per call to a log directory;
//! recording failures are logged and never affect teardown.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::core::session::{CallStatus, ConversationTurn, LeadContext};

#[derive(Debug, Serialize)]
pub struct CallRecord {
    pub call_sid: String,
    pub status: CallStatus,
    pub lead: LeadContext,
    pub campaign: String,
    pub started_at_ms: u64,
    pub ended_at_ms: u64,
    pub turns: Vec<ConversationTurn>,
}

#[async_trait]
pub trait CallRecordSink: Send + Sync {
    async fn record_call(&self, record: CallRecord);
}

/// Appends records to `<dir>/calls.jsonl`, creating the directory on
/// first use.
pub struct JsonlRecordSink {
    dir: PathBuf,
}

impl JsonlRecordSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn append(&self, record: &CallRecord) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let line = serde_json::to_string(record).map_err(std::io::Error::other)?;
        let path = self.dir.join("calls.jsonl");
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

#[async_trait]
impl CallRecordSink for JsonlRecordSink {
    async fn record_call(&self, record: CallRecord) {
        match self.append(&record).await {
            Ok(()) => info!(call_sid = %record.call_sid, "call record written"),
            Err(e) => error!(
                call_sid = %record.call_sid,
                error = %e,
                "failed to persist call record"
            ),
        }
    }
}

/// Drops records, for deployments that do not keep call logs.
pub struct NullRecordSink;

#[async_trait]
impl CallRecordSink for NullRecordSink {
    async fn record_call(&self, record: CallRecord) {
        debug!(call_sid = %record.call_sid, "call record discarded");
    }
}
