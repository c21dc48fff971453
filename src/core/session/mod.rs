//! Per-call session state.
//!
//! A [`CallSession`] is created when the dialer places a call (or lazily
//! when a media stream connects for an unknown call sid) and lives in
//! the [`CallRegistry`] until teardown. It holds the lead and campaign
//! context, the conversation so far, and the flags the barge-in path
//! coordinates through.

pub mod conversation;
pub mod events;
pub mod pipeline;
pub mod registry;

pub use conversation::{ConversationHistory, ConversationTurn, Role};
pub use pipeline::ResponsePipeline;
pub use registry::{CallRegistry, RegistryError};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::llm::prompt;
use crate::core::records::CallRecord;
use crate::utils::now_ms;

/// Call lifecycle. `Listening` and `Speaking` alternate during the
/// conversation; `Ended` and `Interrupted` are terminal and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// Placed but no media stream yet.
    Connecting,
    /// Media stream started.
    Connected,
    Listening,
    Speaking,
    /// Ended through the normal lifecycle (status webhook or hangup).
    Ended,
    /// Torn down before reaching a terminal business status.
    Interrupted,
}

impl CallStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, CallStatus::Ended | CallStatus::Interrupted)
    }
}

/// Who is being called, from the campaign CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadContext {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub organisation: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
}

impl LeadContext {
    /// Placeholder for streams that connect without a dialer-seeded
    /// session.
    pub fn unknown() -> Self {
        Self {
            name: "there".to_string(),
            phone: String::new(),
            email: None,
            organisation: None,
            designation: None,
        }
    }
}

/// What the call is about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignContext {
    pub name: String,
    pub description: String,
    pub language: String,
}

impl CampaignContext {
    pub fn fallback(language: &str) -> Self {
        Self {
            name: "Reacho".to_string(),
            description: String::new(),
            language: language.to_string(),
        }
    }
}

/// Registry-level view of a call for the REST surface.
#[derive(Debug, Clone, Serialize)]
pub struct CallSummary {
    pub call_sid: String,
    pub status: CallStatus,
    pub lead_name: String,
    pub phone: String,
    pub started_at_ms: u64,
    pub turns: usize,
}

pub struct CallSession {
    call_sid: String,
    lead: LeadContext,
    campaign: CampaignContext,
    started_at_ms: u64,

    status: RwLock<CallStatus>,
    stream_sid: RwLock<Option<String>>,
    history: RwLock<ConversationHistory>,
    /// Concatenation of everything the caller said.
    transcript: RwLock<String>,
    /// Everything the agent said, one entry per response.
    responses: RwLock<Vec<String>>,

    /// True while a response pipeline may still emit audio; the barge-in
    /// decision point in the session loop reads it.
    synthesis_in_flight: AtomicBool,
    /// One media stream per call; a second attach is rejected.
    transport_attached: AtomicBool,
    /// Marks sent but not yet confirmed by the bridge.
    pending_marks: AtomicUsize,
}

impl CallSession {
    pub fn new(call_sid: String, lead: LeadContext, campaign: CampaignContext) -> Arc<Self> {
        let mut history = ConversationHistory::default();
        history.push(Role::System, prompt::persona(&lead, &campaign), None);
        Arc::new(Self {
            call_sid,
            lead,
            campaign,
            started_at_ms: now_ms(),
            status: RwLock::new(CallStatus::Connecting),
            stream_sid: RwLock::new(None),
            history: RwLock::new(history),
            transcript: RwLock::new(String::new()),
            responses: RwLock::new(Vec::new()),
            synthesis_in_flight: AtomicBool::new(false),
            transport_attached: AtomicBool::new(false),
            pending_marks: AtomicUsize::new(0),
        })
    }

    pub fn call_sid(&self) -> &str {
        &self.call_sid
    }

    pub fn lead(&self) -> &LeadContext {
        &self.lead
    }

    pub fn campaign(&self) -> &CampaignContext {
        &self.campaign
    }

    pub fn language(&self) -> &str {
        &self.campaign.language
    }

    pub fn status(&self) -> CallStatus {
        *self.status.read()
    }

    /// Transitions status. Terminal statuses are absorbing: once `Ended`
    /// or `Interrupted` is recorded no further transition applies.
    pub fn set_status(&self, next: CallStatus) -> bool {
        let mut status = self.status.write();
        if status.is_terminal() {
            return false;
        }
        debug!(call_sid = %self.call_sid, from = ?*status, to = ?next, "status transition");
        *status = next;
        true
    }

    pub fn stream_sid(&self) -> Option<String> {
        self.stream_sid.read().clone()
    }

    pub fn set_stream_sid(&self, stream_sid: String) {
        *self.stream_sid.write() = Some(stream_sid);
    }

    /// Claims the transport slot. Returns false if a media stream is
    /// already attached; the caller must reject the new stream and leave
    /// the existing one alone.
    pub fn attach_transport(&self) -> bool {
        !self.transport_attached.swap(true, Ordering::SeqCst)
    }

    pub fn detach_transport(&self) {
        self.transport_attached.store(false, Ordering::SeqCst);
    }

    pub fn has_transport(&self) -> bool {
        self.transport_attached.load(Ordering::SeqCst)
    }

    pub fn synthesis_in_flight(&self) -> bool {
        self.synthesis_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_synthesis_in_flight(&self, value: bool) {
        self.synthesis_in_flight.store(value, Ordering::SeqCst);
    }

    pub fn mark_sent(&self) {
        self.pending_marks.fetch_add(1, Ordering::SeqCst);
    }

    pub fn mark_confirmed(&self) {
        let _ = self
            .pending_marks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn pending_marks(&self) -> usize {
        self.pending_marks.load(Ordering::SeqCst)
    }

    pub fn push_user_turn(&self, text: &str, embedding: Option<Vec<f32>>) {
        {
            let mut transcript = self.transcript.write();
            if !transcript.is_empty() {
                transcript.push(' ');
            }
            transcript.push_str(text);
        }
        self.history.write().push(Role::User, text, embedding);
    }

    pub fn push_assistant_turn(&self, text: &str) {
        self.responses.write().push(text.to_string());
        self.history.write().push(Role::Assistant, text, None);
    }

    pub fn transcript(&self) -> String {
        self.transcript.read().clone()
    }

    pub fn responses(&self) -> Vec<String> {
        self.responses.read().clone()
    }

    /// Rendered spoken history, for prompt context.
    pub fn render_history(&self) -> String {
        self.history.read().render()
    }

    pub fn history_snapshot(&self) -> Vec<ConversationTurn> {
        self.history.read().turns().to_vec()
    }

    pub fn summary(&self) -> CallSummary {
        CallSummary {
            call_sid: self.call_sid.clone(),
            status: self.status(),
            lead_name: self.lead.name.clone(),
            phone: self.lead.phone.clone(),
            started_at_ms: self.started_at_ms,
            turns: self.history.read().len(),
        }
    }

    /// Final record handed to the record sink at teardown.
    pub fn to_record(&self) -> CallRecord {
        CallRecord {
            call_sid: self.call_sid.clone(),
            status: self.status(),
            lead: self.lead.clone(),
            campaign: self.campaign.name.clone(),
            started_at_ms: self.started_at_ms,
            ended_at_ms: now_ms(),
            turns: self.history_snapshot(),
        }
    }
}
