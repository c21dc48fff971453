//! Registry of active call sessions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use super::{CallSession, CallSummary};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("call {0} is already registered")]
    Duplicate(String),
}

/// The only cross-call data structure in the server. Insert and remove
/// are atomic under a single lock; registering an already-present call
/// sid fails without touching the existing session.
#[derive(Default)]
pub struct CallRegistry {
    calls: RwLock<HashMap<String, Arc<CallSession>>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test-and-set insert keyed by call sid.
    pub fn register(&self, session: Arc<CallSession>) -> Result<(), RegistryError> {
        let mut calls = self.calls.write();
        let call_sid = session.call_sid().to_string();
        if calls.contains_key(&call_sid) {
            return Err(RegistryError::Duplicate(call_sid));
        }
        debug!(%call_sid, "call registered");
        calls.insert(call_sid, session);
        Ok(())
    }

    pub fn get(&self, call_sid: &str) -> Option<Arc<CallSession>> {
        self.calls.read().get(call_sid).cloned()
    }

    pub fn remove(&self, call_sid: &str) -> Option<Arc<CallSession>> {
        let removed = self.calls.write().remove(call_sid);
        if removed.is_some() {
            debug!(%call_sid, "call deregistered");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.calls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.read().is_empty()
    }

    /// Point-in-time snapshot for the REST surface.
    pub fn active_calls(&self) -> Vec<CallSummary> {
        self.calls.read().values().map(|s| s.summary()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::{CampaignContext, LeadContext};

    fn session(call_sid: &str) -> Arc<CallSession> {
        CallSession::new(
            call_sid.to_string(),
            LeadContext::unknown(),
            CampaignContext::fallback("en-US"),
        )
    }

    #[test]
    fn register_get_remove_roundtrip() {
        let registry = CallRegistry::new();
        registry.register(session("CA1")).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("CA1").is_some());
        assert!(registry.remove("CA1").is_some());
        assert!(registry.is_empty());
        assert!(registry.remove("CA1").is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected_and_original_untouched() {
        let registry = CallRegistry::new();
        let original = session("CA1");
        registry.register(original.clone()).unwrap();

        let imposter = session("CA1");
        assert!(matches!(
            registry.register(imposter),
            Err(RegistryError::Duplicate(_))
        ));

        let held = registry.get("CA1").unwrap();
        assert!(Arc::ptr_eq(&held, &original));
        assert_eq!(registry.len(), 1);
    }
}
