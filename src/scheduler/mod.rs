//! Outbound call queue and dialer loop.
//!
//! Campaign uploads enqueue call requests; a single dialer loop drains
//! them in FIFO order, pacing placements so the telephony account is
//! not hammered. The loop is demand-driven: it exits to idle after a
//! run of empty polls and is restarted by the next enqueue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info};

use crate::core::session::{CallRegistry, CallSession, CampaignContext, LeadContext};
use crate::telephony::Telephony;

/// A lead waiting to be dialed, with its campaign context.
#[derive(Debug, Clone)]
pub struct QueuedCallRequest {
    pub lead: LeadContext,
    pub campaign: CampaignContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DialerState {
    Idle,
    Running,
}

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Pause after each placement.
    pub inter_call_delay: Duration,
    /// Poll interval while the queue is empty.
    pub idle_poll_interval: Duration,
    /// Consecutive empty polls before the loop exits.
    pub max_idle_polls: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            inter_call_delay: Duration::from_secs(5),
            idle_poll_interval: Duration::from_secs(10),
            max_idle_polls: 10,
        }
    }
}

pub struct CallQueueScheduler {
    queue: Mutex<VecDeque<QueuedCallRequest>>,
    state: AtomicU8,
    telephony: Arc<dyn Telephony>,
    registry: Arc<CallRegistry>,
    config: SchedulerConfig,
}

impl CallQueueScheduler {
    pub fn new(
        telephony: Arc<dyn Telephony>,
        registry: Arc<CallRegistry>,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            state: AtomicU8::new(STATE_IDLE),
            telephony,
            registry,
            config,
        })
    }

    /// Appends a request and starts the dialer loop if it is idle.
    pub fn enqueue(self: &Arc<Self>, request: QueuedCallRequest) {
        let depth = {
            let mut queue = self.queue.lock();
            queue.push_back(request);
            queue.len()
        };
        info!(depth, "call request queued");
        self.kick();
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn state(&self) -> DialerState {
        match self.state.load(Ordering::SeqCst) {
            STATE_RUNNING => DialerState::Running,
            _ => DialerState::Idle,
        }
    }

    fn kick(self: &Arc<Self>) {
        if self
            .state
            .compare_exchange(STATE_IDLE, STATE_RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("dialer loop starting");
            let scheduler = self.clone();
            tokio::spawn(scheduler.run());
        }
    }

    async fn run(self: Arc<Self>) {
        let mut empty_polls = 0u32;
        loop {
            let next = self.queue.lock().pop_front();
            match next {
                Some(request) => {
                    empty_polls = 0;
                    self.place(request).await;
                    tokio::time::sleep(self.config.inter_call_delay).await;
                }
                None => {
                    empty_polls += 1;
                    if empty_polls >= self.config.max_idle_polls {
                        self.state.store(STATE_IDLE, Ordering::SeqCst);
                        // An enqueue may have landed between the pop and
                        // the store; reclaim the loop if so.
                        if !self.queue.lock().is_empty()
                            && self
                                .state
                                .compare_exchange(
                                    STATE_IDLE,
                                    STATE_RUNNING,
                                    Ordering::SeqCst,
                                    Ordering::SeqCst,
                                )
                                .is_ok()
                        {
                            empty_polls = 0;
                            continue;
                        }
                        info!("dialer loop idle, exiting");
                        return;
                    }
                    tokio::time::sleep(self.config.idle_poll_interval).await;
                }
            }
        }
    }

    /// Places one call and seeds its session into the registry. Failures
    /// are logged; there is no automatic retry.
    async fn place(&self, request: QueuedCallRequest) {
        info!(
            lead = %request.lead.name,
            phone = %request.lead.phone,
            campaign = %request.campaign.name,
            "placing outbound call"
        );
        match self.telephony.place_call(&request.lead.phone).await {
            Ok(call_sid) => {
                let session =
                    CallSession::new(call_sid.clone(), request.lead, request.campaign);
                if let Err(e) = self.registry.register(session) {
                    error!(%call_sid, error = %e, "placed call could not be registered");
                } else {
                    info!(%call_sid, "outbound call placed");
                }
            }
            Err(e) => {
                error!(phone = %request.lead.phone, error = %e, "call placement failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as PlMutex;
    use tokio::time::Instant;

    use crate::telephony::TelephonyError;

    struct MockTelephony {
        placements: PlMutex<Vec<(String, Instant)>>,
        fail: bool,
    }

    impl MockTelephony {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                placements: PlMutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl Telephony for MockTelephony {
        async fn place_call(&self, to: &str) -> Result<String, TelephonyError> {
            if self.fail {
                return Err(TelephonyError::Api {
                    status: 400,
                    body: "invalid number".to_string(),
                });
            }
            let mut placements = self.placements.lock();
            placements.push((to.to_string(), Instant::now()));
            Ok(format!("CA{}", placements.len()))
        }

        async fn end_call(&self, _call_sid: &str) -> Result<(), TelephonyError> {
            Ok(())
        }
    }

    fn request(phone: &str) -> QueuedCallRequest {
        QueuedCallRequest {
            lead: LeadContext {
                name: "Lead".to_string(),
                phone: phone.to_string(),
                email: None,
                organisation: None,
                designation: None,
            },
            campaign: CampaignContext::fallback("en-US"),
        }
    }

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            inter_call_delay: Duration::from_secs(5),
            idle_poll_interval: Duration::from_millis(100),
            max_idle_polls: 3,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn three_calls_are_paced_and_registered() {
        let telephony = MockTelephony::new(false);
        let registry = Arc::new(CallRegistry::new());
        let scheduler =
            CallQueueScheduler::new(telephony.clone(), registry.clone(), fast_config());

        for i in 0..3 {
            scheduler.enqueue(request(&format!("+1555000000{i}")));
        }
        assert_eq!(scheduler.state(), DialerState::Running);

        // run until the loop drains the queue and goes idle
        while scheduler.state() == DialerState::Running {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let placements = telephony.placements.lock();
        assert_eq!(placements.len(), 3);
        for pair in placements.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_secs(5));
        }
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_loop_restarts_on_enqueue() {
        let telephony = MockTelephony::new(false);
        let registry = Arc::new(CallRegistry::new());
        let scheduler =
            CallQueueScheduler::new(telephony.clone(), registry.clone(), fast_config());

        scheduler.enqueue(request("+15550000001"));
        while scheduler.state() == DialerState::Running {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(telephony.placements.lock().len(), 1);

        scheduler.enqueue(request("+15550000002"));
        assert_eq!(scheduler.state(), DialerState::Running);
        while scheduler.state() == DialerState::Running {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(telephony.placements.lock().len(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn placement_failure_is_not_retried() {
        let telephony = MockTelephony::new(true);
        let registry = Arc::new(CallRegistry::new());
        let scheduler =
            CallQueueScheduler::new(telephony.clone(), registry.clone(), fast_config());

        scheduler.enqueue(request("+15550000001"));
        while scheduler.state() == DialerState::Running {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(registry.is_empty());
        assert_eq!(scheduler.queue_len(), 0);
    }
}
