//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::Engines;
use crate::core::llm::{GeminiEmbedder, GeminiGenerator};
use crate::core::records::{CallRecordSink, JsonlRecordSink, NullRecordSink};
use crate::core::session::CallRegistry;
use crate::core::stt::DeepgramFactory;
use crate::core::tts::GoogleSynthesizer;
use crate::scheduler::CallQueueScheduler;
use crate::telephony::{Telephony, TwilioClient};

pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<CallRegistry>,
    pub scheduler: Arc<CallQueueScheduler>,
    pub telephony: Arc<dyn Telephony>,
    pub engines: Arc<Engines>,
    pub records: Arc<dyn CallRecordSink>,
}

impl AppState {
    /// Production wiring: live provider clients built from config.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let telephony: Arc<dyn Telephony> = Arc::new(TwilioClient::new(&config));
        let engines = Arc::new(Engines {
            recognizers: Arc::new(DeepgramFactory),
            generator: Arc::new(GeminiGenerator::new(
                config.google_api_key.clone(),
                config.llm_model.clone(),
            )),
            synthesizer: Arc::new(GoogleSynthesizer::new(
                config.google_api_key.clone(),
                config.tts_voice.clone(),
            )),
            embedder: Some(Arc::new(GeminiEmbedder::new(
                config.google_api_key.clone(),
                config.embedding_model.clone(),
            ))),
        });
        let records: Arc<dyn CallRecordSink> = if config.save_call_records {
            Arc::new(JsonlRecordSink::new(&config.call_log_dir))
        } else {
            Arc::new(NullRecordSink)
        };
        Self::with_components(config, telephony, engines, records)
    }

    /// Wiring with injected collaborators; the registry and scheduler
    /// are always real.
    pub fn with_components(
        config: ServerConfig,
        telephony: Arc<dyn Telephony>,
        engines: Arc<Engines>,
        records: Arc<dyn CallRecordSink>,
    ) -> Arc<Self> {
        let registry = Arc::new(CallRegistry::new());
        let scheduler = CallQueueScheduler::new(
            telephony.clone(),
            registry.clone(),
            config.scheduler_config(),
        );
        Arc::new(Self {
            config,
            registry,
            scheduler,
            telephony,
            engines,
            records,
        })
    }
}
