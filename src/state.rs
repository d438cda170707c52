//! Application state shared by HTTP and WebSocket handlers.
//!
//! This module owns the activity engine, built once at startup from the
//! environment (API key, model, optional TOML config) and read-only afterwards.
//! Without OPENAI_API_KEY every generation uses the template fallback.

use tracing::{info, instrument};

use crate::config::EngineConfig;
use crate::engine::ActivityEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: ActivityEngine,
}

impl AppState {
    /// Build state from env: load config, init the completion client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = EngineConfig::from_env();

        if let Some(oa) = &cfg.openai {
            info!(target: "activity_engine", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "activity_engine", "OpenAI disabled (no OPENAI_API_KEY). Every activity will use the template fallback.");
        }
        info!(
            target: "activity_engine",
            temperature = cfg.generation.temperature,
            max_tokens = cfg.generation.max_tokens,
            timeout_secs = cfg.generation.request_timeout_secs,
            bulk_concurrency = cfg.generation.concurrency(),
            "Generation settings"
        );

        Self::from_engine(ActivityEngine::new(cfg))
    }

    pub fn from_engine(engine: ActivityEngine) -> Self {
        Self { engine }
    }
}
