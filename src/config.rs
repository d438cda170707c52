//! Engine configuration: generation tunables and system prompts, loaded from an
//! optional TOML file, plus the completion client built from the environment.
//!
//! Expected TOML schema (every key optional):
//!
//! ```toml
//! [generation]
//! temperature = 0.7
//! max_tokens = 2000
//! request_timeout_secs = 45
//! bulk_concurrency = 1
//!
//! [prompts]
//! generation_system = "..."
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::openai::OpenAI;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub generation: GenerationSettings,
  #[serde(default)]
  pub prompts: Prompts,
}

/// Tunables for every completion call the engine makes.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationSettings {
  /// Creative-but-consistent output for new activities.
  pub temperature: f32,
  pub max_tokens: u32,
  pub variation_temperature: f32,
  pub analysis_temperature: f32,
  pub analysis_max_tokens: u32,
  pub probe_max_tokens: u32,
  /// Upper bound for a single completion call, applied on top of the HTTP client timeout.
  pub request_timeout_secs: u64,
  /// Outstanding completion calls during bulk/variation generation. 1 = strictly sequential.
  pub bulk_concurrency: usize,
  pub max_bulk_count: usize,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self {
      temperature: 0.7,
      max_tokens: 2000,
      variation_temperature: 0.8,
      analysis_temperature: 0.3,
      analysis_max_tokens: 800,
      probe_max_tokens: 20,
      request_timeout_secs: 45,
      bulk_concurrency: 1,
      max_bulk_count: 20,
    }
  }
}

impl GenerationSettings {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs.max(1))
  }

  pub fn concurrency(&self) -> usize {
    self.bulk_concurrency.max(1)
  }
}

/// System instructions sent with each kind of call. Defaults are tuned for
/// early-childhood activity design; override them in TOML to adjust tone.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Prompts {
  pub generation_system: String,
  pub variation_system: String,
  pub variation_user_template: String,
  pub analysis_system: String,
  pub analysis_user_template: String,
  pub probe_system: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_system: "You are an expert early childhood educator and pediatric therapist who designs personalized, developmentally appropriate learning activities. Always respond with valid JSON only.".into(),
      variation_system: "You are an expert early childhood educator. Always respond with valid JSON only.".into(),
      variation_user_template: "Create a variation of the activity below. Variation goal: {intent}\n\nOriginal activity (JSON):\n{activity_json}\n\nReturn ONLY a JSON object with exactly the same structure as the original activity. Keep the same child-focused tone and give it a new title.".into(),
      analysis_system: "You are an early childhood education quality reviewer. Always respond with valid JSON only.".into(),
      analysis_user_template: "Evaluate the quality of this learning activity.\n\nActivity (JSON):\n{activity_json}\n\nReturn ONLY a JSON object with this exact structure:\n{\n  \"overallScore\": <integer 0-100>,\n  \"engagement\": <integer 1-10>,\n  \"educationalValue\": <integer 1-10>,\n  \"clarity\": <integer 1-10>,\n  \"adaptability\": <integer 1-10>,\n  \"suggestions\": [\"specific improvement suggestion\"]\n}".into(),
      probe_system: "You are a connectivity check. Reply with exactly the phrase you are asked for and nothing else.".into(),
    }
  }
}

/// Everything the engine needs, built once at startup and read-only afterwards.
#[derive(Clone, Default)]
pub struct EngineConfig {
  pub openai: Option<OpenAI>,
  pub generation: GenerationSettings,
  pub prompts: Prompts,
}

impl EngineConfig {
  /// Read OPENAI_* variables and the optional AGENT_CONFIG_PATH file.
  pub fn from_env() -> Self {
    let cfg = load_agent_config_from_env().unwrap_or_default();
    let openai = OpenAI::from_env(cfg.generation.request_timeout());
    Self { openai, generation: cfg.generation, prompts: cfg.prompts }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "activity_engine", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "activity_engine", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "activity_engine", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(s)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults_for_missing_keys() {
    let cfg = parse_agent_config(
      r#"
      [generation]
      temperature = 0.4
      bulk_concurrency = 3

      [prompts]
      probe_system = "ping"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.generation.temperature, 0.4);
    assert_eq!(cfg.generation.concurrency(), 3);
    assert_eq!(cfg.generation.max_tokens, GenerationSettings::default().max_tokens);
    assert_eq!(cfg.prompts.probe_system, "ping");
    assert_eq!(cfg.prompts.generation_system, Prompts::default().generation_system);
  }

  #[test]
  fn empty_toml_is_all_defaults() {
    let cfg = parse_agent_config("").unwrap();
    assert_eq!(cfg.generation, GenerationSettings::default());
    assert_eq!(cfg.prompts, Prompts::default());
  }

  #[test]
  fn zero_concurrency_and_timeout_are_clamped() {
    let g = GenerationSettings { bulk_concurrency: 0, request_timeout_secs: 0, ..Default::default() };
    assert_eq!(g.concurrency(), 1);
    assert_eq!(g.request_timeout(), Duration::from_secs(1));
  }

  #[test]
  fn default_generation_system_demands_json() {
    assert!(Prompts::default().generation_system.contains("valid JSON only"));
  }
}
