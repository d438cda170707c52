//! Generation orchestrator and connectivity prober.
//!
//! `generate` compiles the prompt, makes at most one completion call, and
//! validates the reply. Every failure (no key, transport, timeout, non-2xx,
//! malformed JSON, missing required field) is logged and replaced by the
//! template activity for the same request. The outcome is tagged with its
//! source so callers and tests can tell the two paths apart.
//!
//! Bulk/variation generation lives in `batch.rs`, scoring in `quality.rs`.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::completion::{CompletionApi, CompletionError, CompletionRequest};
use crate::config::{EngineConfig, GenerationSettings, Prompts};
use crate::domain::{
  AIGeneratedActivity, AIGenerationRequest, AdvancedOptions, GenerationOutcome, Source, ValidationError,
};
use crate::fallback::synthesize;
use crate::prompt::compile;
use crate::util::{strip_code_fence, trunc_for_log};

/// Phrase the prober asks the model to echo back.
pub const PROBE_MARKER: &str = "ACTIVITY ENGINE ONLINE";

/// Why a completion could not be accepted as an activity.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidReason {
  #[error("completion is not valid JSON: {0}")]
  NotJson(String),
  #[error("completion JSON is not an object")]
  NotAnObject,
  #[error("required field `{0}` is missing or empty")]
  MissingField(&'static str),
  /// Scorecard replies only; activity fields degrade to defaults instead.
  #[error("reply does not match the expected shape: {0}")]
  Shape(String),
}

/// Result of validating one model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
  Valid(Box<AIGeneratedActivity>),
  Invalid(InvalidReason),
}

/// Parse a completion into an activity. Accepts a fenced code block and
/// requires non-empty `title`, `description` and `materials`. Everything else
/// is taken as the model wrote it; loosely typed fields degrade to defaults
/// instead of rejecting the reply.
pub fn parse_activity(text: &str) -> ParseResult {
  let body = strip_code_fence(text);
  let value: Value = match serde_json::from_str(body) {
    Ok(v) => v,
    Err(e) => return ParseResult::Invalid(InvalidReason::NotJson(e.to_string())),
  };
  if !value.is_object() {
    return ParseResult::Invalid(InvalidReason::NotAnObject);
  }
  let activity: AIGeneratedActivity = match serde_json::from_value(value) {
    Ok(a) => a,
    Err(e) => return ParseResult::Invalid(InvalidReason::NotJson(e.to_string())),
  };

  if activity.title.trim().is_empty() {
    return ParseResult::Invalid(InvalidReason::MissingField("title"));
  }
  if activity.description.trim().is_empty() {
    return ParseResult::Invalid(InvalidReason::MissingField("description"));
  }
  if activity.materials.is_empty() {
    return ParseResult::Invalid(InvalidReason::MissingField("materials"));
  }
  ParseResult::Valid(Box::new(activity))
}

/// Drop optional sections the request did not ask for.
fn retain_requested_sections(activity: &mut AIGeneratedActivity, opts: &AdvancedOptions) {
  if !opts.wants_multimedia() { activity.multimedia = None; }
  if !opts.wants_rubric() { activity.assessment_rubric = None; }
  if !opts.wants_extensions() { activity.extension_activities = None; }
  if !opts.wants_reflection() { activity.reflection_prompts = None; }
  if opts.cultural().is_none() { activity.cultural_adaptations = None; }
  if opts.technology().is_none() { activity.digital_resources = None; }
}

/// The engine. Built once at startup, immutable afterwards, shared via `Arc`.
#[derive(Clone)]
pub struct ActivityEngine {
  client: Option<Arc<dyn CompletionApi>>,
  settings: GenerationSettings,
  prompts: Prompts,
}

impl ActivityEngine {
  pub fn new(cfg: EngineConfig) -> Self {
    let client = cfg.openai.map(|oa| Arc::new(oa) as Arc<dyn CompletionApi>);
    Self::with_client(client, cfg.generation, cfg.prompts)
  }

  pub fn with_client(client: Option<Arc<dyn CompletionApi>>, settings: GenerationSettings, prompts: Prompts) -> Self {
    Self { client, settings, prompts }
  }

  /// True when an API key was configured. Does not say the API is reachable; see `probe`.
  pub fn has_client(&self) -> bool {
    self.client.is_some()
  }

  pub fn model(&self) -> Option<&str> {
    self.client.as_deref().map(|c| c.model())
  }

  pub fn settings(&self) -> &GenerationSettings {
    &self.settings
  }

  pub(crate) fn prompts(&self) -> &Prompts {
    &self.prompts
  }

  /// One completion call bounded by the configured timeout. No retries.
  pub(crate) async fn call(&self, req: &CompletionRequest) -> Result<String, CompletionError> {
    let client = self.client.as_ref().ok_or(CompletionError::NotConfigured)?;
    let limit = self.settings.request_timeout();
    match tokio::time::timeout(limit, client.complete(req)).await {
      Ok(res) => res,
      Err(_) => Err(CompletionError::Timeout(limit)),
    }
  }

  /// Generate one activity. Only a structurally invalid request is an error;
  /// every other failure yields the template activity.
  #[instrument(
    level = "info",
    skip(self, req),
    fields(generation_id = %Uuid::new_v4(), age = req.child_profile.age, activity_type = %req.activity_type)
  )]
  pub async fn generate(&self, req: &AIGenerationRequest) -> Result<GenerationOutcome, ValidationError> {
    req.validate()?;

    let call = CompletionRequest {
      system: self.prompts.generation_system.clone(),
      user: compile(req),
      temperature: self.settings.temperature,
      max_tokens: self.settings.max_tokens,
    };
    let start = Instant::now();

    match self.call(&call).await {
      Ok(text) => match parse_activity(&text) {
        ParseResult::Valid(activity) => {
          let mut activity = *activity;
          retain_requested_sections(&mut activity, &req.advanced_options);
          info!(target: "generation", elapsed = ?start.elapsed(), title_len = activity.title.len(), "Model activity accepted");
          return Ok(GenerationOutcome { source: Source::Model, activity });
        }
        ParseResult::Invalid(reason) => {
          warn!(target: "generation", elapsed = ?start.elapsed(), %reason, "Model output rejected; using fallback activity");
          debug!(target: "generation", preview = %trunc_for_log(&text, 80), "Rejected completion");
        }
      },
      Err(CompletionError::NotConfigured) => {
        debug!(target: "generation", "No completion API key; using fallback activity");
      }
      Err(e) => {
        error!(target: "generation", elapsed = ?start.elapsed(), error = %e, "Completion call failed; using fallback activity");
      }
    }

    Ok(GenerationOutcome { source: Source::Fallback, activity: synthesize(req) })
  }

  /// Reachability flag for the UI. False without an API key, or when the reply
  /// lacks the marker phrase. Generation never consults this.
  #[instrument(level = "info", skip(self))]
  pub async fn probe(&self) -> bool {
    if !self.has_client() {
      return false;
    }
    let call = CompletionRequest {
      system: self.prompts.probe_system.clone(),
      user: format!("Reply with exactly: {}", PROBE_MARKER),
      temperature: 0.0,
      max_tokens: self.settings.probe_max_tokens,
    };
    match self.call(&call).await {
      Ok(text) => {
        let ok = text.contains(PROBE_MARKER);
        info!(target: "activity_engine", available = ok, "Connectivity probe finished");
        ok
      }
      Err(e) => {
        warn!(target: "activity_engine", error = %e, "Connectivity probe failed");
        false
      }
    }
  }
}
