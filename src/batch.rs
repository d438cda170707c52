//! Bulk and variation generation on top of the orchestrator.
//!
//! Bulk: each iteration clones the base request, perturbs one field according
//! to the `VariationType`, and runs it through `generate`. A failing iteration
//! is logged and skipped, so the result may be shorter than `count`.
//!
//! Variations: up to three fixed intents applied to an existing activity.
//! Failed variations are omitted; there is no template fallback here.
//!
//! Both loops keep at most `bulk_concurrency` completion calls outstanding
//! (default 1, strictly sequential) and return results in iteration order.

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::completion::CompletionRequest;
use crate::domain::{AIGeneratedActivity, AIGenerationRequest, GenerationOutcome, ValidationError, VariationType};
use crate::engine::{parse_activity, ActivityEngine, ParseResult};
use crate::util::fill_template;

/// Methodologies cycled by `VariationType::Methodology`, one per iteration.
pub const BULK_METHODOLOGIES: [&str; 5] = ["montessori", "reggio-emilia", "waldorf", "play-based", "stem"];

/// Environments cycled by `VariationType::Environment`.
pub const BULK_ENVIRONMENTS: [&str; 5] = ["indoor", "outdoor", "classroom", "home", "therapy-room"];

/// Age offsets cycled by `VariationType::Age`, around the base age.
pub const AGE_OFFSETS: [i64; 5] = [0, -1, 1, -2, 2];

/// Variation intents, in the order they are applied.
pub const VARIATION_INTENTS: [&str; 3] = [
  "Simplify the activity for younger children: fewer steps, larger materials, more adult modelling.",
  "Add challenge for children ready for more: extra steps, problem solving and new vocabulary.",
  "Shift the modality: deliver the same learning goals through a different sense or type of movement.",
];

/// The request for iteration `i` of a bulk run. Exactly one field differs from `base`.
pub fn vary_request(base: &AIGenerationRequest, i: usize, variation: VariationType) -> AIGenerationRequest {
  let mut req = base.clone();
  match variation {
    VariationType::Difficulty => {
      let step = u32::try_from(i).unwrap_or(u32::MAX);
      req.child_profile.age = base.child_profile.age.saturating_add(step);
    }
    VariationType::Methodology => {
      req.methodologies = vec![BULK_METHODOLOGIES[i % BULK_METHODOLOGIES.len()].to_string()];
    }
    VariationType::Environment => {
      req.environment = BULK_ENVIRONMENTS[i % BULK_ENVIRONMENTS.len()].to_string();
    }
    VariationType::Age => {
      let age = i64::from(base.child_profile.age) + AGE_OFFSETS[i % AGE_OFFSETS.len()];
      req.child_profile.age = u32::try_from(age.max(0)).unwrap_or(u32::MAX);
    }
  }
  req
}

impl ActivityEngine {
  /// Generate up to `count` activities from systematically varied copies of `base`.
  ///
  /// Errors only when `base` itself is invalid or `count` exceeds `max_bulk_count`.
  #[instrument(level = "info", skip(self, base))]
  pub async fn generate_bulk(
    &self,
    base: &AIGenerationRequest,
    count: usize,
    variation: VariationType,
  ) -> Result<Vec<GenerationOutcome>, ValidationError> {
    let max = self.settings().max_bulk_count;
    if count > max {
      return Err(ValidationError::BatchTooLarge { requested: count, max });
    }
    base.validate()?;

    let pending: Vec<_> = (0..count)
      .map(|i| {
        let req = vary_request(base, i, variation);
        async move {
          match self.generate(&req).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
              warn!(target: "generation", iteration = i, error = %e, "Bulk iteration skipped");
              None
            }
          }
        }
      })
      .collect();
    let results: Vec<Option<GenerationOutcome>> =
      stream::iter(pending).buffered(self.settings().concurrency()).collect().await;

    let activities: Vec<GenerationOutcome> = results.into_iter().flatten().collect();
    info!(target: "generation", requested = count, generated = activities.len(), "Bulk generation finished");
    Ok(activities)
  }

  /// Ask the model for up to three variations of `base`. `count` is clamped to
  /// the number of intents; failed variations are left out.
  #[instrument(level = "info", skip(self, base), fields(title_len = base.title.len()))]
  pub async fn generate_variations(&self, base: &AIGeneratedActivity, count: usize) -> Vec<AIGeneratedActivity> {
    let count = count.min(VARIATION_INTENTS.len());
    if count == 0 || !self.has_client() {
      info!(target: "generation", requested = count, "No variations requested or no completion API key");
      return Vec::new();
    }
    let activity_json = match serde_json::to_string_pretty(base) {
      Ok(j) => j,
      Err(e) => {
        warn!(target: "generation", error = %e, "Could not serialize base activity for variations");
        return Vec::new();
      }
    };

    let pending: Vec<_> = VARIATION_INTENTS
      .iter()
      .take(count)
      .enumerate()
      .map(|(i, intent)| {
        let call = CompletionRequest {
          system: self.prompts().variation_system.clone(),
          user: fill_template(
            &self.prompts().variation_user_template,
            &[("intent", *intent), ("activity_json", activity_json.as_str())],
          ),
          temperature: self.settings().variation_temperature,
          max_tokens: self.settings().max_tokens,
        };
        async move {
          match self.call(&call).await {
            Ok(text) => match parse_activity(&text) {
              ParseResult::Valid(activity) => Some(*activity),
              ParseResult::Invalid(reason) => {
                warn!(target: "generation", variation = i, %reason, "Variation rejected; omitting");
                None
              }
            },
            Err(e) => {
              warn!(target: "generation", variation = i, error = %e, "Variation call failed; omitting");
              None
            }
          }
        }
      })
      .collect();
    let results: Vec<Option<AIGeneratedActivity>> =
      stream::iter(pending).buffered(self.settings().concurrency()).collect().await;

    let variations: Vec<AIGeneratedActivity> = results.into_iter().flatten().collect();
    info!(target: "generation", requested = count, generated = variations.len(), "Variation generation finished");
    variations
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::completion::scripted::{activity_json, Reply, ScriptedCompletion};
  use crate::completion::{CompletionApi, CompletionError};
  use crate::config::{GenerationSettings, Prompts};
  use crate::domain::{fixtures, Source};
  use crate::engine::tests::{engine_with, engine_without_key};
  use crate::fallback::synthesize;
  use crate::prompt::compile;
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[test]
  fn methodology_cycles_in_order() {
    let base = fixtures::request();
    let got: Vec<Vec<String>> = (0..5).map(|i| vary_request(&base, i, VariationType::Methodology).methodologies).collect();
    let want: Vec<Vec<String>> = BULK_METHODOLOGIES.iter().map(|m| vec![m.to_string()]).collect();
    assert_eq!(got, want);
    assert_eq!(vary_request(&base, 5, VariationType::Methodology).methodologies, vec!["montessori".to_string()]);
  }

  #[test]
  fn difficulty_increments_age_and_touches_nothing_else() {
    let base = fixtures::request();
    let varied = vary_request(&base, 3, VariationType::Difficulty);
    assert_eq!(varied.child_profile.age, base.child_profile.age + 3);
    let mut back = varied.clone();
    back.child_profile.age = base.child_profile.age;
    assert_eq!(back, base);
  }

  #[test]
  fn environment_and_age_cycle() {
    let mut base = fixtures::request();
    assert_eq!(vary_request(&base, 1, VariationType::Environment).environment, "outdoor");
    assert_eq!(vary_request(&base, 6, VariationType::Environment).environment, "outdoor");

    base.child_profile.age = 1;
    let ages: Vec<u32> = (0..5).map(|i| vary_request(&base, i, VariationType::Age).child_profile.age).collect();
    assert_eq!(ages, vec![1, 0, 2, 0, 3]);
  }

  #[tokio::test]
  async fn bulk_with_healthy_model_returns_exactly_count() {
    let api = Arc::new(ScriptedCompletion::always(activity_json("Bulk")));
    let out = engine_with(&api).generate_bulk(&fixtures::request(), 5, VariationType::Methodology).await.unwrap();
    assert_eq!(out.len(), 5);
    assert!(out.iter().all(|o| o.source == Source::Model));

    let base = fixtures::request();
    let sent: Vec<String> = api.requests().into_iter().map(|r| r.user).collect();
    let expected: Vec<String> = (0..5).map(|i| compile(&vary_request(&base, i, VariationType::Methodology))).collect();
    assert_eq!(sent, expected);
  }

  #[tokio::test]
  async fn bulk_under_outage_still_yields_fallbacks_in_order() {
    let api = Arc::new(ScriptedCompletion::sequence(vec![Reply::Text(activity_json("first")), Reply::Fail]));
    let base = fixtures::request();
    let out = engine_with(&api).generate_bulk(&base, 3, VariationType::Environment).await.unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].source, Source::Model);
    assert_eq!(out[1].activity, synthesize(&vary_request(&base, 1, VariationType::Environment)));
    assert_eq!(out[2].source, Source::Fallback);
  }

  #[tokio::test]
  async fn bulk_zero_and_limits() {
    let api = Arc::new(ScriptedCompletion::always(activity_json("x")));
    let engine = engine_with(&api);
    assert!(engine.generate_bulk(&fixtures::request(), 0, VariationType::Age).await.unwrap().is_empty());
    assert_eq!(api.calls(), 0);

    let err = engine.generate_bulk(&fixtures::request(), 21, VariationType::Age).await.unwrap_err();
    assert_eq!(err, ValidationError::BatchTooLarge { requested: 21, max: 20 });

    let mut bad = fixtures::request();
    bad.category.clear();
    assert!(engine.generate_bulk(&bad, 2, VariationType::Age).await.is_err());
    assert_eq!(api.calls(), 0);
  }

  /// Echoes the prompt's environment as the title and records how many calls
  /// overlap. Earlier calls sleep longer, so they finish in reverse order.
  #[derive(Default)]
  struct Tracked {
    started: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
  }

  #[async_trait]
  impl CompletionApi for Tracked {
    fn model(&self) -> &str { "tracked" }

    async fn complete(&self, req: &CompletionRequest) -> Result<String, CompletionError> {
      let n = self.started.fetch_add(1, Ordering::SeqCst);
      let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
      self.peak.fetch_max(now, Ordering::SeqCst);
      tokio::time::sleep(Duration::from_millis(50 * (5 - n.min(4) as u64))).await;
      self.in_flight.fetch_sub(1, Ordering::SeqCst);
      let env = req.user.lines().find_map(|l| l.strip_prefix("- Environment: ")).unwrap_or("?");
      Ok(activity_json(env))
    }
  }

  async fn tracked_bulk(concurrency: usize) -> (Vec<String>, usize) {
    let api = Arc::new(Tracked::default());
    let settings = GenerationSettings { bulk_concurrency: concurrency, ..Default::default() };
    let engine = ActivityEngine::with_client(Some(api.clone() as Arc<dyn CompletionApi>), settings, Prompts::default());
    let out = engine.generate_bulk(&fixtures::request(), 5, VariationType::Environment).await.unwrap();
    assert!(out.iter().all(|o| o.source == Source::Model));
    let titles = out.into_iter().map(|o| o.activity.title).collect();
    (titles, api.peak.load(Ordering::SeqCst))
  }

  #[tokio::test(start_paused = true)]
  async fn default_concurrency_keeps_one_call_outstanding() {
    let (titles, peak) = tracked_bulk(GenerationSettings::default().bulk_concurrency).await;
    assert_eq!(peak, 1);
    assert_eq!(titles, BULK_ENVIRONMENTS.to_vec());
  }

  #[tokio::test(start_paused = true)]
  async fn bounded_concurrency_keeps_iteration_order() {
    let (titles, peak) = tracked_bulk(3).await;
    assert!(peak > 1 && peak <= 3, "peak in-flight calls was {}", peak);
    assert_eq!(titles, BULK_ENVIRONMENTS.to_vec());
  }

  #[tokio::test]
  async fn fallback_bulk_matches_synthesizer_per_iteration() {
    let base = fixtures::request();
    let out = engine_without_key().generate_bulk(&base, 4, VariationType::Difficulty).await.unwrap();
    let matches: Vec<bool> = out.iter().enumerate()
      .map(|(i, o)| o.activity == synthesize(&vary_request(&base, i, VariationType::Difficulty)))
      .collect();
    assert_eq!(matches, vec![true; 4]);
  }

  #[tokio::test]
  async fn variations_are_clamped_to_three_calls() {
    let api = Arc::new(ScriptedCompletion::always(activity_json("Variant")));
    let base = synthesize(&fixtures::request());
    let out = engine_with(&api).generate_variations(&base, 10).await;
    assert_eq!(out.len(), 3);
    assert_eq!(api.calls(), 3);

    let sent = api.requests();
    for (req, intent) in sent.iter().zip(VARIATION_INTENTS) {
      assert!(req.user.contains(intent));
      assert!(req.user.contains(&base.title));
    }
  }

  #[tokio::test]
  async fn fewer_variations_than_intents_make_exactly_that_many_calls() {
    let api = Arc::new(ScriptedCompletion::always(activity_json("Variant")));
    let base = synthesize(&fixtures::request());
    let out = engine_with(&api).generate_variations(&base, 2).await;
    assert_eq!(out.len(), 2);
    assert_eq!(api.calls(), 2);

    let sent = api.requests();
    assert!(sent[0].user.contains(VARIATION_INTENTS[0]));
    assert!(sent[1].user.contains(VARIATION_INTENTS[1]));
    assert!(sent.iter().all(|r| !r.user.contains(VARIATION_INTENTS[2])));
  }

  #[tokio::test]
  async fn failed_variations_are_omitted_not_replaced() {
    let api = Arc::new(ScriptedCompletion::sequence(vec![
      Reply::Fail,
      Reply::Text("not json".into()),
      Reply::Text(activity_json("Harder")),
    ]));
    let base = synthesize(&fixtures::request());
    let out = engine_with(&api).generate_variations(&base, 3).await;
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title, "Harder");
  }

  #[tokio::test]
  async fn variations_without_key_make_no_calls() {
    let base = synthesize(&fixtures::request());
    assert!(engine_without_key().generate_variations(&base, 2).await.is_empty());

    let api = Arc::new(ScriptedCompletion::always(activity_json("x")));
    assert!(engine_with(&api).generate_variations(&base, 0).await.is_empty());
    assert_eq!(api.calls(), 0);
  }
}
