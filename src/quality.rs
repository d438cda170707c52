//! Quality analyzer: asks the model to score a generated activity.
//! Any failure yields the constant fallback scorecard.

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::completion::CompletionRequest;
use crate::domain::{AIGeneratedActivity, AnalysisOutcome, QualityAnalysis, Source};
use crate::engine::{ActivityEngine, InvalidReason};
use crate::util::{fill_template, strip_code_fence};

/// Scorecard served when the model cannot be asked or answers badly.
pub fn fallback_analysis() -> QualityAnalysis {
  QualityAnalysis {
    overall_score: 75,
    engagement: 8,
    educational_value: 7,
    clarity: 8,
    adaptability: 7,
    suggestions: vec![
      "Add more sensory elements to increase engagement.".into(),
      "Include clearer assessment criteria for tracking progress.".into(),
      "Offer additional adaptations for different ability levels.".into(),
    ],
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScorecard {
  overall_score: f64,
  engagement: f64,
  educational_value: f64,
  clarity: f64,
  adaptability: f64,
  #[serde(default)]
  suggestions: Vec<String>,
}

fn clamp_score(v: f64, lo: u8, hi: u8) -> u8 {
  if !v.is_finite() {
    return lo;
  }
  v.round().clamp(f64::from(lo), f64::from(hi)) as u8
}

/// Parse a scorecard reply, clamping each score into its range.
pub fn parse_analysis(text: &str) -> Result<QualityAnalysis, InvalidReason> {
  let raw: RawScorecard = serde_json::from_str(strip_code_fence(text))
    .map_err(|e| InvalidReason::Shape(e.to_string()))?;
  Ok(QualityAnalysis {
    overall_score: clamp_score(raw.overall_score, 0, 100),
    engagement: clamp_score(raw.engagement, 1, 10),
    educational_value: clamp_score(raw.educational_value, 1, 10),
    clarity: clamp_score(raw.clarity, 1, 10),
    adaptability: clamp_score(raw.adaptability, 1, 10),
    suggestions: raw.suggestions.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
  })
}

impl ActivityEngine {
  /// Score an activity. At most one completion call; never fails.
  #[instrument(level = "info", skip(self, activity), fields(title_len = activity.title.len()))]
  pub async fn analyze(&self, activity: &AIGeneratedActivity) -> AnalysisOutcome {
    let fallback = || AnalysisOutcome { source: Source::Fallback, analysis: fallback_analysis() };
    if !self.has_client() {
      return fallback();
    }
    let activity_json = match serde_json::to_string_pretty(activity) {
      Ok(j) => j,
      Err(e) => {
        warn!(target: "generation", error = %e, "Could not serialize activity for analysis");
        return fallback();
      }
    };
    let call = CompletionRequest {
      system: self.prompts().analysis_system.clone(),
      user: fill_template(&self.prompts().analysis_user_template, &[("activity_json", activity_json.as_str())]),
      temperature: self.settings().analysis_temperature,
      max_tokens: self.settings().analysis_max_tokens,
    };

    match self.call(&call).await {
      Ok(text) => match parse_analysis(&text) {
        Ok(analysis) => {
          info!(target: "generation", overall = analysis.overall_score, "Quality analysis received");
          AnalysisOutcome { source: Source::Model, analysis }
        }
        Err(reason) => {
          warn!(target: "generation", %reason, "Quality analysis rejected; using fallback scorecard");
          fallback()
        }
      },
      Err(e) => {
        warn!(target: "generation", error = %e, "Quality analysis call failed; using fallback scorecard");
        fallback()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::completion::scripted::ScriptedCompletion;
  use crate::domain::fixtures;
  use crate::engine::tests::{engine_with, engine_without_key};
  use crate::fallback::synthesize;
  use serde_json::json;
  use std::sync::Arc;

  #[tokio::test]
  async fn no_key_returns_constant_scorecard() {
    let out = engine_without_key().analyze(&synthesize(&fixtures::request())).await;
    assert_eq!(out.source, Source::Fallback);
    let v = serde_json::to_value(&out.analysis).unwrap();
    assert_eq!(v["overallScore"], 75);
    assert_eq!(v["engagement"], 8);
    assert_eq!(v["educationalValue"], 7);
    assert_eq!(v["clarity"], 8);
    assert_eq!(v["adaptability"], 7);
    assert!(!out.analysis.suggestions.is_empty());
  }

  #[tokio::test]
  async fn model_scores_are_clamped() {
    let reply = json!({
      "overallScore": 140, "engagement": 9.6, "educationalValue": 0,
      "clarity": 7, "adaptability": 8, "suggestions": ["Add a song", " "]
    });
    let api = Arc::new(ScriptedCompletion::always(format!("```json\n{}\n```", reply)));
    let activity = synthesize(&fixtures::request());
    let out = engine_with(&api).analyze(&activity).await;
    assert_eq!(out.source, Source::Model);
    assert_eq!(out.analysis.overall_score, 100);
    assert_eq!(out.analysis.engagement, 10);
    assert_eq!(out.analysis.educational_value, 1);
    assert_eq!(out.analysis.suggestions, vec!["Add a song".to_string()]);
    assert!(api.requests()[0].user.contains(&activity.title));
  }

  #[tokio::test]
  async fn bad_reply_or_outage_uses_fallback_once() {
    let activity = synthesize(&fixtures::request());

    let api = Arc::new(ScriptedCompletion::always("{\"overallScore\": \"great\"}"));
    let out = engine_with(&api).analyze(&activity).await;
    assert_eq!(out.analysis, fallback_analysis());

    let api = Arc::new(ScriptedCompletion::failing());
    let out = engine_with(&api).analyze(&activity).await;
    assert_eq!(out.source, Source::Fallback);
    assert_eq!(api.calls(), 1);
  }
}
