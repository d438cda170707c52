//! Domain models used by the engine: the generation request (child profile,
//! therapy targets, advanced options), the generated activity, and the quality
//! scorecard. Wire names are camelCase so the frontend can post its form state as-is.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// How the child prefers to take in new information.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LearningStyle {
  Visual,
  Auditory,
  Kinesthetic,
  #[default]
  Mixed,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EnergyLevel {
  Low,
  #[default]
  Medium,
  High,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SocialPreference {
  #[default]
  Independent,
  SmallGroup,
  LargeGroup,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TechnologyIntegration {
  #[default]
  None,
  Minimal,
  Moderate,
  Extensive,
}

impl fmt::Display for LearningStyle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      LearningStyle::Visual => "visual",
      LearningStyle::Auditory => "auditory",
      LearningStyle::Kinesthetic => "kinesthetic",
      LearningStyle::Mixed => "mixed",
    })
  }
}

impl fmt::Display for EnergyLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      EnergyLevel::Low => "low",
      EnergyLevel::Medium => "medium",
      EnergyLevel::High => "high",
    })
  }
}

impl fmt::Display for SocialPreference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      SocialPreference::Independent => "independent play",
      SocialPreference::SmallGroup => "small group",
      SocialPreference::LargeGroup => "large group",
    })
  }
}

impl fmt::Display for TechnologyIntegration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      TechnologyIntegration::None => "none",
      TechnologyIntegration::Minimal => "minimal",
      TechnologyIntegration::Moderate => "moderate",
      TechnologyIntegration::Extensive => "extensive",
    })
  }
}

/// Snapshot of the child the activity is for. Not the authoritative record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChildProfile {
  pub name: String,
  pub age: u32,
  #[serde(default)] pub interests: Vec<String>,
  #[serde(default)] pub sensory_needs: Vec<String>,
  #[serde(default)] pub speech_goals: Vec<String>,
  #[serde(default)] pub ot_goals: Vec<String>,
  #[serde(default)] pub developmental_areas: Vec<String>,
  #[serde(default)] pub learning_style: LearningStyle,
  #[serde(default)] pub energy_level: EnergyLevel,
  #[serde(default)] pub social_preference: SocialPreference,
}

/// Either list may be empty, meaning "not applicable".
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct TherapyTargets {
  #[serde(default)] pub speech: Vec<String>,
  #[serde(default)] pub ot: Vec<String>,
}

/// Optional feature toggles. Every enabled toggle asks the model for an extra
/// output section (see `prompt::compile`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedOptions {
  #[serde(default)] pub include_multimedia: Option<bool>,
  #[serde(default)] pub generate_assessment_rubric: Option<bool>,
  #[serde(default)] pub generate_extension_activities: Option<bool>,
  #[serde(default)] pub generate_reflection_prompts: Option<bool>,
  #[serde(default)] pub cultural_considerations: Option<String>,
  #[serde(default)] pub language_support: Option<Vec<String>>,
  #[serde(default)] pub budget_range: Option<String>,
  #[serde(default)] pub technology_integration: Option<TechnologyIntegration>,
}

impl AdvancedOptions {
  pub fn wants_multimedia(&self) -> bool { self.include_multimedia.unwrap_or(false) }
  pub fn wants_rubric(&self) -> bool { self.generate_assessment_rubric.unwrap_or(false) }
  pub fn wants_extensions(&self) -> bool { self.generate_extension_activities.unwrap_or(false) }
  pub fn wants_reflection(&self) -> bool { self.generate_reflection_prompts.unwrap_or(false) }

  /// Non-blank cultural considerations, if any.
  pub fn cultural(&self) -> Option<&str> {
    self.cultural_considerations.as_deref().map(str::trim).filter(|s| !s.is_empty())
  }

  pub fn languages(&self) -> &[String] {
    self.language_support.as_deref().unwrap_or(&[])
  }

  pub fn budget(&self) -> Option<&str> {
    self.budget_range.as_deref().map(str::trim).filter(|s| !s.is_empty())
  }

  /// Technology level, unless it is absent or explicitly `none`.
  pub fn technology(&self) -> Option<TechnologyIntegration> {
    self.technology_integration.filter(|t| *t != TechnologyIntegration::None)
  }
}

/// The single unit of work submitted to the engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AIGenerationRequest {
  pub child_profile: ChildProfile,
  pub activity_type: String,
  pub category: String,
  #[serde(default)] pub methodologies: Vec<String>,
  /// Minutes.
  pub duration: u32,
  pub environment: String,
  #[serde(default)] pub material_constraints: Vec<String>,
  #[serde(default)] pub learning_objectives: Vec<String>,
  #[serde(default)] pub therapy_targets: TherapyTargets,
  #[serde(default)] pub adaptation_needs: Vec<String>,
  #[serde(default)] pub advanced_options: AdvancedOptions,
}

/// Structural contract violations. These are the only errors a caller of
/// `generate` can observe.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
  #[error("childProfile.name must not be blank")]
  BlankChildName,
  #[error("{0} must not be blank")]
  BlankField(&'static str),
  #[error("duration must be a positive number of minutes")]
  ZeroDuration,
  #[error("count {requested} exceeds the maximum of {max} activities per batch")]
  BatchTooLarge { requested: usize, max: usize },
}

impl AIGenerationRequest {
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.child_profile.name.trim().is_empty() {
      return Err(ValidationError::BlankChildName);
    }
    if self.activity_type.trim().is_empty() {
      return Err(ValidationError::BlankField("activityType"));
    }
    if self.category.trim().is_empty() {
      return Err(ValidationError::BlankField("category"));
    }
    if self.environment.trim().is_empty() {
      return Err(ValidationError::BlankField("environment"));
    }
    if self.duration == 0 {
      return Err(ValidationError::ZeroDuration);
    }
    Ok(())
  }
}

/// Model output is loosely typed: `null` or a mismatched type becomes the default.
fn lenient<'de, D, T>(de: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned + Default,
{
  let value = Value::deserialize(de)?;
  Ok(serde_json::from_value(value).unwrap_or_default())
}

/// A string list from whatever the model sent. A bare scalar becomes one
/// entry, an object collapses to its name-like field (or its JSON text), and
/// blank entries are dropped.
fn lenient_strings<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let items = match Value::deserialize(de)? {
    Value::Array(items) => items,
    Value::Null => Vec::new(),
    other => vec![other],
  };
  Ok(items.into_iter().filter_map(entry_text).filter(|s| !s.trim().is_empty()).collect())
}

fn lenient_string<'de, D>(de: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Value::deserialize(de)? {
    Value::String(s) => s,
    _ => String::new(),
  })
}

const NAME_KEYS: [&str; 5] = ["name", "item", "title", "text", "description"];

fn entry_text(value: Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s),
    Value::Object(map) => {
      let named = NAME_KEYS.iter().find_map(|k| map.get(*k).and_then(Value::as_str).map(str::to_string));
      Some(named.unwrap_or_else(|| Value::Object(map).to_string()))
    }
    other => Some(other.to_string()),
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Adaptations {
  #[serde(default, deserialize_with = "lenient_strings")] pub sensory: Vec<String>,
  #[serde(default, deserialize_with = "lenient_strings")] pub motor: Vec<String>,
  #[serde(default, deserialize_with = "lenient_strings")] pub cognitive: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
  #[serde(default, deserialize_with = "lenient_strings")] pub observation_points: Vec<String>,
  #[serde(default, deserialize_with = "lenient_strings")] pub milestones: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ParentGuidance {
  #[serde(default, deserialize_with = "lenient_strings")] pub setup_tips: Vec<String>,
  #[serde(default, deserialize_with = "lenient_strings")] pub encouragement_phrases: Vec<String>,
  #[serde(default, deserialize_with = "lenient_strings")] pub extension_ideas: Vec<String>,
  #[serde(default, deserialize_with = "lenient_strings")] pub troubleshooting: Vec<String>,
}

/// Response contract shared by model-backed and template-backed activities.
///
/// Only `title`, `description` and `materials` are guaranteed, and only after
/// `engine::parse_activity` has checked them. Deserialization never rejects a
/// field for its type: `null` or a mismatch becomes the default, and string
/// lists accept bare strings and objects. The optional extension sections are
/// kept as raw JSON. Unknown top-level fields are preserved in `extra`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AIGeneratedActivity {
  #[serde(default, deserialize_with = "lenient_string")] pub title: String,
  #[serde(default, deserialize_with = "lenient_string")] pub description: String,
  #[serde(default, deserialize_with = "lenient_strings")] pub materials: Vec<String>,
  #[serde(default, deserialize_with = "lenient_strings")] pub instructions: Vec<String>,
  #[serde(default, deserialize_with = "lenient_strings")] pub learning_objectives: Vec<String>,
  #[serde(default, deserialize_with = "lenient")] pub adaptations: Adaptations,
  #[serde(default, deserialize_with = "lenient")] pub assessment: Assessment,
  #[serde(default, deserialize_with = "lenient")] pub parent_guidance: ParentGuidance,
  #[serde(default, deserialize_with = "lenient_strings")] pub developmental_areas: Vec<String>,
  #[serde(default, deserialize_with = "lenient_strings")] pub speech_targets: Vec<String>,
  #[serde(default, deserialize_with = "lenient_strings")] pub ot_targets: Vec<String>,
  #[serde(default, deserialize_with = "lenient_strings")] pub tags: Vec<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub multimedia: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assessment_rubric: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub extension_activities: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reflection_prompts: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cultural_adaptations: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub digital_resources: Option<Value>,

  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Scorecard produced by the quality analyzer. Never stored with the activity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualityAnalysis {
  /// 0..=100
  pub overall_score: u8,
  /// 1..=10 sub-scores
  pub engagement: u8,
  pub educational_value: u8,
  pub clarity: u8,
  pub adaptability: u8,
  #[serde(default)] pub suggestions: Vec<String>,
}

/// Which request field bulk generation perturbs per iteration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VariationType {
  Difficulty,
  Methodology,
  Age,
  Environment,
}

/// Where an activity or scorecard came from. Callers may ignore it; tests and
/// logs use it to tell the two paths apart.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Source {
  Model,
  Fallback,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct GenerationOutcome {
  pub source: Source,
  pub activity: AIGeneratedActivity,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AnalysisOutcome {
  pub source: Source,
  pub analysis: QualityAnalysis,
}
