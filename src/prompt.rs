//! Prompt compiler: renders an `AIGenerationRequest` into the user prompt sent
//! to the completion API.
//!
//! Layout:
//! 1) CHILD PROFILE, ACTIVITY REQUIREMENTS, TEACHING METHODOLOGIES, MATERIAL CONSTRAINTS
//! 2) therapy target lines, only for non-empty lists
//! 3) ADDITIONAL REQUIREMENTS, one line per enabled advanced option
//! 4) the expected JSON output shape, extended with one fragment per enabled option
//!
//! Empty lists in (1) render a neutral placeholder so the section header is
//! always present. Therapy targets and option fragments are omitted outright.

use crate::domain::{AIGenerationRequest, AdvancedOptions, TherapyTargets};
use crate::util::join_or;

/// Methodology id -> one-sentence pedagogical description.
pub const METHODOLOGIES: &[(&str, &str)] = &[
  ("montessori", "Child-led, hands-on learning with real materials, prepared environments and self-correcting tasks."),
  ("reggio-emilia", "Project-based exploration that follows the child's curiosity and documents their many ways of expressing ideas."),
  ("waldorf", "Imaginative, rhythm-based play with natural materials, storytelling and artistic activity."),
  ("play-based", "Learning through open-ended, child-directed play where adults extend the child's ideas."),
  ("stem", "Inquiry-driven exploration of science, technology, engineering and math through prediction, testing and observation."),
  ("high-scope", "Active participatory learning built around a plan-do-review cycle and key developmental indicators."),
  ("emergent-curriculum", "Activities that grow from the child's current interests and questions rather than a fixed plan."),
  ("floortime", "Relationship-based play that follows the child's lead to build engagement, communication and emotional thinking."),
  ("aba", "Structured teaching that breaks skills into small steps with clear prompts and positive reinforcement."),
  ("sensory-integration", "Purposeful sensory experiences that help the child organize and respond to sensory input."),
  ("hanen", "Responsive interaction strategies that create natural opportunities for communication during everyday routines."),
  ("forest-school", "Regular, child-led outdoor learning that builds confidence through hands-on experiences in nature."),
];

const GENERIC_METHODOLOGY: &str = "Apply the core principles of this approach in a developmentally appropriate way.";

pub fn describe_methodology(id: &str) -> &'static str {
  METHODOLOGIES
    .iter()
    .find(|(k, _)| k.eq_ignore_ascii_case(id.trim()))
    .map(|(_, d)| *d)
    .unwrap_or(GENERIC_METHODOLOGY)
}

/// JSON fragment appended to the output shape when `includeMultimedia` is set.
pub const MULTIMEDIA_FRAGMENT: &str = r#"  "multimedia": {
    "songs": ["song or rhyme that fits the activity"],
    "videos": ["short, child-appropriate video idea"],
    "visualAids": ["picture card, chart or visual support"]
  }"#;

pub const RUBRIC_FRAGMENT: &str = r#"  "assessmentRubric": [
    {
      "criterion": "skill being assessed",
      "emerging": "what emerging looks like",
      "developing": "what developing looks like",
      "proficient": "what proficient looks like"
    }
  ]"#;

pub const EXTENSION_ACTIVITIES_FRAGMENT: &str = r#"  "extensionActivities": [
    { "title": "follow-up activity", "description": "how it builds on this activity", "duration": 15 }
  ]"#;

pub const REFLECTION_FRAGMENT: &str = r#"  "reflectionPrompts": {
    "child": ["question to ask the child afterwards"],
    "parent": ["question for the parent or educator to reflect on"]
  }"#;

pub const CULTURAL_FRAGMENT: &str = r#"  "culturalAdaptations": ["culturally responsive adaptation"]"#;

pub const DIGITAL_RESOURCES_FRAGMENT: &str = r#"  "digitalResources": [
    { "name": "app, website or tool", "type": "app|website|video|game", "description": "how to use it with the activity" }
  ]"#;

const BASE_SHAPE: &str = r#"  "title": "engaging activity title",
  "description": "2-3 sentence description of the activity",
  "materials": ["material 1", "material 2"],
  "instructions": ["step 1", "step 2", "step 3"],
  "learningObjectives": ["objective 1"],
  "adaptations": {
    "sensory": ["sensory adaptation"],
    "motor": ["motor adaptation"],
    "cognitive": ["cognitive adaptation"]
  },
  "assessment": {
    "observationPoints": ["what to observe"],
    "milestones": ["milestone this activity supports"]
  },
  "parentGuidance": {
    "setupTips": ["setup tip"],
    "encouragementPhrases": ["encouraging phrase"],
    "extensionIdeas": ["idea to extend learning"],
    "troubleshooting": ["what to do if the child loses interest"]
  },
  "developmentalAreas": ["area 1"],
  "speechTargets": ["speech target addressed, if any"],
  "otTargets": ["OT target addressed, if any"],
  "tags": ["tag1", "tag2"]"#;

/// Render the user prompt. Pure: equal requests produce identical strings.
pub fn compile(req: &AIGenerationRequest) -> String {
  let child = &req.child_profile;
  let mut out = String::with_capacity(4096);

  out.push_str("Create a personalized early childhood learning activity for the child described below.\n\n");

  out.push_str("CHILD PROFILE:\n");
  out.push_str(&format!("- Name: {}\n", child.name.trim()));
  out.push_str(&format!("- Age: {} years old\n", child.age));
  out.push_str(&format!("- Interests: {}\n", join_or(&child.interests, "general play and exploration")));
  out.push_str(&format!("- Learning Style: {}\n", child.learning_style));
  out.push_str(&format!("- Energy Level: {}\n", child.energy_level));
  out.push_str(&format!("- Social Preference: {}\n", child.social_preference));
  out.push_str(&format!("- Sensory Needs: {}\n", join_or(&child.sensory_needs, "no specific sensory needs noted")));
  out.push_str(&format!("- Developmental Focus Areas: {}\n", join_or(&child.developmental_areas, "general development")));
  out.push_str(&format!("- Speech Goals: {}\n", join_or(&child.speech_goals, "none specified")));
  out.push_str(&format!("- Occupational Therapy Goals: {}\n", join_or(&child.ot_goals, "none specified")));

  out.push_str("\nACTIVITY REQUIREMENTS:\n");
  out.push_str(&format!("- Activity Type: {}\n", req.activity_type.trim()));
  out.push_str(&format!("- Category: {}\n", req.category.trim()));
  out.push_str(&format!("- Duration: {} minutes\n", req.duration));
  out.push_str(&format!("- Environment: {}\n", req.environment.trim()));
  out.push_str(&format!("- Learning Objectives: {}\n", join_or(&req.learning_objectives, "age-appropriate developmental growth")));
  out.push_str(&format!("- Adaptation Needs: {}\n", join_or(&req.adaptation_needs, "none specified")));

  out.push_str("\nTEACHING METHODOLOGIES:\n");
  let methodologies: Vec<&str> = req.methodologies.iter().map(|m| m.trim()).filter(|m| !m.is_empty()).collect();
  if methodologies.is_empty() {
    out.push_str("- No specific methodology requested; use developmentally appropriate practice.\n");
  } else {
    for m in methodologies {
      out.push_str(&format!("- {}: {}\n", m, describe_methodology(m)));
    }
  }

  out.push_str("\nMATERIAL CONSTRAINTS:\n");
  out.push_str(&format!("- {}\n", join_or(&req.material_constraints, "Use common household or classroom materials")));

  push_therapy_targets(&mut out, &req.therapy_targets);

  let extras = option_instructions(&req.advanced_options);
  if !extras.is_empty() {
    out.push_str("\nADDITIONAL REQUIREMENTS:\n");
    for line in extras {
      out.push_str(&format!("- {}\n", line));
    }
  }

  out.push_str("\nGUIDELINES:\n");
  out.push_str(&format!("- Make every step safe and developmentally appropriate for a {}-year-old.\n", child.age));
  out.push_str(&format!("- Address {} by name in the encouragement phrases.\n", child.name.trim()));
  out.push_str("- Write instructions as short, ordered steps a parent or educator can follow.\n");

  out.push_str("\nReturn ONLY a JSON object with this exact structure:\n{\n");
  out.push_str(BASE_SHAPE);
  for fragment in output_fragments(&req.advanced_options) {
    out.push_str(",\n");
    out.push_str(fragment);
  }
  out.push_str("\n}\n");
  out
}

/// Each list gets its own line, and only when it has entries.
fn push_therapy_targets(out: &mut String, targets: &TherapyTargets) {
  let speech: Vec<&str> = targets.speech.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
  let ot: Vec<&str> = targets.ot.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
  if speech.is_empty() && ot.is_empty() {
    return;
  }
  out.push_str("\nTHERAPY INTEGRATION:\n");
  if !speech.is_empty() {
    out.push_str(&format!("- Speech Therapy Targets: {}\n", speech.join(", ")));
  }
  if !ot.is_empty() {
    out.push_str(&format!("- OT Targets: {}\n", ot.join(", ")));
  }
}

fn option_instructions(opts: &AdvancedOptions) -> Vec<String> {
  let mut lines = Vec::new();
  if opts.wants_multimedia() {
    lines.push("Include multimedia suggestions (songs, videos, visual aids) in the \"multimedia\" field.".to_string());
  }
  if opts.wants_rubric() {
    lines.push("Include an assessment rubric with emerging/developing/proficient levels in the \"assessmentRubric\" field.".to_string());
  }
  if opts.wants_extensions() {
    lines.push("Include 2-3 follow-up extension activities in the \"extensionActivities\" field.".to_string());
  }
  if opts.wants_reflection() {
    lines.push("Include reflection prompts for the child and the parent in the \"reflectionPrompts\" field.".to_string());
  }
  if let Some(cultural) = opts.cultural() {
    lines.push(format!("Cultural considerations: {}. Include culturally responsive adaptations in the \"culturalAdaptations\" field.", cultural));
  }
  let languages = opts.languages();
  if languages.iter().any(|l| !l.trim().is_empty()) {
    lines.push(format!("Language support: weave simple vocabulary in {} into the instructions and encouragement phrases.", join_or(languages, "")));
  }
  if let Some(budget) = opts.budget() {
    lines.push(format!("Budget range: {}. Keep all materials within this budget.", budget));
  }
  if let Some(tech) = opts.technology() {
    lines.push(format!("Technology integration level: {}. Suggest matching digital resources in the \"digitalResources\" field.", tech));
  }
  lines
}

/// Output-shape fragments for the enabled options, in a fixed order.
pub fn output_fragments(opts: &AdvancedOptions) -> Vec<&'static str> {
  let mut fragments = Vec::new();
  if opts.wants_multimedia() { fragments.push(MULTIMEDIA_FRAGMENT); }
  if opts.wants_rubric() { fragments.push(RUBRIC_FRAGMENT); }
  if opts.wants_extensions() { fragments.push(EXTENSION_ACTIVITIES_FRAGMENT); }
  if opts.wants_reflection() { fragments.push(REFLECTION_FRAGMENT); }
  if opts.cultural().is_some() { fragments.push(CULTURAL_FRAGMENT); }
  if opts.technology().is_some() { fragments.push(DIGITAL_RESOURCES_FRAGMENT); }
  fragments
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::fixtures;
  use crate::domain::{TechnologyIntegration, TherapyTargets};

  #[test]
  fn compilation_is_deterministic() {
    let a = fixtures::request();
    let b = a.clone();
    assert_eq!(compile(&a), compile(&b));
  }

  #[test]
  fn renders_profile_and_requirements() {
    let p = compile(&fixtures::request());
    assert!(p.contains("- Name: Maya"));
    assert!(p.contains("- Age: 4 years old"));
    assert!(p.contains("- Interests: dinosaurs, painting"));
    assert!(p.contains("- Learning Style: kinesthetic"));
    assert!(p.contains("- Social Preference: small group"));
    assert!(p.contains("- Duration: 20 minutes"));
    assert!(p.contains("- no small parts"));
    assert!(p.contains(&format!("- montessori: {}", describe_methodology("montessori"))));
  }

  #[test]
  fn empty_therapy_targets_are_omitted_entirely() {
    let mut req = fixtures::request();
    req.therapy_targets = TherapyTargets { speech: vec![], ot: vec![] };
    let p = compile(&req);
    assert!(!p.contains("Speech Therapy Targets"));
    assert!(!p.contains("OT Targets"));
    assert!(!p.contains("THERAPY INTEGRATION"));
  }

  #[test]
  fn therapy_lines_are_independent() {
    let mut req = fixtures::request();
    req.therapy_targets = TherapyTargets { speech: vec!["/k/ sound".into()], ot: vec![] };
    let p = compile(&req);
    assert!(p.contains("- Speech Therapy Targets: /k/ sound"));
    assert!(!p.contains("OT Targets"));
  }

  #[test]
  fn empty_lists_render_placeholders_not_missing_headers() {
    let mut req = fixtures::request();
    req.child_profile.interests.clear();
    req.material_constraints.clear();
    req.methodologies.clear();
    req.learning_objectives.clear();
    let p = compile(&req);
    assert!(p.contains("- Interests: general play and exploration"));
    assert!(p.contains("MATERIAL CONSTRAINTS:\n- Use common household or classroom materials"));
    assert!(p.contains("TEACHING METHODOLOGIES:\n- No specific methodology requested"));
    assert!(p.contains("- Learning Objectives: age-appropriate developmental growth"));
  }

  #[test]
  fn unknown_methodology_gets_generic_description() {
    assert_eq!(describe_methodology("bank-street"), GENERIC_METHODOLOGY);
    assert_eq!(describe_methodology("Montessori"), describe_methodology("montessori"));
  }

  #[test]
  fn extension_fragment_follows_its_toggle() {
    let mut req = fixtures::request();
    let p = compile(&req);
    assert!(!p.contains("\"extensionActivities\""));
    assert!(!p.contains("ADDITIONAL REQUIREMENTS"));

    req.advanced_options.generate_extension_activities = Some(true);
    let p = compile(&req);
    assert!(p.contains(EXTENSION_ACTIVITIES_FRAGMENT));
    assert!(p.contains("ADDITIONAL REQUIREMENTS"));

    req.advanced_options.generate_extension_activities = Some(false);
    assert!(!compile(&req).contains(EXTENSION_ACTIVITIES_FRAGMENT));
  }

  #[test]
  fn every_option_adds_its_fragment_and_output_stays_json_shaped() {
    let mut req = fixtures::request();
    req.advanced_options.include_multimedia = Some(true);
    req.advanced_options.generate_assessment_rubric = Some(true);
    req.advanced_options.generate_reflection_prompts = Some(true);
    req.advanced_options.cultural_considerations = Some("Lunar New Year traditions".into());
    req.advanced_options.technology_integration = Some(TechnologyIntegration::Moderate);
    req.advanced_options.budget_range = Some("under $10".into());
    req.advanced_options.language_support = Some(vec!["Spanish".into()]);

    assert_eq!(output_fragments(&req.advanced_options).len(), 5);
    let p = compile(&req);
    for fragment in [MULTIMEDIA_FRAGMENT, RUBRIC_FRAGMENT, REFLECTION_FRAGMENT, CULTURAL_FRAGMENT, DIGITAL_RESOURCES_FRAGMENT] {
      assert!(p.contains(fragment));
    }
    assert!(p.contains("Budget range: under $10."));
    assert!(p.contains("vocabulary in Spanish"));

    // The output-shape block is itself valid JSON.
    let start = p.rfind("structure:\n").unwrap() + "structure:\n".len();
    let shape: serde_json::Value = serde_json::from_str(p[start..].trim()).unwrap();
    assert!(shape.get("digitalResources").is_some());
    assert!(shape.get("extensionActivities").is_none());
  }
}
