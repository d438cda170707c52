//! Template activity used whenever the model path fails.
//!
//! Everything here is string interpolation over the request itself: no
//! network, no randomness, no failure. The result satisfies the same
//! required-field contract as a model-backed activity and always fills
//! adaptations, assessment and parent guidance. Optional extension sections
//! are left empty.

use std::collections::HashSet;

use crate::domain::{
  AIGeneratedActivity, AIGenerationRequest, Adaptations, Assessment, EnergyLevel, LearningStyle,
  ParentGuidance, SocialPreference,
};
use crate::util::{capitalize, join_or};

fn first_non_blank(items: &[String]) -> Option<&str> {
  items.iter().map(|s| s.trim()).find(|s| !s.is_empty())
}

fn non_blank(items: &[String]) -> Vec<String> {
  items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn style_step(style: LearningStyle, theme: &str) -> String {
  match style {
    LearningStyle::Visual => format!("Show a picture or model of the {} idea before starting and keep it in view.", theme),
    LearningStyle::Auditory => format!("Introduce the {} idea with a short song, rhyme or story.", theme),
    LearningStyle::Kinesthetic => format!("Let the child touch, move and build with the {} materials right away.", theme),
    LearningStyle::Mixed => format!("Introduce the {} idea by showing it, talking about it and letting the child touch it.", theme),
  }
}

fn energy_tip(level: EnergyLevel) -> &'static str {
  match level {
    EnergyLevel::Low => "Keep the pace calm and offer a seated option for every step.",
    EnergyLevel::Medium => "Alternate active steps with quieter ones to keep attention steady.",
    EnergyLevel::High => "Add a movement break (jumping, stomping or a quick dance) between steps.",
  }
}

fn social_step(pref: SocialPreference, name: &str) -> String {
  match pref {
    SocialPreference::Independent => format!("Give {} space to explore independently while you stay close by.", name),
    SocialPreference::SmallGroup => format!("Invite one or two friends or family members to take turns with {}.", name),
    SocialPreference::LargeGroup => format!("Turn the activity into a group game so {} can share ideas with others.", name),
  }
}

/// Build a schema-valid activity from the request alone. Total: never fails and
/// never leaves `title`, `description` or `materials` empty.
pub fn synthesize(req: &AIGenerationRequest) -> AIGeneratedActivity {
  let child = &req.child_profile;
  let name = if child.name.trim().is_empty() { "your child" } else { child.name.trim() };
  let interest = first_non_blank(&child.interests).unwrap_or("discovery");
  let activity_type = if req.activity_type.trim().is_empty() { "learning" } else { req.activity_type.trim() };
  let category = if req.category.trim().is_empty() { "early learning" } else { req.category.trim() };
  let environment = if req.environment.trim().is_empty() { "indoor" } else { req.environment.trim() };
  let duration = req.duration.max(1);

  let title = format!("{}'s {} {} Adventure", name, capitalize(interest), capitalize(activity_type));

  let description = format!(
    "A {}-minute {} activity in the {} area, designed for {} (age {}) and built around an interest in {}. \
     It is set up for a {} setting and suits a {} learning style.",
    duration, activity_type, category, name, child.age,
    join_or(&child.interests, "exploring new things"),
    environment, child.learning_style,
  );

  let materials = vec![
    format!("{}-themed toys, pictures or props", capitalize(interest)),
    "Large sheets of paper and chunky crayons or markers".to_string(),
    "A tray or basket to organize materials".to_string(),
    format!("A timer set for {} minutes", duration),
  ];

  let mut instructions = vec![
    format!("Prepare a clear, safe {} space and lay out the materials before inviting {}.", environment, name),
    style_step(child.learning_style, interest),
    format!("Invite {} to explore the {} materials and name what they notice.", name, interest),
    format!("Guide a short {} task connected to {}, modelling each step first.", activity_type, category),
    social_step(child.social_preference, name),
    format!("Close by looking back together at what {} made or discovered and celebrating the effort.", name),
  ];
  if let Some(objective) = first_non_blank(&req.learning_objectives) {
    instructions.insert(4, format!("Practice the goal \"{}\" with two or three short, playful repetitions.", objective));
  }

  let mut learning_objectives = non_blank(&req.learning_objectives);
  if learning_objectives.is_empty() {
    learning_objectives = vec![
      format!("Build {} skills through hands-on {} play", category, activity_type),
      "Practice following simple multi-step directions".to_string(),
      format!("Express ideas and feelings about {}", interest),
    ];
  }

  let mut sensory: Vec<String> = child.sensory_needs.iter().map(|s| s.trim()).filter(|s| !s.is_empty())
    .map(|need| format!("Accommodate {}: offer a quieter or lower-intensity version of each step.", need))
    .collect();
  sensory.push("Offer a calm-down corner and allow breaks whenever needed.".to_string());

  let mut motor: Vec<String> = req.therapy_targets.ot.iter().chain(child.ot_goals.iter())
    .map(|s| s.trim()).filter(|s| !s.is_empty())
    .map(|goal| format!("Build in practice for {} during material handling.", goal))
    .collect();
  motor.push("Provide larger materials or adaptive grips if fine motor tasks are difficult.".to_string());

  let mut cognitive = vec![
    format!("Break instructions into one step at a time and use {} supports.", child.learning_style),
    "Offer two choices at each step to support decision-making.".to_string(),
  ];
  cognitive.extend(non_blank(&req.adaptation_needs).into_iter().map(|n| format!("Adapt for {}.", n)));

  let areas = non_blank(&child.developmental_areas);
  let mut observation_points: Vec<String> = areas.iter()
    .map(|a| format!("How does {} show progress in {}?", name, a))
    .collect();
  observation_points.push(format!("How long does {} stay engaged with the activity?", name));
  observation_points.push("Which steps needed extra support or modelling?".to_string());

  let mut milestones: Vec<String> = areas.iter()
    .map(|a| format!("Shows emerging {} skills appropriate for age {}", a, child.age))
    .collect();
  milestones.push("Completes the activity with minimal adult prompting".to_string());

  let mut speech_tips: Vec<String> = req.therapy_targets.speech.iter().chain(child.speech_goals.iter())
    .map(|s| s.trim()).filter(|s| !s.is_empty())
    .map(|t| format!("Model and pause to invite practice of {} while playing.", t))
    .collect();

  let mut setup_tips = vec![
    format!("Set up the {} space before {} arrives so the activity can start right away.", environment, name),
    format!("Plan for about {} minutes and stop while {} is still having fun.", duration, name),
  ];
  setup_tips.append(&mut speech_tips);

  let parent_guidance = ParentGuidance {
    setup_tips,
    encouragement_phrases: vec![
      format!("Great job, {}! Tell me about what you made.", name),
      format!("I love how you kept trying, {}!", name),
      format!("What do you think happens next, {}?", name),
    ],
    extension_ideas: vec![
      format!("Read a picture book about {} together later in the day.", interest),
      format!("Repeat the activity in a different place than the {} setting.", environment),
    ],
    troubleshooting: vec![
      energy_tip(child.energy_level).to_string(),
      format!("If {} loses interest, shorten the task and return to the {} materials they enjoy most.", name, interest),
    ],
  };

  let mut developmental_areas = areas.clone();
  if developmental_areas.is_empty() {
    developmental_areas = vec!["cognitive".to_string(), "social-emotional".to_string()];
  }

  let mut tags = vec![activity_type.to_lowercase(), category.to_lowercase()];
  tags.extend(non_blank(&req.methodologies));
  tags.extend(non_blank(&child.interests).into_iter().map(|i| i.to_lowercase()));
  let mut seen = HashSet::new();
  tags.retain(|t| seen.insert(t.clone()));

  AIGeneratedActivity {
    title,
    description,
    materials,
    instructions,
    learning_objectives,
    adaptations: Adaptations { sensory, motor, cognitive },
    assessment: Assessment { observation_points, milestones },
    parent_guidance,
    developmental_areas,
    speech_targets: non_blank(&req.therapy_targets.speech),
    ot_targets: non_blank(&req.therapy_targets.ot),
    tags,
    ..Default::default()
  }
}
