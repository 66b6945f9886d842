//! Readiness Scorer
//!
//! Scores an initiative issue body out of 100 across five fixed dimensions.
//! Scoring is infallible: any text, including an empty or garbled body,
//! yields a complete assessment and therefore a label to apply.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::body::{ParsedBody, Section};
use crate::config::ReadinessConfig;

pub const LABEL_HIGH: &str = "readiness:high";
pub const LABEL_MEDIUM: &str = "readiness:medium";
pub const LABEL_LOW: &str = "readiness:low";

/// Tag label prefixes, read back by the indexer when a body has no tag section
pub const ARCHETYPE_LABEL_PREFIX: &str = "archetype";
pub const DOMAIN_LABEL_PREFIX: &str = "domain";

/// Hints are only given below this share of a dimension's maximum
const HINT_RATIO: (u32, u32) = (3, 4);
const MAX_HINTS: usize = 5;

const REQUIRED_FIELDS: &[Section] = &[
  Section::Pillar,
  Section::Domain,
  Section::InitiativeTitle,
  Section::Purpose,
  Section::Scope,
  Section::CapabilityAreas,
  Section::Deliverables,
  Section::SuccessIndicators,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
  Completeness,
  Clarity,
  Planning,
  LessonsIntegration,
  RiskAwareness,
}

impl Dimension {
  pub const ALL: [Dimension; 5] = [
    Dimension::Completeness,
    Dimension::Clarity,
    Dimension::Planning,
    Dimension::LessonsIntegration,
    Dimension::RiskAwareness,
  ];

  pub fn max_points(self) -> u32 {
    match self {
      Dimension::Completeness => 30,
      Dimension::Clarity => 25,
      Dimension::Planning => 20,
      Dimension::LessonsIntegration => 15,
      Dimension::RiskAwareness => 10,
    }
  }

  fn hint(self) -> &'static str {
    match self {
      Dimension::Completeness => {
        "Complete all required fields (pillar, domain, title, purpose, scope, capability areas, deliverables, success indicators)"
      }
      Dimension::Clarity => {
        "Improve clarity: state the purpose in a full sentence, define what is in and out of scope, make success indicators measurable"
      }
      Dimension::Planning => {
        "Enhance planning: list 2-6 capability areas, itemise concrete deliverables, identify dependencies"
      }
      Dimension::LessonsIntegration => {
        "Review lessons from similar past initiatives and reference them (#id) or state that there is no relevant precedent"
      }
      Dimension::RiskAwareness => "Strengthen risk awareness: define constraints, security posture, and test strategy",
    }
  }
}

impl fmt::Display for Dimension {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Dimension::Completeness => "completeness",
      Dimension::Clarity => "clarity",
      Dimension::Planning => "planning",
      Dimension::LessonsIntegration => "lessons_integration",
      Dimension::RiskAwareness => "risk_awareness",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessLevel {
  Low,
  Medium,
  High,
}

impl ReadinessLevel {
  pub fn from_score(total: u32, config: &ReadinessConfig) -> Self {
    if total >= config.high {
      ReadinessLevel::High
    } else if total >= config.medium {
      ReadinessLevel::Medium
    } else {
      ReadinessLevel::Low
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      ReadinessLevel::High => LABEL_HIGH,
      ReadinessLevel::Medium => LABEL_MEDIUM,
      ReadinessLevel::Low => LABEL_LOW,
    }
  }

  fn summary(self) -> &'static str {
    match self {
      ReadinessLevel::High => "Initiative is well planned - address any remaining gaps before execution",
      ReadinessLevel::Medium => "Initiative has a good foundation but needs refinement in key areas",
      ReadinessLevel::Low => "Initiative needs significant work before proceeding - focus on the core fields first",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadinessAssessment {
  pub dimension_scores: BTreeMap<Dimension, u32>,
  pub total_score: u32,
  pub level: ReadinessLevel,
  pub label: &'static str,
  pub hints: Vec<String>,
  pub labels_to_add: Vec<String>,
  pub labels_to_remove: Vec<String>,
}

impl ReadinessAssessment {
  pub fn score(&self, dimension: Dimension) -> u32 {
    self.dimension_scores.get(&dimension).copied().unwrap_or(0)
  }

  /// Plain-text report for terminals and CI logs
  pub fn to_text(&self) -> String {
    let mut out = format!("Readiness: {}/100 ({})\n\nScore breakdown:\n", self.total_score, self.label);
    for dimension in Dimension::ALL {
      out.push_str(&format!(
        "  {:<20} {:>2}/{}\n",
        dimension.to_string(),
        self.score(dimension),
        dimension.max_points()
      ));
    }
    if !self.hints.is_empty() {
      out.push_str("\nRecommendations:\n");
      for hint in &self.hints {
        out.push_str(&format!("  - {hint}\n"));
      }
    }
    out.push_str(&format!("\nLabels to add: {}\n", self.labels_to_add.join(", ")));
    out.push_str(&format!("Labels to remove: {}\n", self.labels_to_remove.join(", ")));
    out
  }
}

fn measurable_regex() -> &'static Regex {
  static MEASURABLE: OnceLock<Regex> = OnceLock::new();
  MEASURABLE.get_or_init(|| {
    Regex::new(r"(?i)\d+\s*%|\d+\s*(?:min|minutes|hours|days|weeks)\b|[<>]=?\s*\d+")
      .expect("valid measurable regex")
  })
}

fn issue_reference_regex() -> &'static Regex {
  static REFERENCE: OnceLock<Regex> = OnceLock::new();
  REFERENCE.get_or_init(|| Regex::new(r"#\d+\b").expect("valid issue reference regex"))
}

/// Score an issue body
pub fn assess(body: &str, config: &ReadinessConfig) -> ReadinessAssessment {
  let parsed = ParsedBody::parse(body);

  let mut dimension_scores = BTreeMap::new();
  dimension_scores.insert(Dimension::Completeness, completeness(&parsed));
  dimension_scores.insert(Dimension::Clarity, clarity(&parsed, config.min_text_len));
  dimension_scores.insert(Dimension::Planning, planning(&parsed));
  dimension_scores.insert(Dimension::LessonsIntegration, lessons_integration(&parsed));
  dimension_scores.insert(Dimension::RiskAwareness, risk_awareness(&parsed));

  let total_score: u32 = dimension_scores.values().sum();
  let level = ReadinessLevel::from_score(total_score, config);

  let mut hints = vec![level.summary().to_string()];
  hints.extend(
    Dimension::ALL
      .iter()
      .filter(|dimension| {
        let earned = dimension_scores.get(dimension).copied().unwrap_or(0);
        earned * HINT_RATIO.1 < dimension.max_points() * HINT_RATIO.0
      })
      .map(|dimension| dimension.hint().to_string()),
  );
  hints.truncate(MAX_HINTS);

  let labels_to_remove = [LABEL_HIGH, LABEL_MEDIUM, LABEL_LOW]
    .iter()
    .filter(|label| **label != level.label())
    .map(|label| label.to_string())
    .collect();

  let mut labels_to_add = vec![level.label().to_string()];
  labels_to_add.extend(tag_labels(&parsed));

  ReadinessAssessment {
    dimension_scores,
    total_score,
    level,
    label: level.label(),
    hints,
    labels_to_add,
    labels_to_remove,
  }
}

/// `archetype:<pillar>` and `domain:<domain>`, lower-cased
fn tag_labels(parsed: &ParsedBody) -> Vec<String> {
  [(ARCHETYPE_LABEL_PREFIX, Section::Pillar), (DOMAIN_LABEL_PREFIX, Section::Domain)]
    .into_iter()
    .filter_map(|(prefix, section)| {
      let value = parsed.get(section)?.lines().next()?.trim().to_lowercase();
      (!value.is_empty()).then(|| format!("{prefix}:{value}"))
    })
    .collect()
}

fn completeness(parsed: &ParsedBody) -> u32 {
  let present = REQUIRED_FIELDS.iter().filter(|field| parsed.has(**field)).count() as u32;
  present * Dimension::Completeness.max_points() / REQUIRED_FIELDS.len() as u32
}

fn clarity(parsed: &ParsedBody, min_text_len: usize) -> u32 {
  let mut points = 0;

  if let Some(purpose) = parsed.get(Section::Purpose) {
    points += if purpose.chars().count() >= min_text_len { 8 } else { 4 };
  }

  if let Some(scope) = parsed.get(Section::Scope) {
    points += if defines_boundaries(scope) || scope.chars().count() >= min_text_len { 8 } else { 4 };
  }

  if let Some(indicators) = parsed.get(Section::SuccessIndicators) {
    points += if measurable_regex().is_match(indicators) { 9 } else { 5 };
  }

  points
}

fn in_scope_regex() -> &'static Regex {
  static IN_SCOPE: OnceLock<Regex> = OnceLock::new();
  IN_SCOPE.get_or_init(|| Regex::new(r"(?i)\bin[\s_-]*scope\b").expect("valid in-scope regex"))
}

fn out_of_scope_regex() -> &'static Regex {
  static OUT_OF_SCOPE: OnceLock<Regex> = OnceLock::new();
  OUT_OF_SCOPE
    .get_or_init(|| Regex::new(r"(?i)\bout[\s_-]*of[\s_-]*scope\b").expect("valid out-of-scope regex"))
}

/// Scope names both what is in and what is out
fn defines_boundaries(scope: &str) -> bool {
  in_scope_regex().is_match(scope) && out_of_scope_regex().is_match(scope)
}

fn planning(parsed: &ParsedBody) -> u32 {
  let mut points = 0;

  let areas = parsed.items(Section::CapabilityAreas).len();
  if (2..=6).contains(&areas) {
    points += 7;
  } else if areas > 0 {
    points += 4;
  }

  let deliverables = parsed.items(Section::Deliverables).len();
  if deliverables >= 2 {
    points += 8;
  } else if deliverables == 1 {
    points += 4;
  }

  if parsed.has(Section::Dependencies) {
    points += 5;
  }

  points
}

fn lessons_integration(parsed: &ParsedBody) -> u32 {
  match parsed.get(Section::LessonsFromPastInitiatives) {
    Some(lessons)
      if issue_reference_regex().is_match(lessons)
        || lessons.to_lowercase().contains("no relevant precedent") =>
    {
      15
    }
    Some(_) => 8,
    None => 0,
  }
}

fn risk_awareness(parsed: &ParsedBody) -> u32 {
  let mut points = 0;

  let constraints = parsed.items(Section::Constraints).len();
  if constraints >= 3 {
    points += 5;
  } else if constraints > 0 {
    points += 3;
  }
  if parsed.has(Section::SecurityPosture) {
    points += 3;
  }
  if parsed.has(Section::TestStrategy) {
    points += 2;
  }

  points
}
