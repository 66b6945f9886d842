use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::body::{ParsedBody, Section};

/// Outcome of a closed initiative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
  Completed,
  Abandoned,
  Blocked,
}

impl RecordStatus {
  /// Interpret a free-text outcome such as `delivered` or `not planned`
  pub fn from_outcome(outcome: &str) -> Option<Self> {
    let key: String = outcome.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect();
    match key.as_str() {
      "delivered" | "completed" | "complete" | "done" | "shipped" => Some(RecordStatus::Completed),
      "abandoned" | "cancelled" | "canceled" | "notplanned" | "wontfix" | "dropped" => {
        Some(RecordStatus::Abandoned)
      }
      "blocked" | "stalled" | "onhold" => Some(RecordStatus::Blocked),
      _ => None,
    }
  }
}

impl fmt::Display for RecordStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      RecordStatus::Completed => "completed",
      RecordStatus::Abandoned => "abandoned",
      RecordStatus::Blocked => "blocked",
    };
    f.write_str(name)
  }
}

/// Knowledge extracted from one closed initiative issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
  /// Source issue number
  pub id: u64,
  pub title: String,
  pub raw_body: String,
  pub status: RecordStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pillar: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub domain: Option<String>,
  #[serde(default)]
  pub root_causes: Vec<String>,
  #[serde(default)]
  pub mitigations: Vec<String>,
  #[serde(default)]
  pub success_factors: Vec<String>,
  #[serde(default)]
  pub risks: Vec<String>,
  pub created_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub closed_at: Option<DateTime<Utc>>,
}

impl HistoricalRecord {
  pub fn has_lessons(&self) -> bool {
    !(self.root_causes.is_empty()
      && self.mitigations.is_empty()
      && self.success_factors.is_empty()
      && self.risks.is_empty())
  }
}

/// The initiative being evaluated; never persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryInitiative {
  pub title: String,
  pub raw_body: String,
  #[serde(default)]
  pub pillar: Option<String>,
  #[serde(default)]
  pub domain: Option<String>,
}

impl QueryInitiative {
  /// Build a query from an issue body, taking tags from its sections. The
  /// title falls back to the `initiativeTitle` section when none is given.
  pub fn from_issue_body(title: Option<&str>, body: &str) -> Self {
    let parsed = ParsedBody::parse(body);
    let title = title
      .map(str::to_string)
      .or_else(|| parsed.get(Section::InitiativeTitle).map(str::to_string))
      .unwrap_or_default();

    Self {
      title,
      raw_body: body.to_string(),
      pillar: parsed.get(Section::Pillar).map(str::to_string),
      domain: parsed.get(Section::Domain).map(str::to_string),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
  Low,
  Medium,
  High,
}

impl fmt::Display for Confidence {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Confidence::Low => "low",
      Confidence::Medium => "medium",
      Confidence::High => "high",
    };
    f.write_str(name)
  }
}

/// One ranked historical record for a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatch<'a> {
  pub record: &'a HistoricalRecord,
  /// Cosine similarity plus tag boost, within [0, 1]
  pub score: f64,
  pub confidence: Confidence,
}
