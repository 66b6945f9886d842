//! Policy configuration for hindsight
//!
//! Similarity floors, confidence buckets, and readiness label thresholds are
//! policy rather than constants. They live here with serde defaults so a
//! repository can override any subset from `.hindsight.yml`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{HindsightError, Result};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = ".hindsight.yml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HindsightConfig {
  #[serde(default)]
  pub matcher: MatcherConfig,
  #[serde(default)]
  pub readiness: ReadinessConfig,
  #[serde(default)]
  pub tracker: TrackerConfig,
}

/// Similarity matcher thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
  /// Matches at or below this score are dropped
  #[serde(default = "default_min_score")]
  pub min_score: f64,
  /// Maximum number of matches returned
  #[serde(default = "default_top_k")]
  pub top_k: usize,
  /// Additive bonus per shared pillar/domain tag
  #[serde(default = "default_tag_boost")]
  pub tag_boost: f64,
  #[serde(default)]
  pub confidence: ConfidenceThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
  #[serde(default = "default_high_confidence")]
  pub high: f64,
  #[serde(default = "default_medium_confidence")]
  pub medium: f64,
}

/// Readiness label thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessConfig {
  #[serde(default = "default_readiness_high")]
  pub high: u32,
  #[serde(default = "default_readiness_medium")]
  pub medium: u32,
  /// Minimum characters for purpose/scope to count as clear
  #[serde(default = "default_min_text_len")]
  pub min_text_len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
  #[serde(default = "default_label_filter")]
  pub label_filter: String,
  #[serde(default = "default_max_pages")]
  pub max_pages: u32,
  #[serde(default = "default_per_page")]
  pub per_page: u8,
  /// GitHub Enterprise host; empty uses github.com
  #[serde(default)]
  pub host: String,
}

fn default_min_score() -> f64 {
  0.05
}
fn default_top_k() -> usize {
  10
}
fn default_tag_boost() -> f64 {
  0.1
}
fn default_high_confidence() -> f64 {
  0.5
}
fn default_medium_confidence() -> f64 {
  0.25
}
fn default_readiness_high() -> u32 {
  80
}
fn default_readiness_medium() -> u32 {
  50
}
fn default_min_text_len() -> usize {
  40
}
fn default_label_filter() -> String {
  "type:initiative".to_string()
}
fn default_max_pages() -> u32 {
  10
}
fn default_per_page() -> u8 {
  100
}

impl Default for MatcherConfig {
  fn default() -> Self {
    Self {
      min_score: default_min_score(),
      top_k: default_top_k(),
      tag_boost: default_tag_boost(),
      confidence: ConfidenceThresholds::default(),
    }
  }
}

impl Default for ConfidenceThresholds {
  fn default() -> Self {
    Self { high: default_high_confidence(), medium: default_medium_confidence() }
  }
}

impl Default for ReadinessConfig {
  fn default() -> Self {
    Self {
      high: default_readiness_high(),
      medium: default_readiness_medium(),
      min_text_len: default_min_text_len(),
    }
  }
}

impl Default for TrackerConfig {
  fn default() -> Self {
    Self {
      label_filter: default_label_filter(),
      max_pages: default_max_pages(),
      per_page: default_per_page(),
      host: String::new(),
    }
  }
}

impl HindsightConfig {
  /// Load configuration from a YAML file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
      HindsightError::Config(format!("cannot read {}: {}", path.display(), e))
    })?;
    let config: HindsightConfig = serde_yaml::from_str(&content)
      .map_err(|e| HindsightError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
  }

  /// Load the explicit config file, else `.hindsight.yml` if present, else defaults
  pub fn load(explicit: Option<&Path>) -> Result<Self> {
    if let Some(path) = explicit {
      return Self::load_from_file(path);
    }

    if Path::new(DEFAULT_CONFIG_FILE).exists() {
      return Self::load_from_file(DEFAULT_CONFIG_FILE);
    }

    Ok(Self::default())
  }

  /// Reject policy values that would make scoring meaningless
  pub fn validate(&self) -> Result<()> {
    let m = &self.matcher;
    for (name, value) in [
      ("matcher.min_score", m.min_score),
      ("matcher.tag_boost", m.tag_boost),
      ("matcher.confidence.high", m.confidence.high),
      ("matcher.confidence.medium", m.confidence.medium),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(HindsightError::Config(format!("{name} must be within [0, 1], got {value}")));
      }
    }
    if m.confidence.medium > m.confidence.high {
      return Err(HindsightError::Config(
        "matcher.confidence.medium must not exceed matcher.confidence.high".to_string(),
      ));
    }
    if m.top_k == 0 {
      return Err(HindsightError::Config("matcher.top_k must be at least 1".to_string()));
    }

    let r = &self.readiness;
    if r.high > 100 || r.medium > 100 {
      return Err(HindsightError::Config("readiness thresholds must be within 0..=100".to_string()));
    }
    if r.medium > r.high {
      return Err(HindsightError::Config(
        "readiness.medium must not exceed readiness.high".to_string(),
      ));
    }

    let t = &self.tracker;
    if t.per_page == 0 || t.per_page > 100 {
      return Err(HindsightError::Config("tracker.per_page must be within 1..=100".to_string()));
    }
    if t.max_pages == 0 {
      return Err(HindsightError::Config("tracker.max_pages must be at least 1".to_string()));
    }
    Ok(())
  }
}
