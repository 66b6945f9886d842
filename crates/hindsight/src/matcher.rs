//! Ranking of historical records against a new initiative

use tracing::debug;

use crate::config::{ConfidenceThresholds, MatcherConfig};
use crate::model::{Confidence, HistoricalRecord, QueryInitiative, SimilarityMatch};
use crate::similarity::{cosine, TfIdfIndex};
use crate::store::HistoryStore;
use crate::tokenize::document_text;

/// Bucket a score into a confidence label
pub fn confidence_for(score: f64, thresholds: &ConfidenceThresholds) -> Confidence {
  if score >= thresholds.high {
    Confidence::High
  } else if score >= thresholds.medium {
    Confidence::Medium
  } else {
    Confidence::Low
  }
}

fn same_tag(a: Option<&str>, b: Option<&str>) -> bool {
  match (a, b) {
    (Some(a), Some(b)) => {
      let a = a.trim();
      !a.is_empty() && a.eq_ignore_ascii_case(b.trim())
    }
    _ => false,
  }
}

/// A store indexed for similarity queries
pub struct Matcher<'a> {
  store: &'a HistoryStore,
  index: TfIdfIndex,
  config: MatcherConfig,
}

impl<'a> Matcher<'a> {
  pub fn new(store: &'a HistoryStore, config: MatcherConfig) -> Self {
    let index = TfIdfIndex::build(
      store.records().iter().map(|record| document_text(&record.title, &record.raw_body)),
    );
    debug!(records = store.len(), "built similarity index");
    Self { store, index, config }
  }

  /// Records scoring above the floor, best first, at most `top_k`
  pub fn find_matches(&self, query: &QueryInitiative) -> Vec<SimilarityMatch<'a>> {
    if self.index.is_empty() {
      return Vec::new();
    }

    let query_vector = self.index.vectorize(&document_text(&query.title, &query.raw_body));
    if query_vector.is_empty() {
      debug!("query has no extractable terms");
      return Vec::new();
    }

    let store: &'a HistoryStore = self.store;
    let mut matches: Vec<SimilarityMatch<'a>> = store
      .records()
      .iter()
      .enumerate()
      .filter_map(|(position, record)| {
        let vector = self.index.document(position)?;
        let score = self.boosted(cosine(&query_vector, vector), record, query);
        (score > self.config.min_score).then(|| SimilarityMatch {
          record,
          score,
          confidence: confidence_for(score, &self.config.confidence),
        })
      })
      .collect();

    matches.sort_by(|a, b| {
      b.score
        .total_cmp(&a.score)
        .then_with(|| b.record.created_at.cmp(&a.record.created_at))
        .then_with(|| b.record.id.cmp(&a.record.id))
    });
    matches.truncate(self.config.top_k);
    matches
  }

  fn boosted(&self, score: f64, record: &HistoricalRecord, query: &QueryInitiative) -> f64 {
    let shared_tags = [
      same_tag(record.pillar.as_deref(), query.pillar.as_deref()),
      same_tag(record.domain.as_deref(), query.domain.as_deref()),
    ]
    .iter()
    .filter(|shared| **shared)
    .count();

    (score + shared_tags as f64 * self.config.tag_boost).clamp(0.0, 1.0)
  }
}

/// One-shot convenience over [`Matcher`]
pub fn find_matches<'a>(
  store: &'a HistoryStore,
  query: &QueryInitiative,
  config: &MatcherConfig,
) -> Vec<SimilarityMatch<'a>> {
  Matcher::new(store, config.clone()).find_matches(query)
}
