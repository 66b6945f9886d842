//! TF-IDF vector space over the historical corpus
//!
//! Term frequency is log-scaled (`1 + ln(count)`) for corpus and query alike.
//! Inverse document frequency is computed over the historical corpus only and
//! smoothed as `ln((1 + N) / (1 + df)) + 1`, which keeps weights positive for
//! terms present in every record (including single-record corpora) and gives
//! query-only terms the largest weight.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::tokenize::tokenize;

/// Sparse term weights; ordered so float sums are reproducible
pub type SparseVector = BTreeMap<String, f64>;

pub fn term_frequency(count: usize) -> f64 {
  if count == 0 {
    0.0
  } else {
    1.0 + (count as f64).ln()
  }
}

#[derive(Debug, Clone, Default)]
pub struct TfIdfIndex {
  documents: usize,
  document_frequency: HashMap<String, usize>,
  vectors: Vec<SparseVector>,
}

impl TfIdfIndex {
  /// Index a corpus of documents; vector `i` belongs to document `i`
  pub fn build<I, S>(documents: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let tokenized: Vec<Vec<String>> =
      documents.into_iter().map(|doc| tokenize(doc.as_ref())).collect();

    let mut document_frequency: HashMap<String, usize> = HashMap::new();
    for tokens in &tokenized {
      let unique: HashSet<&String> = tokens.iter().collect();
      for term in unique {
        *document_frequency.entry(term.clone()).or_insert(0) += 1;
      }
    }

    let mut index = Self { documents: tokenized.len(), document_frequency, vectors: Vec::new() };
    index.vectors = tokenized.iter().map(|tokens| index.weigh(tokens)).collect();
    index
  }

  pub fn len(&self) -> usize {
    self.documents
  }

  pub fn is_empty(&self) -> bool {
    self.documents == 0
  }

  pub fn idf(&self, term: &str) -> f64 {
    let df = self.document_frequency.get(term).copied().unwrap_or(0);
    ((1.0 + self.documents as f64) / (1.0 + df as f64)).ln() + 1.0
  }

  /// Vector of an indexed document
  pub fn document(&self, position: usize) -> Option<&SparseVector> {
    self.vectors.get(position)
  }

  /// Vector of text outside the corpus; it does not change document frequencies
  pub fn vectorize(&self, text: &str) -> SparseVector {
    self.weigh(&tokenize(text))
  }

  fn weigh(&self, tokens: &[String]) -> SparseVector {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for token in tokens {
      *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    counts
      .into_iter()
      .map(|(term, count)| (term.to_string(), term_frequency(count) * self.idf(term)))
      .collect()
  }
}

pub fn magnitude(vector: &SparseVector) -> f64 {
  vector.values().map(|w| w * w).sum::<f64>().sqrt()
}

/// Cosine similarity of two sparse vectors, 0.0 when either is empty
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
  let magnitude_a = magnitude(a);
  let magnitude_b = magnitude(b);
  if magnitude_a == 0.0 || magnitude_b == 0.0 {
    return 0.0;
  }

  let dot_product: f64 =
    a.iter().filter_map(|(term, weight)| b.get(term).map(|other| weight * other)).sum();

  (dot_product / (magnitude_a * magnitude_b)).clamp(0.0, 1.0)
}
