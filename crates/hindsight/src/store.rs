//! History Store: one versioned JSON record per line
//!
//! The store is rebuilt wholesale by the indexer and only ever read by the
//! matcher. Replacement goes through a temp file in the target directory and a
//! rename, so readers see either the old or the new store.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::model::HistoricalRecord;

/// Default store location relative to the repository root
pub const DEFAULT_HISTORY_PATH: &str = "analytics/initiatives-history.jsonl";

/// On-disk envelope; new schema versions become new variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "schema")]
pub enum StoredRecord {
  #[serde(rename = "v1")]
  V1(HistoricalRecord),
}

impl From<StoredRecord> for HistoricalRecord {
  fn from(stored: StoredRecord) -> Self {
    match stored {
      StoredRecord::V1(record) => record,
    }
  }
}

/// Immutable in-memory view of the History Store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStore {
  records: Vec<HistoricalRecord>,
}

impl HistoryStore {
  /// Build a store, rejecting duplicate ids
  pub fn new(records: Vec<HistoricalRecord>) -> Result<Self, StoreError> {
    let mut seen = HashSet::new();
    for record in &records {
      if !seen.insert(record.id) {
        return Err(StoreError::DuplicateId(record.id));
      }
    }
    Ok(Self { records })
  }

  pub fn empty() -> Self {
    Self::default()
  }

  pub fn records(&self) -> &[HistoricalRecord] {
    &self.records
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn get(&self, id: u64) -> Option<&HistoricalRecord> {
    self.records.iter().find(|record| record.id == id)
  }

  /// Read a store from disk; any defect is an error
  pub fn load(path: &Path) -> Result<Self, StoreError> {
    if !path.exists() {
      return Err(StoreError::Missing(path.to_path_buf()));
    }
    let file = fs::File::open(path).map_err(|source| io_error(path, source))?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
      let line = line.map_err(|source| io_error(path, source))?;
      if line.trim().is_empty() {
        continue;
      }
      let stored: StoredRecord = serde_json::from_str(&line)
        .map_err(|source| StoreError::Corrupt { line: index + 1, source })?;
      records.push(stored.into());
    }

    debug!(path = %path.display(), records = records.len(), "loaded history store");
    Self::new(records)
  }

  /// Read a store, degrading to an empty corpus when it is missing or corrupt
  pub fn load_or_empty(path: &Path) -> Self {
    match Self::load(path) {
      Ok(store) => store,
      Err(err) => {
        warn!(path = %path.display(), error = %err, "history store unavailable, using empty corpus");
        Self::empty()
      }
    }
  }

  /// Replace the store at `path` with these records
  pub fn write(&self, path: &Path) -> Result<(), StoreError> {
    let dir = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|source| io_error(&dir, source))?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(|source| io_error(&dir, source))?;
    for record in &self.records {
      let line = serde_json::to_string(&StoredRecord::V1(record.clone()))
        .map_err(|source| StoreError::Encode { id: record.id, source })?;
      writeln!(temp, "{line}").map_err(|source| io_error(path, source))?;
    }
    temp.flush().map_err(|source| io_error(path, source))?;
    temp.persist(path).map_err(|err| io_error(path, err.error))?;

    debug!(path = %path.display(), records = self.records.len(), "wrote history store");
    Ok(())
  }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
  StoreError::Io { path: path.to_path_buf(), source }
}
