//! Hindsight - lessons from past initiatives
//!
//! Indexes closed initiative issues into a History Store, recommends lessons
//! for new initiatives by TF-IDF similarity, and scores how ready an
//! initiative's issue body is before work begins.
//!
//! The library is synchronous apart from the issue-tracker boundary in
//! [`tracker`]. The store is passed around as an explicit value; nothing is
//! held in process-wide state.

pub mod body;
pub mod commands;
pub mod config;
pub mod error;
pub mod formatter;
pub mod indexer;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod readiness;
pub mod similarity;
pub mod store;
pub mod tokenize;
pub mod tracker;

pub use config::HindsightConfig;
pub use error::{HindsightError, Result};
pub use formatter::Recommendation;
pub use matcher::{find_matches, Matcher};
pub use model::{Confidence, HistoricalRecord, QueryInitiative, RecordStatus, SimilarityMatch};
pub use readiness::{assess, ReadinessAssessment};
pub use store::HistoryStore;
