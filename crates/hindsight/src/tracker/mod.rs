//! Issue-tracker collaborator
//!
//! Everything hindsight needs from the issue tracker goes through
//! [`IssueTracker`], so the pipelines can run against GitHub or a test double.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::warn;

use crate::error::TrackerError;

pub mod github;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
  Open,
  Closed,
}

/// An issue as returned by the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerIssue {
  pub number: u64,
  pub title: String,
  pub body: Option<String>,
  pub state: IssueState,
  pub labels: Vec<String>,
  pub created_at: DateTime<Utc>,
  pub closed_at: Option<DateTime<Utc>>,
  /// The GitHub issues API also lists pull requests
  #[serde(default)]
  pub is_pull_request: bool,
}

impl TrackerIssue {
  pub fn body_text(&self) -> &str {
    self.body.as_deref().unwrap_or_default()
  }

  /// Value of the first `prefix:value` label, e.g. `pillar:engineering`
  pub fn label_value(&self, prefix: &str) -> Option<&str> {
    self.labels.iter().find_map(|label| {
      let (key, value) = label.split_once(':')?;
      let value = value.trim();
      (key.trim().eq_ignore_ascii_case(prefix) && !value.is_empty()).then_some(value)
    })
  }
}

/// Operations hindsight performs against one repository's issues
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssueTracker: Send + Sync {
  /// One page (1-based) of closed issues carrying `label`
  async fn closed_issues(
    &self,
    label: &str,
    page: u32,
    per_page: u8,
  ) -> Result<Vec<TrackerIssue>, TrackerError>;

  async fn issue(&self, number: u64) -> Result<TrackerIssue, TrackerError>;

  async fn post_comment(&self, number: u64, body: &str) -> Result<(), TrackerError>;

  async fn add_labels(&self, number: u64, labels: &[String]) -> Result<(), TrackerError>;

  /// Remove a label; a label that is not on the issue is not an error
  async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError>;

  async fn update_body(&self, number: u64, body: &str) -> Result<(), TrackerError>;
}

/// Run an idempotent read, retrying once on a transient failure
pub async fn retry_read<T, F, Fut>(operation: &str, mut call: F) -> Result<T, TrackerError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, TrackerError>>,
{
  match call().await {
    Err(err @ TrackerError::Request { .. }) => {
      warn!(operation, error = %err, "tracker read failed, retrying once");
      call().await
    }
    result => result,
  }
}

/// Apply label changes for one issue; writes are never retried
pub async fn apply_labels(
  tracker: &dyn IssueTracker,
  number: u64,
  add: &[String],
  remove: &[String],
) -> Result<(), TrackerError> {
  if !add.is_empty() {
    tracker.add_labels(number, add).await?;
  }
  for label in remove {
    tracker.remove_label(number, label).await?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockall::predicate::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn issue(labels: &[&str]) -> TrackerIssue {
    TrackerIssue {
      number: 1,
      title: "Migrate X".to_string(),
      body: None,
      state: IssueState::Closed,
      labels: labels.iter().map(|label| label.to_string()).collect(),
      created_at: Utc::now(),
      closed_at: None,
      is_pull_request: false,
    }
  }

  #[test]
  fn test_label_value() {
    let issue = issue(&["type:initiative", "Pillar: Engineering", "domain:"]);
    assert_eq!(issue.label_value("pillar"), Some("Engineering"));
    assert_eq!(issue.label_value("type"), Some("initiative"));
    assert_eq!(issue.label_value("domain"), None);
    assert_eq!(issue.body_text(), "");
  }

  #[tokio::test]
  async fn test_retry_read_retries_request_failures_once() {
    let calls = AtomicUsize::new(0);
    let result = retry_read("list", || {
      let attempt = calls.fetch_add(1, Ordering::SeqCst);
      async move {
        if attempt == 0 {
          Err(TrackerError::request("list", "connection reset"))
        } else {
          Ok(attempt)
        }
      }
    })
    .await;

    assert_eq!(result.unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_retry_read_gives_up_after_second_failure() {
    let calls = AtomicUsize::new(0);
    let result: Result<(), _> = retry_read("list", || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(TrackerError::request("list", "timeout")) }
    })
    .await;

    assert!(matches!(result, Err(TrackerError::Request { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_retry_read_does_not_retry_auth_failures() {
    let calls = AtomicUsize::new(0);
    let result: Result<(), _> = retry_read("list", || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(TrackerError::Auth("bad credentials".to_string())) }
    })
    .await;

    assert!(matches!(result, Err(TrackerError::Auth(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_apply_labels_adds_then_removes() {
    let mut tracker = MockIssueTracker::new();
    tracker
      .expect_add_labels()
      .with(eq(7), eq(vec!["readiness:high".to_string()]))
      .times(1)
      .returning(|_, _| Ok(()));
    tracker.expect_remove_label().with(eq(7), always()).times(2).returning(|_, _| Ok(()));

    let add = vec!["readiness:high".to_string()];
    let remove = vec!["readiness:medium".to_string(), "readiness:low".to_string()];
    apply_labels(&tracker, 7, &add, &remove).await.unwrap();
  }

  #[tokio::test]
  async fn test_apply_labels_stops_on_write_failure() {
    let mut tracker = MockIssueTracker::new();
    tracker
      .expect_add_labels()
      .times(1)
      .returning(|_, _| Err(TrackerError::request("add labels", "forbidden")));
    tracker.expect_remove_label().times(0);

    let result =
      apply_labels(&tracker, 7, &["readiness:low".to_string()], &["readiness:high".to_string()]).await;
    assert!(result.is_err());
  }
}
