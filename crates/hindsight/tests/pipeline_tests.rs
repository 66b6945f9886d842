
use hindsight::commands::index::{self, IndexArgs};
use hindsight::commands::readiness::{self, ReadinessArgs};
use hindsight::commands::recommend::{self, RecommendArgs};
use hindsight::commands::triage::{self, TriageArgs};
use hindsight::commands::{ReadinessFormat, RecommendFormat, RepoArgs};
use hindsight::error::HindsightError;
use hindsight::tracker::IssueState;
use hindsight::{HindsightConfig, HistoryStore, RecordStatus};
use mock_tracker::{issue, MockTracker};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BILLING_POSTMORTEM: &str = "### Pillar\nEngineering\n\n### Domain\nplatform\n\n### Purpose\n\
Move billing tables from the legacy host to the managed database cluster.\n\n### Outcome Status\ndelivered\n\n\
### Postmortem\nCutover slipped a week, caused by schema drift between environments\n\
Resolved by adding a nightly schema diff job\n\n### Success Indicators\n- zero data loss during cutover\n";

const SECURITY_RETRO: &str = "### Pillar\nSecurity\n\n### Domain\ncompliance\n\n### Purpose\n\
Automate dependency scanning across all repositories.\n\n### Outcome Status\nabandoned\n\n\
### Root Cause\n- scanner licence costs\n\n### Mitigations\n- evaluate open source scanners first\n";

const NEW_INITIATIVE: &str = "### Pillar\nEngineering\n\n### Domain\nplatform\n\n### Initiative Title\n\
Migrate analytics database\n\n### Purpose\nMove analytics tables from the legacy host to the managed database cluster.\n\n\
### Scope\nIn scope: analytics tables. Out of scope: dashboards.\n\n### Lessons From Past Initiatives\n\
(auto-populated by analyse-initiatives workflow)\n";

fn tracker() -> MockTracker {
  MockTracker::with_issues(vec![
    issue(12, "Migrate billing database", BILLING_POSTMORTEM, IssueState::Closed, &["type:initiative"]),
    issue(15, "Dependency scanning rollout", SECURITY_RETRO, IssueState::Closed, &["type:initiative"]),
    issue(18, "Unlabelled chore", "cleanup", IssueState::Closed, &["chore"]),
    issue(30, "Migrate analytics database", NEW_INITIATIVE, IssueState::Open, &["type:initiative"]),
  ])
}

fn index_args(output: PathBuf) -> IndexArgs {
  IndexArgs { output, label_filter: None, max_pages: None, repo: RepoArgs::default(), dry_run: false }
}

async fn build_history(tracker: &MockTracker, dir: &TempDir) -> PathBuf {
  let output = dir.path().join("analytics").join("initiatives-history.jsonl");
  index::run(&index_args(output.clone()), &HindsightConfig::default(), tracker).await.unwrap();
  output
}

fn recommend_args(history: &Path, issue_number: Option<u64>) -> RecommendArgs {
  RecommendArgs {
    history: history.to_path_buf(),
    max: None,
    query_file: None,
    title: None,
    format: RecommendFormat::Markdown,
    issue_number,
    repo: RepoArgs::default(),
    update_body: false,
    dry_run: false,
  }
}

#[tokio::test]
async fn test_index_extracts_closed_initiatives() {
  let dir = TempDir::new().unwrap();
  let tracker = tracker();
  let history = build_history(&tracker, &dir).await;

  let store = HistoryStore::load(&history).unwrap();
  assert_eq!(store.len(), 2);

  let billing = store.get(12).unwrap();
  assert_eq!(billing.status, RecordStatus::Completed);
  assert_eq!(billing.root_causes, vec!["schema drift between environments"]);
  assert_eq!(billing.mitigations, vec!["adding a nightly schema diff job"]);
  assert_eq!(billing.success_factors, vec!["Achieved: zero data loss during cutover"]);

  let security = store.get(15).unwrap();
  assert_eq!(security.status, RecordStatus::Abandoned);
  assert_eq!(security.pillar.as_deref(), Some("Security"));
  assert_eq!(security.mitigations, vec!["evaluate open source scanners first"]);
}

#[tokio::test]
async fn test_index_retries_a_transient_read_failure() {
  let dir = TempDir::new().unwrap();
  let tracker = tracker().failing_reads(1);
  let history = build_history(&tracker, &dir).await;

  assert_eq!(HistoryStore::load(&history).unwrap().len(), 2);
  assert_eq!(*tracker.read_calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn test_index_failure_is_external_api_error() {
  let dir = TempDir::new().unwrap();
  let tracker = tracker().failing_reads(2);
  let output = dir.path().join("history.jsonl");

  let err = index::run(&index_args(output.clone()), &HindsightConfig::default(), &tracker).await.unwrap_err();

  assert!(matches!(err, HindsightError::ExternalApi(_)));
  assert_eq!(err.exit_code(), 4);
  assert!(!output.exists());
}

#[tokio::test]
async fn test_recommend_comments_with_the_closest_precedent() {
  let dir = TempDir::new().unwrap();
  let tracker = tracker();
  let history = build_history(&tracker, &dir).await;

  let mut out = Vec::new();
  let recommendation =
    recommend::run(&recommend_args(&history, Some(30)), &HindsightConfig::default(), Some(&tracker), &mut out)
      .await
      .unwrap();

  assert_eq!(recommendation.similar[0].id, 12);
  assert_eq!(recommendation.risks[0], "schema drift between environments");

  let comments = tracker.comments.lock().unwrap();
  assert_eq!(comments.len(), 1);
  assert_eq!(comments[0].0, 30);
  assert!(comments[0].1.contains("#12 Migrate billing database"));
  assert!(comments[0].1.contains("adding a nightly schema diff job"));
  assert!(tracker.body_updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_recommend_output_is_stable_apart_from_footer() {
  let dir = TempDir::new().unwrap();
  let tracker = tracker();
  let history = build_history(&tracker, &dir).await;
  let mut args = recommend_args(&history, Some(30));
  args.dry_run = true;

  let mut first = Vec::new();
  let mut second = Vec::new();
  recommend::run(&args, &HindsightConfig::default(), Some(&tracker), &mut first).await.unwrap();
  recommend::run(&args, &HindsightConfig::default(), Some(&tracker), &mut second).await.unwrap();

  let strip = |out: Vec<u8>| {
    let text = String::from_utf8(out).unwrap();
    text.lines().filter(|line| !line.starts_with("_Generated at")).collect::<Vec<_>>().join("\n")
  };
  assert_eq!(strip(first), strip(second));
  assert!(tracker.comments.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_readiness_labels_replace_previous_readiness() {
  let tracker = tracker();
  let config = HindsightConfig::default();
  let args = ReadinessArgs {
    body_file: None,
    issue_number: Some(30),
    repo: RepoArgs::default(),
    dry_run: false,
    format: ReadinessFormat::Text,
  };

  let mut out = Vec::new();
  let assessment = readiness::run(&args, &config, Some(&tracker), &mut out).await.unwrap();

  assert_eq!(tracker.issue_labels(30), vec![assessment.label, "archetype:engineering", "domain:platform"]);
  assert_eq!(assessment.total_score, assessment.dimension_scores.values().sum::<u32>());
}

#[tokio::test]
async fn test_triage_splices_lessons_before_scoring() {
  let dir = TempDir::new().unwrap();
  let tracker = tracker();
  let history = build_history(&tracker, &dir).await;
  let args = TriageArgs {
    issue_number: 30,
    repo: RepoArgs::default(),
    history,
    max: Some(3),
    update_body: true,
    dry_run: false,
  };

  let mut out = Vec::new();
  let outcome = triage::run(&args, &HindsightConfig::default(), &tracker, &mut out).await.unwrap();

  let updates = tracker.body_updates.lock().unwrap();
  assert_eq!(updates.len(), 1);
  assert!(updates[0].1.contains("Similar initiatives: #12"));
  assert!(!updates[0].1.contains("auto-populated"));
  assert_eq!(outcome.assessment.score(hindsight::readiness::Dimension::LessonsIntegration), 15);
  assert_eq!(tracker.issue_labels(30), outcome.assessment.labels_to_add);
}

#[tokio::test]
async fn test_triage_labels_even_when_comments_fail() {
  let dir = TempDir::new().unwrap();
  let history = build_history(&tracker(), &dir).await;
  let tracker = tracker().failing_writes();
  let args = TriageArgs {
    issue_number: 30,
    repo: RepoArgs::default(),
    history,
    max: None,
    update_body: true,
    dry_run: false,
  };

  // label writes fail too, so the run fails, but only after the lessons failure was absorbed
  let err =
    triage::run(&args, &HindsightConfig::default(), &tracker, &mut Vec::<u8>::new()).await.unwrap_err();
  assert!(matches!(err, HindsightError::ExternalApi(_)));
  assert!(err.to_string().contains("add labels"));
}
