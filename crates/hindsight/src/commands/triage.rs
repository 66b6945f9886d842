//! Lessons then readiness for one issue
//!
//! The two halves are independent: a lessons failure (unusable store,
//! comment rejected) is logged and readiness labelling still runs.

use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use crate::commands::readiness::label;
use crate::commands::recommend::{matcher_config, publish, recommend_for, render};
use crate::commands::{default_history_path, fetch_issue, RecommendFormat, RepoArgs};
use crate::config::HindsightConfig;
use crate::error::Result;
use crate::formatter::Recommendation;
use crate::logging;
use crate::model::QueryInitiative;
use crate::readiness::{assess, ReadinessAssessment};
use crate::tracker::IssueTracker;

#[derive(Args, Debug, Clone)]
pub struct TriageArgs {
  /// Issue to triage
  #[arg(long)]
  pub issue_number: u64,
  #[command(flatten)]
  pub repo: RepoArgs,
  /// History Store location
  #[arg(long, default_value_os_t = default_history_path())]
  pub history: PathBuf,
  /// Maximum number of similar initiatives (overrides matcher.top_k)
  #[arg(long)]
  pub max: Option<usize>,
  /// Rewrite the issue's lessons section before scoring readiness
  #[arg(long)]
  pub update_body: bool,
  /// Print results without writing to the issue tracker
  #[arg(long)]
  pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageOutcome {
  pub recommendation: Option<Recommendation>,
  pub assessment: ReadinessAssessment,
}

pub async fn run(
  args: &TriageArgs,
  config: &HindsightConfig,
  tracker: &dyn IssueTracker,
  out: &mut dyn Write,
) -> Result<TriageOutcome> {
  let matcher = matcher_config(config, args.max)?;
  let issue = fetch_issue(tracker, args.issue_number).await?;
  let mut body = issue.body_text().to_string();

  let lessons = async {
    let query = QueryInitiative::from_issue_body(Some(&issue.title), &body);
    let recommendation = recommend_for(&query, &args.history, &matcher);
    out.write_all(render(&recommendation, RecommendFormat::Markdown)?.as_bytes())?;
    let updated = if args.dry_run {
      logging::info(&format!("Dry run: comment for #{} not posted", args.issue_number));
      None
    } else {
      publish(tracker, args.issue_number, &recommendation, Some(&body), args.update_body).await?
    };
    Ok::<_, crate::error::HindsightError>((recommendation, updated))
  }
  .await;

  let recommendation = match lessons {
    Ok((recommendation, updated)) => {
      if let Some(updated) = updated {
        body = updated;
      }
      Some(recommendation)
    }
    Err(err) => {
      warn!(error = %err, "lessons step failed, continuing with readiness");
      logging::warn(&format!("Lessons step failed: {err}"));
      None
    }
  };

  let assessment = assess(&body, &config.readiness);
  out.write_all(b"\n")?;
  out.write_all(assessment.to_text().as_bytes())?;
  label(tracker, args.issue_number, &assessment, args.dry_run).await?;

  Ok(TriageOutcome { recommendation, assessment })
}

pub async fn handle(args: &TriageArgs, config: &HindsightConfig) -> anyhow::Result<()> {
  logging::announce(&format!("Triaging initiative #{}", args.issue_number));
  let tracker = args.repo.tracker(&config.tracker, !args.dry_run)?;

  let mut stdout = std::io::stdout().lock();
  let outcome = run(args, config, &tracker, &mut stdout).await?;
  logging::success(&format!(
    "Triage complete: {}/100 ({}){}",
    outcome.assessment.total_score,
    outcome.assessment.label,
    if outcome.recommendation.is_some() { "" } else { ", lessons unavailable" }
  ));
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::TrackerError;
  use crate::readiness::{Dimension, LABEL_MEDIUM};
  use crate::store::{tests::record, HistoryStore};
  use crate::tracker::{IssueState, MockIssueTracker, TrackerIssue};
  use chrono::Utc;
  use tempfile::TempDir;

  const BODY: &str = "### Pillar\nEngineering\n### Domain\nplatform\n### Initiative Title\nMigrate billing database\n\
### Purpose\nMove the billing tables onto the managed cluster to retire the legacy host.\n\
### Lessons From Past Initiatives\n(auto-populated by analyse-initiatives workflow)\n";

  fn issue() -> TrackerIssue {
    TrackerIssue {
      number: 30,
      title: "Migrate billing database".to_string(),
      body: Some(BODY.to_string()),
      state: IssueState::Open,
      labels: Vec::new(),
      created_at: Utc::now(),
      closed_at: None,
      is_pull_request: false,
    }
  }

  fn args(dir: &TempDir, update_body: bool) -> TriageArgs {
    let history = dir.path().join("history.jsonl");
    HistoryStore::new(vec![record(12, "Migrate billing database", "Move billing tables to the managed cluster")])
      .unwrap()
      .write(&history)
      .unwrap();
    TriageArgs {
      issue_number: 30,
      repo: RepoArgs::default(),
      history,
      max: None,
      update_body,
      dry_run: false,
    }
  }

  #[tokio::test]
  async fn test_spliced_lessons_count_towards_readiness() {
    let dir = TempDir::new().unwrap();
    let mut tracker = MockIssueTracker::new();
    tracker.expect_issue().times(1).returning(|_| Ok(issue()));
    tracker.expect_post_comment().times(1).returning(|_, _| Ok(()));
    tracker.expect_update_body().times(1).returning(|_, _| Ok(()));
    tracker.expect_add_labels().times(1).returning(|_, _| Ok(()));
    tracker.expect_remove_label().times(2).returning(|_, _| Ok(()));

    let mut out = Vec::new();
    let outcome = run(&args(&dir, true), &HindsightConfig::default(), &tracker, &mut out).await.unwrap();

    assert!(outcome.recommendation.is_some());
    assert_eq!(outcome.assessment.score(Dimension::LessonsIntegration), 15);
  }

  #[tokio::test]
  async fn test_lessons_failure_does_not_block_labelling() {
    let dir = TempDir::new().unwrap();
    let mut tracker = MockIssueTracker::new();
    tracker.expect_issue().returning(|_| Ok(issue()));
    tracker
      .expect_post_comment()
      .times(1)
      .returning(|_, _| Err(TrackerError::request("post comment", "secondary rate limit")));
    tracker.expect_update_body().times(0);
    tracker.expect_add_labels().times(1).returning(|_, _| Ok(()));
    tracker.expect_remove_label().times(2).returning(|_, _| Ok(()));

    let mut out = Vec::new();
    let outcome = run(&args(&dir, true), &HindsightConfig::default(), &tracker, &mut out).await.unwrap();

    assert!(outcome.recommendation.is_none());
    assert_eq!(outcome.assessment.score(Dimension::LessonsIntegration), 0);
    assert_ne!(outcome.assessment.label, LABEL_MEDIUM);
  }

  #[tokio::test]
  async fn test_dry_run_reads_only() {
    let dir = TempDir::new().unwrap();
    let mut tracker = MockIssueTracker::new();
    tracker.expect_issue().returning(|_| Ok(issue()));
    tracker.expect_post_comment().times(0);
    tracker.expect_update_body().times(0);
    tracker.expect_add_labels().times(0);
    tracker.expect_remove_label().times(0);

    let mut triage = args(&dir, true);
    triage.dry_run = true;
    let mut out = Vec::new();
    let outcome = run(&triage, &HindsightConfig::default(), &tracker, &mut out).await.unwrap();

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("Lessons from Past Initiatives"));
    assert!(printed.contains(&format!("Readiness: {}/100", outcome.assessment.total_score)));
  }
}
