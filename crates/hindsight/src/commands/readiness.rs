use clap::Args;
use std::io::Write;
use std::path::PathBuf;

use crate::commands::{issue_body, ReadinessFormat, RepoArgs};
use crate::config::HindsightConfig;
use crate::error::{HindsightError, Result};
use crate::logging;
use crate::readiness::{assess, ReadinessAssessment};
use crate::tracker::{apply_labels, IssueTracker};

#[derive(Args, Debug, Clone)]
pub struct ReadinessArgs {
  /// Issue body to score; `-` reads stdin
  #[arg(long)]
  pub body_file: Option<PathBuf>,
  /// Issue to read and label
  #[arg(long)]
  pub issue_number: Option<u64>,
  #[command(flatten)]
  pub repo: RepoArgs,
  /// Compute and print without changing labels
  #[arg(long)]
  pub dry_run: bool,
  #[arg(long, value_enum, default_value_t = ReadinessFormat::Text)]
  pub format: ReadinessFormat,
}

pub fn render(assessment: &ReadinessAssessment, format: ReadinessFormat) -> Result<String> {
  match format {
    ReadinessFormat::Text => Ok(assessment.to_text()),
    ReadinessFormat::Json => serde_json::to_string_pretty(assessment)
      .map(|json| json + "\n")
      .map_err(|e| HindsightError::Input(format!("cannot encode assessment: {e}"))),
  }
}

/// Apply the assessment's label changes, or describe them on a dry run
pub async fn label(
  tracker: &dyn IssueTracker,
  number: u64,
  assessment: &ReadinessAssessment,
  dry_run: bool,
) -> Result<()> {
  if dry_run {
    logging::info(&format!(
      "Dry run: would add [{}] and remove [{}] on #{number}",
      assessment.labels_to_add.join(", "),
      assessment.labels_to_remove.join(", ")
    ));
    return Ok(());
  }

  apply_labels(tracker, number, &assessment.labels_to_add, &assessment.labels_to_remove).await?;
  logging::success(&format!("Labelled #{number} {}", assessment.label));
  Ok(())
}

pub async fn run(
  args: &ReadinessArgs,
  config: &HindsightConfig,
  tracker: Option<&dyn IssueTracker>,
  out: &mut dyn Write,
) -> Result<ReadinessAssessment> {
  let (_, body) = issue_body(args.body_file.as_deref(), args.issue_number, tracker).await?;
  let assessment = assess(&body, &config.readiness);
  out.write_all(render(&assessment, args.format)?.as_bytes())?;

  if let (Some(number), Some(tracker)) = (args.issue_number, tracker) {
    label(tracker, number, &assessment, args.dry_run).await?;
  }

  Ok(assessment)
}

pub async fn handle(args: &ReadinessArgs, config: &HindsightConfig) -> anyhow::Result<()> {
  let tracker = match args.issue_number {
    Some(_) => Some(args.repo.tracker(&config.tracker, !args.dry_run)?),
    None => None,
  };

  let mut stdout = std::io::stdout().lock();
  let assessment = run(args, config, tracker.as_ref().map(|t| t as &dyn IssueTracker), &mut stdout).await?;
  logging::info(&format!("Readiness {}/100 ({})", assessment.total_score, assessment.label));
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::readiness::LABEL_LOW;
  use crate::tracker::{IssueState, MockIssueTracker, TrackerIssue};
  use chrono::Utc;
  use mockall::predicate::*;

  fn args(body_file: Option<PathBuf>, issue_number: Option<u64>, dry_run: bool) -> ReadinessArgs {
    ReadinessArgs {
      body_file,
      issue_number,
      repo: RepoArgs::default(),
      dry_run,
      format: ReadinessFormat::Text,
    }
  }

  fn empty_issue() -> TrackerIssue {
    TrackerIssue {
      number: 5,
      title: "New initiative".to_string(),
      body: None,
      state: IssueState::Open,
      labels: Vec::new(),
      created_at: Utc::now(),
      closed_at: None,
      is_pull_request: false,
    }
  }

  #[tokio::test]
  async fn test_labels_applied_from_fetched_issue() {
    let mut tracker = MockIssueTracker::new();
    tracker.expect_issue().with(eq(5)).times(1).returning(|_| Ok(empty_issue()));
    tracker
      .expect_add_labels()
      .with(eq(5), eq(vec![LABEL_LOW.to_string()]))
      .times(1)
      .returning(|_, _| Ok(()));
    tracker.expect_remove_label().times(2).returning(|_, _| Ok(()));

    let mut out = Vec::new();
    let assessment =
      run(&args(None, Some(5), false), &HindsightConfig::default(), Some(&tracker), &mut out).await.unwrap();

    assert_eq!(assessment.total_score, 0);
    assert!(String::from_utf8(out).unwrap().starts_with("Readiness: 0/100 (readiness:low)"));
  }

  #[tokio::test]
  async fn test_dry_run_leaves_labels_alone() {
    let mut tracker = MockIssueTracker::new();
    tracker.expect_issue().returning(|_| Ok(empty_issue()));
    tracker.expect_add_labels().times(0);
    tracker.expect_remove_label().times(0);

    let mut out = Vec::new();
    run(&args(None, Some(5), true), &HindsightConfig::default(), Some(&tracker), &mut out).await.unwrap();
  }

  #[tokio::test]
  async fn test_json_output() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"### Pillar\nEngineering").unwrap();

    let mut readiness = args(Some(file.path().to_path_buf()), None, false);
    readiness.format = ReadinessFormat::Json;
    let mut out = Vec::new();
    run(&readiness, &HindsightConfig::default(), None, &mut out).await.unwrap();

    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["dimension_scores"]["completeness"], 3);
    assert_eq!(value["label"], "readiness:low");
  }
}
