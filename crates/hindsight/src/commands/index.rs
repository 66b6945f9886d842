use clap::Args;
use std::path::PathBuf;

use crate::commands::{default_history_path, RepoArgs};
use crate::config::HindsightConfig;
use crate::error::{HindsightError, Result};
use crate::indexer::{rebuild, IndexSummary};
use crate::logging;
use crate::tracker::IssueTracker;

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
  /// History Store location
  #[arg(long, default_value_os_t = default_history_path())]
  pub output: PathBuf,
  /// Only index issues carrying this label (overrides tracker.label_filter)
  #[arg(long)]
  pub label_filter: Option<String>,
  /// Maximum pages of closed issues to read (overrides tracker.max_pages)
  #[arg(long)]
  pub max_pages: Option<u32>,
  #[command(flatten)]
  pub repo: RepoArgs,
  /// Fetch and extract without replacing the History Store
  #[arg(long)]
  pub dry_run: bool,
}

pub async fn run(
  args: &IndexArgs,
  config: &HindsightConfig,
  tracker: &dyn IssueTracker,
) -> Result<IndexSummary> {
  let mut tracker_config = config.tracker.clone();
  if let Some(max_pages) = args.max_pages {
    if max_pages == 0 {
      return Err(HindsightError::Config("--max-pages must be at least 1".to_string()));
    }
    tracker_config.max_pages = max_pages;
  }
  let label = args.label_filter.as_deref().unwrap_or(&tracker_config.label_filter);

  rebuild(tracker, label, &args.output, &tracker_config, args.dry_run).await
}

pub async fn handle(args: &IndexArgs, config: &HindsightConfig) -> anyhow::Result<()> {
  logging::announce("Rebuilding initiative history");
  if args.repo.github_token.is_none() {
    logging::warn("No GITHUB_TOKEN found, API rate limits may apply");
  }
  let tracker = args.repo.tracker(&config.tracker, false)?;

  let summary = run(args, config, &tracker).await?;
  logging::success(&format!(
    "Indexed {} of {} issues ({} with lessons) into {}",
    summary.indexed,
    summary.fetched,
    summary.with_lessons,
    args.output.display()
  ));
  if summary.skipped_open + summary.skipped_pull_requests + summary.duplicates > 0 {
    logging::info(&format!(
      "Skipped {} open, {} pull requests, {} duplicates",
      summary.skipped_open, summary.skipped_pull_requests, summary.duplicates
    ));
  }
  Ok(())
}
