use chrono::Utc;
use clap::Args;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::commands::{default_history_path, fetch_issue, issue_body, RecommendFormat, RepoArgs};
use crate::config::{HindsightConfig, MatcherConfig};
use crate::error::{HindsightError, Result};
use crate::formatter::{generated_at_footer, splice_lessons_section, Recommendation};
use crate::logging;
use crate::matcher::find_matches;
use crate::model::QueryInitiative;
use crate::store::HistoryStore;
use crate::tracker::IssueTracker;

#[derive(Args, Debug, Clone)]
pub struct RecommendArgs {
  /// History Store location
  #[arg(long, default_value_os_t = default_history_path())]
  pub history: PathBuf,
  /// Maximum number of similar initiatives (overrides matcher.top_k)
  #[arg(long)]
  pub max: Option<usize>,
  /// Issue body to match; `-` reads stdin
  #[arg(long)]
  pub query_file: Option<PathBuf>,
  /// Initiative title (defaults to the issue or the initiativeTitle field)
  #[arg(long)]
  pub title: Option<String>,
  #[arg(long, value_enum, default_value_t = RecommendFormat::Markdown)]
  pub format: RecommendFormat,
  /// Issue to read and comment on
  #[arg(long)]
  pub issue_number: Option<u64>,
  #[command(flatten)]
  pub repo: RepoArgs,
  /// Also rewrite the issue's lessons section with a short summary
  #[arg(long)]
  pub update_body: bool,
  /// Print the recommendation without writing to the issue tracker
  #[arg(long)]
  pub dry_run: bool,
}

/// Matcher settings with the `--max` override applied
pub fn matcher_config(config: &HindsightConfig, max: Option<usize>) -> Result<MatcherConfig> {
  let mut matcher = config.matcher.clone();
  if let Some(max) = max {
    if max == 0 {
      return Err(HindsightError::Config("--max must be at least 1".to_string()));
    }
    matcher.top_k = max;
  }
  Ok(matcher)
}

/// Match a query against the store at `history`; an unusable store means no matches
pub fn recommend_for(query: &QueryInitiative, history: &Path, matcher: &MatcherConfig) -> Recommendation {
  let store = HistoryStore::load_or_empty(history);
  let matches = find_matches(&store, query, matcher);
  info!(records = store.len(), matches = matches.len(), "matched initiative against history");
  Recommendation::from_matches(&matches)
}

pub fn render(recommendation: &Recommendation, format: RecommendFormat) -> Result<String> {
  match format {
    RecommendFormat::Markdown => {
      Ok(format!("{}{}", recommendation.to_markdown(), generated_at_footer(Utc::now())))
    }
    RecommendFormat::Json => serde_json::to_string_pretty(recommendation)
      .map(|json| json + "\n")
      .map_err(|e| HindsightError::Input(format!("cannot encode recommendation: {e}"))),
  }
}

/// Post the comment and optionally splice the lessons section into the issue body
pub async fn publish(
  tracker: &dyn IssueTracker,
  number: u64,
  recommendation: &Recommendation,
  current_body: Option<&str>,
  update_body: bool,
) -> Result<Option<String>> {
  let comment = format!("{}{}", recommendation.to_markdown(), generated_at_footer(Utc::now()));
  tracker.post_comment(number, &comment).await?;
  logging::success(&format!("Posted lessons comment on #{number}"));

  if !update_body {
    return Ok(None);
  }

  let body = match current_body {
    Some(body) => body.to_string(),
    None => fetch_issue(tracker, number).await?.body_text().to_string(),
  };
  match splice_lessons_section(&body, &recommendation.body_summary()) {
    Some(updated) if updated != body => {
      tracker.update_body(number, &updated).await?;
      logging::success(&format!("Updated lessons section of #{number}"));
      Ok(Some(updated))
    }
    Some(_) => Ok(None),
    None => {
      logging::warn(&format!("Issue #{number} has no lessons section to update"));
      Ok(None)
    }
  }
}

pub async fn run(
  args: &RecommendArgs,
  config: &HindsightConfig,
  tracker: Option<&dyn IssueTracker>,
  out: &mut dyn Write,
) -> Result<Recommendation> {
  let matcher = matcher_config(config, args.max)?;

  let (issue_title, body) = issue_body(args.query_file.as_deref(), args.issue_number, tracker).await?;
  let title = args.title.as_deref().or(issue_title.as_deref());
  let query = QueryInitiative::from_issue_body(title, &body);

  let recommendation = recommend_for(&query, &args.history, &matcher);
  out.write_all(render(&recommendation, args.format)?.as_bytes())?;

  match (args.issue_number, tracker) {
    (Some(number), _) if args.dry_run => {
      logging::info(&format!("Dry run: comment for #{number} not posted"));
    }
    (Some(number), Some(tracker)) => {
      // a body read from a file may be stale, so splice into the live issue body
      let current = if args.query_file.is_none() { Some(body.as_str()) } else { None };
      publish(tracker, number, &recommendation, current, args.update_body).await?;
    }
    _ => {}
  }

  Ok(recommendation)
}

pub async fn handle(args: &RecommendArgs, config: &HindsightConfig) -> anyhow::Result<()> {
  let tracker = match args.issue_number {
    Some(_) => Some(args.repo.tracker(&config.tracker, !args.dry_run)?),
    None => None,
  };

  let mut stdout = std::io::stdout().lock();
  let tracker = tracker.as_ref().map(|t| t as &dyn IssueTracker);
  let recommendation = run(args, config, tracker, &mut stdout).await?;

  if recommendation.has_matches() {
    logging::success(&format!("Found {} similar initiatives", recommendation.similar.len()));
  } else {
    logging::info("No similar initiatives found");
  }
  Ok(())
}
