//! Indexer: closed initiative issues in, History Store out
//!
//! The store is rebuilt from scratch on every run. Tracker reads happen before
//! anything is written, so a failed run leaves the previous store in place.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::body::{split_items, ParsedBody, Section};
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::model::{HistoricalRecord, RecordStatus};
use crate::readiness::{ARCHETYPE_LABEL_PREFIX, DOMAIN_LABEL_PREFIX};
use crate::store::HistoryStore;
use crate::tracker::{retry_read, IssueState, IssueTracker, TrackerIssue};

const MAX_INLINE_LESSONS: usize = 3;
const MAX_CONSTRAINT_RISKS: usize = 2;
const MAX_ACHIEVED_FACTORS: usize = 2;

// violet ignore chunk
const CONSTRAINT_RISKS: &[&str] = &[
  "budget",
  "timeline",
  "resource",
  "dependency",
  "complexity",
  "security",
  "compliance",
  "integration",
  "scalability",
];

/// Counts from one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
  pub fetched: usize,
  pub indexed: usize,
  pub with_lessons: usize,
  pub skipped_open: usize,
  pub skipped_pull_requests: usize,
  pub duplicates: usize,
}

fn root_cause_patterns() -> &'static [Regex] {
  static ROOT_CAUSE: OnceLock<Vec<Regex>> = OnceLock::new();
  ROOT_CAUSE.get_or_init(|| compile_markers(&[r"root\s*causes?", r"caused\s+by", r"due\s+to"]))
}

fn mitigation_patterns() -> &'static [Regex] {
  static MITIGATION: OnceLock<Vec<Regex>> = OnceLock::new();
  MITIGATION
    .get_or_init(|| compile_markers(&[r"mitigations?", r"to\s+prevent", r"solution", r"resolved\s+by"]))
}

/// One regex per marker; the capture ends at the next clause boundary
fn compile_markers(markers: &[&str]) -> Vec<Regex> {
  markers
    .iter()
    .map(|marker| {
      Regex::new(&format!(r"(?i)\b{marker}[:\s]+([^,.;\n]+)")).expect("valid inline lesson regex")
    })
    .collect()
}

fn out_of_scope_regex() -> &'static Regex {
  static OUT_OF_SCOPE: OnceLock<Regex> = OnceLock::new();
  OUT_OF_SCOPE.get_or_init(|| Regex::new(r"(?i)out\s*of\s*scope[:\s]*([^\n]+)").expect("valid scope regex"))
}

/// Each marker is matched on its own so one marker never swallows the next.
/// Lessons keep their order of appearance in the text.
fn inline_lessons(text: &str, patterns: &[Regex]) -> Vec<String> {
  let mut found: Vec<(usize, String)> = patterns
    .iter()
    .flat_map(|pattern| pattern.captures_iter(text))
    .filter_map(|caps| caps.get(1))
    .map(|m| (m.start(), clean_item(m.as_str())))
    .filter(|(_, item)| !item.is_empty())
    .collect();
  found.sort_by_key(|(start, _)| *start);

  let mut lessons = Vec::new();
  for (_, item) in found {
    push_unique(&mut lessons, item);
  }
  lessons.truncate(MAX_INLINE_LESSONS);
  lessons
}

fn clean_item(item: &str) -> String {
  item.trim().trim_end_matches(['.', ';']).trim().to_string()
}

fn push_unique(items: &mut Vec<String>, item: String) {
  if !items.iter().any(|existing| existing.eq_ignore_ascii_case(&item)) {
    items.push(item);
  }
}

fn status_of(parsed: &ParsedBody, issue: &TrackerIssue) -> RecordStatus {
  parsed
    .get(Section::OutcomeStatus)
    .and_then(|outcome| RecordStatus::from_outcome(outcome.lines().next().unwrap_or_default()))
    .or_else(|| issue.label_value("status").and_then(RecordStatus::from_outcome))
    .unwrap_or(RecordStatus::Completed)
}

fn risks_of(parsed: &ParsedBody) -> Vec<String> {
  let mut risks = Vec::new();
  for risk in parsed.items(Section::Risks) {
    push_unique(&mut risks, clean_item(&risk));
  }

  if let Some(constraints) = parsed.get(Section::Constraints) {
    let lowered = constraints.to_lowercase();
    CONSTRAINT_RISKS
      .iter()
      .filter(|keyword| lowered.contains(*keyword))
      .take(MAX_CONSTRAINT_RISKS)
      .for_each(|keyword| push_unique(&mut risks, format!("Potential {keyword} constraints")));
  }

  if let Some(out_of_scope) =
    parsed
      .get(Section::Scope)
      .and_then(|scope| out_of_scope_regex().captures(scope))
      .and_then(|caps| caps.get(1))
  {
    let lowered = out_of_scope.as_str().to_lowercase();
    if lowered.contains("sync") {
      push_unique(&mut risks, "Data synchronisation complexity".to_string());
    }
    if lowered.contains("integration") {
      push_unique(&mut risks, "External integration challenges".to_string());
    }
  }

  risks
}

/// Extract a record from one closed issue. Malformed bodies give empty lessons.
pub fn record_from_issue(issue: &TrackerIssue) -> HistoricalRecord {
  let parsed = ParsedBody::parse(issue.body_text());
  let postmortem = parsed.get(Section::Postmortem).unwrap_or_default();
  let status = status_of(&parsed, issue);

  let mut root_causes = parsed.items(Section::RootCauses);
  if root_causes.is_empty() {
    root_causes = inline_lessons(postmortem, root_cause_patterns());
  }

  let mut mitigations = parsed.items(Section::Mitigations);
  if mitigations.is_empty() {
    mitigations = inline_lessons(postmortem, mitigation_patterns());
  }

  let mut success_factors = parsed.items(Section::SuccessFactors);
  if success_factors.is_empty() && status == RecordStatus::Completed {
    success_factors = parsed
      .get(Section::SuccessIndicators)
      .map(split_items)
      .unwrap_or_default()
      .into_iter()
      .take(MAX_ACHIEVED_FACTORS)
      .map(|indicator| format!("Achieved: {indicator}"))
      .collect();
  }

  let pillar = parsed
    .get(Section::Pillar)
    .or_else(|| issue.label_value("pillar"))
    .or_else(|| issue.label_value(ARCHETYPE_LABEL_PREFIX))
    .map(str::to_string);
  let domain = parsed
    .get(Section::Domain)
    .or_else(|| issue.label_value(DOMAIN_LABEL_PREFIX))
    .map(str::to_string);

  HistoricalRecord {
    id: issue.number,
    title: issue.title.trim().to_string(),
    raw_body: issue.body_text().to_string(),
    status,
    pillar,
    domain,
    root_causes,
    mitigations,
    success_factors,
    risks: risks_of(&parsed),
    created_at: issue.created_at,
    closed_at: issue.closed_at,
  }
}

/// Turn fetched issues into records, keeping the first occurrence of each id
pub fn index_issues(issues: &[TrackerIssue]) -> (Vec<HistoricalRecord>, IndexSummary) {
  let mut summary = IndexSummary { fetched: issues.len(), ..IndexSummary::default() };
  let mut seen = HashSet::new();
  let mut records = Vec::new();

  for issue in issues {
    if issue.is_pull_request {
      summary.skipped_pull_requests += 1;
      continue;
    }
    if issue.state != IssueState::Closed {
      summary.skipped_open += 1;
      continue;
    }
    if !seen.insert(issue.number) {
      summary.duplicates += 1;
      debug!(number = issue.number, "duplicate issue skipped");
      continue;
    }

    let record = record_from_issue(issue);
    if record.has_lessons() {
      summary.with_lessons += 1;
    }
    records.push(record);
  }

  summary.indexed = records.len();
  (records, summary)
}

/// Fetch every closed issue carrying `label`, page by page
pub async fn fetch_closed_issues(
  tracker: &dyn IssueTracker,
  label: &str,
  config: &TrackerConfig,
) -> std::result::Result<Vec<TrackerIssue>, TrackerError> {
  let mut issues = Vec::new();

  for page in 1..=config.max_pages {
    let batch =
      retry_read("list closed issues", || tracker.closed_issues(label, page, config.per_page)).await?;
    let fetched = batch.len();
    issues.extend(batch);

    if fetched < usize::from(config.per_page) {
      return Ok(issues);
    }
    if page == config.max_pages {
      warn!(max_pages = config.max_pages, "page limit reached, older issues were not indexed");
    }
  }

  Ok(issues)
}

/// Rebuild the History Store at `output` from the tracker
pub async fn rebuild(
  tracker: &dyn IssueTracker,
  label: &str,
  output: &Path,
  config: &TrackerConfig,
  dry_run: bool,
) -> Result<IndexSummary> {
  let issues = fetch_closed_issues(tracker, label, config).await?;
  let (records, summary) = index_issues(&issues);
  let store = HistoryStore::new(records)?;

  if dry_run {
    info!(records = store.len(), "dry run, history store not written");
  } else {
    store.write(output)?;
    info!(path = %output.display(), records = store.len(), "history store rebuilt");
  }

  Ok(summary)
}
