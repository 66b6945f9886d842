use clap::{Args, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::TrackerConfig;
use crate::error::{HindsightError, Result, TrackerError};
use crate::store::DEFAULT_HISTORY_PATH;
use crate::tracker::github::{GitHubOptions, GitHubTracker};
use crate::tracker::{retry_read, IssueTracker, TrackerIssue};

pub mod index;
pub mod readiness;
pub mod recommend;
pub mod triage;

/// Repository and credentials for issue-tracker access
#[derive(Args, Debug, Clone, Default)]
pub struct RepoArgs {
  /// Repository owner
  #[arg(long, env = "GITHUB_REPOSITORY_OWNER")]
  pub repo_owner: Option<String>,
  /// Repository name
  #[arg(long)]
  pub repo_name: Option<String>,
  /// GitHub Enterprise host (defaults to github.com)
  #[arg(long)]
  pub host: Option<String>,
  /// GitHub personal access token (or use GITHUB_TOKEN env var)
  #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
  pub github_token: Option<String>,
}

impl RepoArgs {
  /// Build a GitHub client. Writes need a token; reads may go anonymous.
  pub fn tracker(&self, config: &TrackerConfig, writes: bool) -> Result<GitHubTracker> {
    let (owner, repo) = match (&self.repo_owner, &self.repo_name) {
      (Some(owner), Some(repo)) => (owner.clone(), repo.clone()),
      _ => {
        return Err(HindsightError::Config(
          "--repo-owner and --repo-name are required to reach the issue tracker".to_string(),
        ))
      }
    };

    let token = self.github_token.clone().filter(|token| !token.trim().is_empty());
    if writes && token.is_none() {
      return Err(
        TrackerError::Auth("no GitHub token provided (set GITHUB_TOKEN or pass --github-token)".to_string()).into(),
      );
    }

    let host = self.host.clone().unwrap_or_else(|| config.host.clone());
    Ok(GitHubTracker::new(GitHubOptions { owner, repo, host, token })?)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RecommendFormat {
  #[default]
  Markdown,
  Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReadinessFormat {
  #[default]
  Text,
  Json,
}

pub fn default_history_path() -> PathBuf {
  PathBuf::from(DEFAULT_HISTORY_PATH)
}

/// Read a file, or stdin for `-`. Invalid UTF-8 is replaced, never rejected.
pub fn read_text(path: &Path) -> Result<String> {
  let bytes = if path == Path::new("-") {
    let mut buffer = Vec::new();
    std::io::stdin().read_to_end(&mut buffer)?;
    buffer
  } else {
    std::fs::read(path)
      .map_err(|e| HindsightError::Input(format!("cannot read {}: {}", path.display(), e)))?
  };
  Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub async fn fetch_issue(tracker: &dyn IssueTracker, number: u64) -> Result<TrackerIssue> {
  Ok(retry_read("get issue", || tracker.issue(number)).await?)
}

/// Issue body from a file, else the tracker issue, else stdin
pub async fn issue_body(
  file: Option<&Path>,
  number: Option<u64>,
  tracker: Option<&dyn IssueTracker>,
) -> Result<(Option<String>, String)> {
  if let Some(path) = file {
    return Ok((None, read_text(path)?));
  }
  if let (Some(number), Some(tracker)) = (number, tracker) {
    let issue = fetch_issue(tracker, number).await?;
    let body = issue.body_text().to_string();
    return Ok((Some(issue.title), body));
  }
  Ok((None, read_text(Path::new("-"))?))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tracker::MockIssueTracker;
  use std::io::Write;

  #[test]
  fn test_read_text_replaces_invalid_utf8() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"### Purpose\n\xff\xfe ship it").unwrap();

    let text = read_text(file.path()).unwrap();
    assert!(text.starts_with("### Purpose\n"));
    assert!(text.ends_with(" ship it"));
  }

  #[test]
  fn test_missing_file_is_input_error() {
    let err = read_text(Path::new("/nonexistent/body.md")).unwrap_err();
    assert!(matches!(err, HindsightError::Input(_)));
  }

  #[test]
  fn test_tracker_requires_repository() {
    let args = RepoArgs { repo_owner: Some("acme".to_string()), ..RepoArgs::default() };
    let err = args.tracker(&TrackerConfig::default(), false).err().unwrap();
    assert_eq!(err.exit_code(), 2);
  }

  #[test]
  fn test_writes_require_token() {
    let args = RepoArgs {
      repo_owner: Some("acme".to_string()),
      repo_name: Some("plans".to_string()),
      ..RepoArgs::default()
    };
    let err = args.tracker(&TrackerConfig::default(), true).err().unwrap();
    assert!(matches!(err, HindsightError::ExternalApi(TrackerError::Auth(_))));
  }

  #[tokio::test]
  async fn test_issue_body_prefers_file_over_tracker() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "local body").unwrap();
    let mut tracker = MockIssueTracker::new();
    tracker.expect_issue().times(0);

    let (title, body) = issue_body(Some(file.path()), Some(4), Some(&tracker)).await.unwrap();
    assert_eq!(title, None);
    assert_eq!(body, "local body");
  }
}
