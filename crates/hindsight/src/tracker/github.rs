use async_trait::async_trait;
use octocrab::models::issues::Issue;
use octocrab::{params, Octocrab};
use tracing::debug;

use crate::error::TrackerError;
use crate::tracker::{IssueState, IssueTracker, TrackerIssue};

/// Options for GitHub tracker creation
#[derive(Debug, Clone, Default)]
pub struct GitHubOptions {
  pub owner: String,
  pub repo: String,
  /// Custom host (empty string uses github.com)
  pub host: String,
  pub token: Option<String>,
}

pub struct GitHubTracker {
  client: Octocrab,
  owner: String,
  repo: String,
}

impl GitHubTracker {
  /// Build a client; without a token only public reads will succeed
  pub fn new(options: GitHubOptions) -> Result<Self, TrackerError> {
    let builder = Octocrab::builder();
    let builder = match options.token.filter(|token| !token.trim().is_empty()) {
      Some(token) => builder.personal_token(token),
      None => {
        debug!("no GitHub token, using anonymous client");
        builder
      }
    };

    let client = if options.host.is_empty() {
      builder.build()
    } else {
      // GitHub Enterprise serves the REST API under /api/v3
      let base_url = if options.host.starts_with("http") {
        format!("{}/api/v3", options.host.trim_end_matches('/'))
      } else {
        format!("https://{}/api/v3", options.host)
      };
      builder
        .base_uri(base_url.as_str())
        .map_err(|e| TrackerError::request("configure client", e))?
        .build()
    }
    .map_err(|e| TrackerError::request("build client", e))?;

    Ok(Self::from_client(client, options.owner, options.repo))
  }

  pub fn from_client(client: Octocrab, owner: String, repo: String) -> Self {
    Self { client, owner, repo }
  }
}

fn convert(issue: Issue) -> TrackerIssue {
  let state = match issue.state {
    octocrab::models::IssueState::Closed => IssueState::Closed,
    _ => IssueState::Open,
  };

  TrackerIssue {
    number: issue.number,
    title: issue.title,
    body: issue.body,
    state,
    labels: issue.labels.into_iter().map(|label| label.name).collect(),
    created_at: issue.created_at,
    closed_at: issue.closed_at,
    is_pull_request: issue.pull_request.is_some(),
  }
}

fn status_code(error: &octocrab::Error) -> Option<u16> {
  match error {
    octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
    _ => None,
  }
}

/// Classify an octocrab failure
fn tracker_error(operation: &str, number: Option<u64>, error: octocrab::Error) -> TrackerError {
  match (status_code(&error), number) {
    (Some(401), _) | (Some(403), _) => TrackerError::Auth(format!("{operation}: {error}")),
    (Some(404), Some(number)) => TrackerError::NotFound(number),
    _ => TrackerError::request(operation, error),
  }
}

#[async_trait]
impl IssueTracker for GitHubTracker {
  async fn closed_issues(
    &self,
    label: &str,
    page: u32,
    per_page: u8,
  ) -> Result<Vec<TrackerIssue>, TrackerError> {
    let labels = vec![label.to_string()];
    let issues = self
      .client
      .issues(&self.owner, &self.repo)
      .list()
      .state(params::State::Closed)
      .labels(&labels)
      .per_page(per_page)
      .page(page)
      .send()
      .await
      .map_err(|e| tracker_error("list closed issues", None, e))?;

    debug!(page, count = issues.items.len(), "fetched closed issues");
    Ok(issues.items.into_iter().map(convert).collect())
  }

  async fn issue(&self, number: u64) -> Result<TrackerIssue, TrackerError> {
    let issue = self
      .client
      .issues(&self.owner, &self.repo)
      .get(number)
      .await
      .map_err(|e| tracker_error("get issue", Some(number), e))?;
    Ok(convert(issue))
  }

  async fn post_comment(&self, number: u64, body: &str) -> Result<(), TrackerError> {
    self
      .client
      .issues(&self.owner, &self.repo)
      .create_comment(number, body)
      .await
      .map_err(|e| tracker_error("post comment", Some(number), e))?;
    debug!(number, "posted comment");
    Ok(())
  }

  async fn add_labels(&self, number: u64, labels: &[String]) -> Result<(), TrackerError> {
    self
      .client
      .issues(&self.owner, &self.repo)
      .add_labels(number, labels)
      .await
      .map_err(|e| tracker_error("add labels", Some(number), e))?;
    Ok(())
  }

  async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
    match self.client.issues(&self.owner, &self.repo).remove_label(number, label).await {
      Ok(_) => Ok(()),
      // the label was not on the issue
      Err(e) if status_code(&e) == Some(404) => {
        debug!(number, label, "label not present");
        Ok(())
      }
      Err(e) => Err(tracker_error("remove label", Some(number), e)),
    }
  }

  async fn update_body(&self, number: u64, body: &str) -> Result<(), TrackerError> {
    self
      .client
      .issues(&self.owner, &self.repo)
      .update(number)
      .body(body)
      .send()
      .await
      .map_err(|e| tracker_error("update issue body", Some(number), e))?;
    Ok(())
  }
}
