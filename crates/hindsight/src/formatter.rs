//! Recommendation comments built from ranked matches
//!
//! Everything here is a pure function of the match list so identical input
//! renders byte-identical output. The "generated at" stamp is kept separate in
//! [`generated_at_footer`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::body::{header_text, Section};
use crate::model::{Confidence, HistoricalRecord, RecordStatus, SimilarityMatch};

const LESSONS_PER_CATEGORY: usize = 3;
const MAX_SUMMARY: usize = 3;
const MAX_ACTION_ITEMS: usize = 5;
const SIMILAR_LISTED: usize = 5;

pub const FALSE_POSITIVE_CAVEAT: &str = "Matches are based on text similarity and may include false positives. \
If a suggestion looks irrelevant, say so in a comment so the lessons history can be improved.";

const DEFAULT_ACTION_ITEMS: &[&str] = &[
  "Document key decisions and rationale for the lessons history",
  "Plan regular checkpoints to capture learnings",
  "Run a postmortem on completion and record root causes and mitigations",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
  pub id: u64,
  pub title: String,
  pub pillar: Option<String>,
  pub domain: Option<String>,
  pub status: RecordStatus,
  pub score: f64,
  pub confidence: Confidence,
}

/// Consolidated lessons from a set of matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
  pub similar: Vec<MatchSummary>,
  pub risks: Vec<String>,
  pub mitigations: Vec<String>,
  pub success_factors: Vec<String>,
  pub summary: Vec<String>,
  pub action_items: Vec<String>,
  /// Mean match score, 0.0 without matches
  pub average_score: f64,
  /// Confidence of the top-ranked match
  pub confidence: Option<Confidence>,
}

impl Recommendation {
  pub fn from_matches(matches: &[SimilarityMatch<'_>]) -> Self {
    let similar: Vec<MatchSummary> = matches
      .iter()
      .map(|m| MatchSummary {
        id: m.record.id,
        title: m.record.title.clone(),
        pillar: m.record.pillar.clone(),
        domain: m.record.domain.clone(),
        status: m.record.status,
        score: m.score,
        confidence: m.confidence,
      })
      .collect();

    let risks = consolidate(matches, |r| r.root_causes.iter().chain(r.risks.iter()).collect());
    let mitigations = consolidate(matches, |r| r.mitigations.iter().collect());
    let success_factors = consolidate(matches, |r| r.success_factors.iter().collect());

    let average_score = if matches.is_empty() {
      0.0
    } else {
      matches.iter().map(|m| m.score).sum::<f64>() / matches.len() as f64
    };

    let mut recommendation = Self {
      similar,
      risks,
      mitigations,
      success_factors,
      summary: Vec::new(),
      action_items: Vec::new(),
      average_score,
      confidence: matches.first().map(|m| m.confidence),
    };
    recommendation.summary = recommendation.summary_recommendations();
    recommendation.action_items = recommendation.derive_action_items();
    recommendation
  }

  pub fn has_matches(&self) -> bool {
    !self.similar.is_empty()
  }

  fn has_lessons(&self) -> bool {
    !(self.risks.is_empty() && self.mitigations.is_empty() && self.success_factors.is_empty())
  }

  fn summary_recommendations(&self) -> Vec<String> {
    let mut summary = Vec::new();

    if let Some((pillar, count)) = most_common_pillar(&self.similar) {
      if count > 1 {
        summary.push(format!(
          "Pattern: {pillar} initiatives often face similar challenges - review {pillar}-specific practices"
        ));
      }
    }
    if !self.risks.is_empty() {
      summary.push(format!("Address the {} identified risks early in planning", self.risks.len()));
    }
    if !self.mitigations.is_empty() {
      summary.push(format!(
        "Apply proven mitigations from {} similar initiatives",
        self.similar.len()
      ));
    }

    summary.truncate(MAX_SUMMARY);
    summary
  }

  fn derive_action_items(&self) -> Vec<String> {
    let mut items = Vec::new();
    if !self.risks.is_empty() {
      items.push("Create a risk register covering the identified risks".to_string());
      items.push("Schedule a risk review checkpoint with stakeholders".to_string());
    }
    if !self.mitigations.is_empty() {
      items.push("Adopt the proven mitigation strategies listed above".to_string());
      items.push("Document the mitigation plan for future reference".to_string());
    }
    if !self.success_factors.is_empty() {
      items.push("Align the initiative plan with the observed success patterns".to_string());
    }
    if items.is_empty() {
      items = DEFAULT_ACTION_ITEMS.iter().map(|item| item.to_string()).collect();
    }
    items.truncate(MAX_ACTION_ITEMS);
    items
  }

  /// Markdown comment body
  pub fn to_markdown(&self) -> String {
    let mut out = String::new();
    out.push_str("## 🎓 Lessons from Past Initiatives\n\n");
    out.push_str("_Auto-generated from similar closed initiatives in the lessons history._\n\n");

    if !self.has_matches() {
      out.push_str("🆕 **First of its kind:** no similar initiatives were found in the lessons history.\n\n");
      push_checklist(&mut out, "### 📋 Suggested Action Items", &self.action_items);
      push_footer(&mut out, self.confidence);
      return out;
    }

    let confidence = self.confidence.unwrap_or(Confidence::Low);
    out.push_str(&format!(
      "**Analysis confidence:** {} ({:.0}% mean similarity across {} similar initiatives)\n\n",
      confidence,
      self.average_score * 100.0,
      self.similar.len()
    ));

    out.push_str("### 🔍 Similar Initiatives\n\n");
    for (position, similar) in self.similar.iter().take(SIMILAR_LISTED).enumerate() {
      out.push_str(&format!(
        "{}. **#{} {}** ({} → {}, {}) - {:.0}% similarity, {} confidence\n",
        position + 1,
        similar.id,
        similar.title,
        similar.pillar.as_deref().unwrap_or("unclassified"),
        similar.domain.as_deref().unwrap_or("unknown"),
        similar.status,
        similar.score * 100.0,
        similar.confidence
      ));
    }
    out.push('\n');

    if !self.risks.is_empty() {
      out.push_str("### ⚠️ Risks Observed\n\n");
      for (position, risk) in self.risks.iter().enumerate() {
        out.push_str(&format!("{}. **{}**\n", position + 1, risk));
      }
      out.push('\n');
    }
    if !self.mitigations.is_empty() {
      push_checklist(&mut out, "### 🛡️ Mitigations That Worked", &self.mitigations);
    }
    if !self.success_factors.is_empty() {
      out.push_str("### ✅ Success Factors\n\n");
      for factor in &self.success_factors {
        out.push_str(&format!("- {factor}\n"));
      }
      out.push('\n');
    }
    if !self.summary.is_empty() {
      out.push_str("### 💡 Recommendations\n\n");
      for line in &self.summary {
        out.push_str(&format!("- {line}\n"));
      }
      out.push('\n');
    }
    push_checklist(&mut out, "### 📋 Suggested Action Items", &self.action_items);
    push_footer(&mut out, self.confidence);
    out
  }

  /// Short paragraph for the issue's lessons section
  pub fn body_summary(&self) -> String {
    if !self.has_matches() {
      return "No relevant precedent found in the lessons history.".to_string();
    }

    let references: Vec<String> = self.similar.iter().map(|s| format!("#{}", s.id)).collect();
    let mut summary = format!(
      "Similar initiatives: {} ({} confidence).",
      references.join(", "),
      self.confidence.unwrap_or(Confidence::Low)
    );
    if !self.risks.is_empty() {
      summary.push_str(&format!(" Key risks: {}.", self.risks.join("; ")));
    }
    if !self.mitigations.is_empty() {
      summary.push_str(&format!(" Mitigations: {}.", self.mitigations.join("; ")));
    }
    if !self.has_lessons() {
      summary.push_str(" No recorded lessons yet.");
    }
    summary
  }
}

fn push_checklist(out: &mut String, heading: &str, items: &[String]) {
  out.push_str(heading);
  out.push_str("\n\n");
  for item in items {
    out.push_str(&format!("- [ ] {item}\n"));
  }
  out.push('\n');
}

fn push_footer(out: &mut String, confidence: Option<Confidence>) {
  out.push_str("---\n\n");
  let confidence = match confidence {
    Some(confidence) => confidence.to_string(),
    None => "none (no similar initiatives)".to_string(),
  };
  out.push_str(&format!("**Confidence:** {confidence}. _{FALSE_POSITIVE_CAVEAT}_\n"));
}

/// Group key: the first four words, lower-cased
fn lesson_key(lesson: &str) -> String {
  lesson.split_whitespace().take(4).collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Top lessons of one category, weighted by the score of the match they came from
fn consolidate<'r, F>(matches: &[SimilarityMatch<'r>], pick: F) -> Vec<String>
where
  F: Fn(&'r HistoricalRecord) -> Vec<&'r String>,
{
  let mut groups: Vec<(String, f64, String)> = Vec::new();
  let mut positions: HashMap<String, usize> = HashMap::new();

  for m in matches {
    for lesson in pick(m.record) {
      let lesson = lesson.trim();
      if lesson.is_empty() {
        continue;
      }
      let key = lesson_key(lesson);
      match positions.get(&key) {
        Some(&position) => {
          if m.score > groups[position].1 {
            groups[position].1 = m.score;
            groups[position].2 = lesson.to_string();
          }
        }
        None => {
          positions.insert(key.clone(), groups.len());
          groups.push((key, m.score, lesson.to_string()));
        }
      }
    }
  }

  // stable: equal weights keep first appearance
  groups.sort_by(|a, b| b.1.total_cmp(&a.1));
  groups.into_iter().take(LESSONS_PER_CATEGORY).map(|(_, _, lesson)| lesson).collect()
}

fn most_common_pillar(similar: &[MatchSummary]) -> Option<(String, usize)> {
  let mut counts: Vec<(String, usize)> = Vec::new();
  for pillar in similar.iter().filter_map(|s| s.pillar.as_deref()) {
    match counts.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(pillar)) {
      Some(entry) => entry.1 += 1,
      None => counts.push((pillar.to_string(), 1)),
    }
  }
  // max_by_key returns the last maximum; reverse to keep the first
  counts.into_iter().rev().max_by_key(|(_, count)| *count)
}

/// Pure rendering of a ranked match list
pub fn format_recommendations(matches: &[SimilarityMatch<'_>]) -> String {
  Recommendation::from_matches(matches).to_markdown()
}

/// Timestamp line appended outside the deterministic comment body
pub fn generated_at_footer(at: DateTime<Utc>) -> String {
  format!("\n_Generated at {} UTC._\n", at.format("%Y-%m-%d %H:%M"))
}

/// Replace the lessons section of an issue body with `summary`.
/// Returns `None` when the body has no lessons section.
pub fn splice_lessons_section(body: &str, summary: &str) -> Option<String> {
  let lines: Vec<&str> = body.lines().collect();
  let start = lines.iter().position(|line| {
    header_text(line).and_then(Section::from_header) == Some(Section::LessonsFromPastInitiatives)
  })?;
  let end = lines[start + 1..]
    .iter()
    .position(|line| header_text(line).is_some())
    .map(|offset| start + 1 + offset)
    .unwrap_or(lines.len());

  let mut out: Vec<String> = lines[..=start].iter().map(|line| line.to_string()).collect();
  out.push(String::new());
  out.push(summary.trim().to_string());
  out.push(String::new());
  out.extend(lines[end..].iter().map(|line| line.to_string()));

  let mut spliced = out.join("\n");
  if body.ends_with('\n') && !spliced.ends_with('\n') {
    spliced.push('\n');
  }
  Some(spliced)
}
