//! Markdown issue body parsing
//!
//! Initiative issues are rendered from GitHub issue forms, so every field is a
//! markdown header followed by free text. Header spellings drift between
//! template revisions (`### Root Cause`, `## root causes`, `### rootCause`),
//! so headers are normalised and resolved through an alias table.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Marker left in the lessons section by automation before a human edits it
pub const AUTO_POPULATED_MARKER: &str = "(auto-populated by analyse-initiatives workflow)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
  Pillar,
  Domain,
  InitiativeTitle,
  Purpose,
  Scope,
  CapabilityAreas,
  Deliverables,
  SuccessIndicators,
  Constraints,
  Dependencies,
  SecurityPosture,
  TestStrategy,
  OutcomeStatus,
  Postmortem,
  RootCauses,
  Mitigations,
  SuccessFactors,
  Risks,
  LessonsFromPastInitiatives,
}

// violet ignore chunk
const ALIASES: &[(&str, Section)] = &[
  ("pillar", Section::Pillar),
  ("archetype", Section::Pillar),
  ("domain", Section::Domain),
  ("initiativetitle", Section::InitiativeTitle),
  ("title", Section::InitiativeTitle),
  ("purpose", Section::Purpose),
  ("scope", Section::Scope),
  ("capabilityareas", Section::CapabilityAreas),
  ("capabilities", Section::CapabilityAreas),
  ("deliverables", Section::Deliverables),
  ("successindicators", Section::SuccessIndicators),
  ("successcriteria", Section::SuccessIndicators),
  ("constraints", Section::Constraints),
  ("dependencies", Section::Dependencies),
  ("securityposture", Section::SecurityPosture),
  ("security", Section::SecurityPosture),
  ("teststrategy", Section::TestStrategy),
  ("testing", Section::TestStrategy),
  ("outcomestatus", Section::OutcomeStatus),
  ("outcome", Section::OutcomeStatus),
  ("postmortem", Section::Postmortem),
  ("retrospective", Section::Postmortem),
  ("rootcause", Section::RootCauses),
  ("rootcauses", Section::RootCauses),
  ("rootcauseanalysis", Section::RootCauses),
  ("mitigation", Section::Mitigations),
  ("mitigations", Section::Mitigations),
  ("successfactors", Section::SuccessFactors),
  ("whatwentwell", Section::SuccessFactors),
  ("risks", Section::Risks),
  ("risk", Section::Risks),
  ("lessonsfrompastinitiatives", Section::LessonsFromPastInitiatives),
  ("historicallessons", Section::LessonsFromPastInitiatives),
  ("lessons", Section::LessonsFromPastInitiatives),
];

const PLACEHOLDERS: &[&str] = &["_no response_", "no response", "n/a", "na", "tbd", "todo", "none", "-", "...", "…"];

impl Section {
  /// Resolve a raw header text to a known section
  pub fn from_header(header: &str) -> Option<Section> {
    let key = normalise_header(header);
    ALIASES.iter().find(|(alias, _)| *alias == key).map(|(_, section)| *section)
  }
}

fn normalise_header(header: &str) -> String {
  header.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

fn header_regex() -> &'static Regex {
  static HEADER: OnceLock<Regex> = OnceLock::new();
  HEADER.get_or_init(|| Regex::new(r"^\s{0,3}#{1,6}\s+(.+?)\s*#*\s*$").expect("valid header regex"))
}

fn bullet_regex() -> &'static Regex {
  static BULLET: OnceLock<Regex> = OnceLock::new();
  BULLET.get_or_init(|| {
    Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+(?:\[[ xX]\]\s*)?(.*)$").expect("valid bullet regex")
  })
}

/// Header text of a markdown header line
pub fn header_text(line: &str) -> Option<&str> {
  header_regex().captures(line).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// True for the empty values GitHub issue forms and humans leave behind
pub fn is_placeholder(value: &str) -> bool {
  let trimmed = value.trim();
  trimmed.is_empty()
    || trimmed == AUTO_POPULATED_MARKER
    || PLACEHOLDERS.contains(&trimmed.to_lowercase().as_str())
}

/// Sections extracted from one issue body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBody {
  sections: BTreeMap<Section, String>,
}

impl ParsedBody {
  /// Parse a markdown body. Unknown headers end the previous section but are
  /// otherwise ignored; malformed input yields an empty result.
  pub fn parse(body: &str) -> Self {
    let mut sections = BTreeMap::new();
    let mut current: Option<Section> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in body.lines() {
      if let Some(header) = header_text(line) {
        flush(&mut sections, current, &buffer);
        buffer.clear();
        current = Section::from_header(header);
        continue;
      }
      if current.is_some() {
        buffer.push(line);
      }
    }
    flush(&mut sections, current, &buffer);

    Self { sections }
  }

  /// Section text, `None` when absent or a placeholder
  pub fn get(&self, section: Section) -> Option<&str> {
    self.sections.get(&section).map(String::as_str)
  }

  pub fn has(&self, section: Section) -> bool {
    self.get(section).is_some()
  }

  /// Items of a list section; without bullets every non-empty line is an item
  pub fn items(&self, section: Section) -> Vec<String> {
    self.get(section).map(split_items).unwrap_or_default()
  }

  pub fn is_empty(&self) -> bool {
    self.sections.is_empty()
  }
}

fn flush(sections: &mut BTreeMap<Section, String>, current: Option<Section>, buffer: &[&str]) {
  let Some(section) = current else {
    return;
  };
  let text = buffer.join("\n").trim().to_string();
  if is_placeholder(&text) {
    return;
  }
  // the first occurrence wins when a template repeats a header
  sections.entry(section).or_insert(text);
}

/// Split free text into list items
pub fn split_items(text: &str) -> Vec<String> {
  let has_bullets = text.lines().any(|line| bullet_regex().is_match(line));

  text
    .lines()
    .filter_map(|line| {
      if has_bullets {
        bullet_regex().captures(line).and_then(|caps| caps.get(1)).map(|m| m.as_str().trim())
      } else {
        Some(line.trim())
      }
    })
    .filter(|item| !is_placeholder(item))
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_header_variants_resolve_to_same_section() {
    for header in ["Root Cause", "root causes", "rootCause", "Root-Cause Analysis", "ROOT CAUSES:"] {
      assert_eq!(Section::from_header(header), Some(Section::RootCauses), "{header}");
    }
    assert_eq!(Section::from_header("Archetype"), Some(Section::Pillar));
    assert_eq!(Section::from_header("Success Factors"), Some(Section::SuccessFactors));
    assert_eq!(Section::from_header("lessonsFromPastInitiatives"), Some(Section::LessonsFromPastInitiatives));
    assert_eq!(Section::from_header("Something Else"), None);
  }

  #[test]
  fn test_parse_issue_form_body() {
    let body = "### pillar\n\nEngineering\n\n### domain\n\nplatform\n\n### purpose\n\nMove builds to the new runner.\nKeep caches warm.\n\n### Unknown\n\nignored text\n\n### Mitigation\n\n- pin versions\n- stage rollout\n";
    let parsed = ParsedBody::parse(body);

    assert_eq!(parsed.get(Section::Pillar), Some("Engineering"));
    assert_eq!(parsed.get(Section::Domain), Some("platform"));
    assert_eq!(parsed.get(Section::Purpose), Some("Move builds to the new runner.\nKeep caches warm."));
    assert_eq!(parsed.items(Section::Mitigations), vec!["pin versions", "stage rollout"]);
  }

  #[test]
  fn test_placeholders_count_as_absent() {
    let body = "### Purpose\n\n_No response_\n\n### Scope\n\nTBD\n\n### lessonsFromPastInitiatives\n\n(auto-populated by analyse-initiatives workflow)\n";
    let parsed = ParsedBody::parse(body);

    assert!(!parsed.has(Section::Purpose));
    assert!(!parsed.has(Section::Scope));
    assert!(!parsed.has(Section::LessonsFromPastInitiatives));
    assert!(parsed.is_empty());
  }

  #[test]
  fn test_items_strip_bullets_numbers_and_task_boxes() {
    let text = "1. first\n2) second\n- [ ] third\n* [x] fourth\n+ fifth\n  continuation is dropped";
    assert_eq!(split_items(text), vec!["first", "second", "third", "fourth", "fifth"]);
  }

  #[test]
  fn test_items_without_bullets_split_lines() {
    assert_eq!(split_items("scoring\n\nanalysis\nreporting"), vec!["scoring", "analysis", "reporting"]);
  }

  #[test]
  fn test_text_before_first_header_is_ignored() {
    let parsed = ParsedBody::parse("preamble\n## Risks\n- vendor lock-in");
    assert_eq!(parsed.items(Section::Risks), vec!["vendor lock-in"]);
  }

  #[test]
  fn test_garbage_input_does_not_panic() {
    let garbage = String::from_utf8_lossy(&[0xff, 0x00, b'#', b'#', 0xfe, b'\n', b'#']).to_string();
    let parsed = ParsedBody::parse(&garbage);
    assert!(parsed.is_empty());
    assert!(ParsedBody::parse("").is_empty());
  }
}
