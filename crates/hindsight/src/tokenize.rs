use std::collections::HashSet;
use std::sync::OnceLock;

// violet ignore chunk
/// Common English and issue-template filler words
const STOP_WORDS: &[&str] = &[
  "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
  "our", "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old", "see",
  "two", "way", "who", "boy", "did", "its", "let", "put", "say", "she", "too", "use", "this",
  "that", "with", "have", "will", "from", "they", "been", "said", "each", "which", "their",
  "time", "would", "there", "could", "other", "into", "than", "then", "them", "what", "when",
  "where", "should", "response",
];

/// Tokens shorter than this carry no signal
const MIN_TOKEN_LEN: usize = 3;

fn stop_words() -> &'static HashSet<&'static str> {
  static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
  WORDS.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Split text into lower-cased terms, keeping duplicates and order
pub fn tokenize(text: &str) -> Vec<String> {
  text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|word| word.chars().count() >= MIN_TOKEN_LEN)
    .filter(|word| !word.chars().all(|c| c.is_numeric()))
    .map(str::to_lowercase)
    .filter(|word| !stop_words().contains(word.as_str()))
    .collect()
}

/// Title plus body narrative with markdown header lines removed, so template
/// field labels do not make every initiative look alike
pub fn document_text(title: &str, body: &str) -> String {
  let narrative: Vec<&str> =
    body.lines().filter(|line| !line.trim_start().starts_with('#')).collect();
  format!("{}\n{}", title, narrative.join("\n"))
}
