//! Logging for the `hindsight` binary
//!
//! Diagnostics go through `tracing` to stderr, filtered by `HINDSIGHT_LOG`.
//! Progress lines for people watching a CI log use the bracketed prefixes
//! below. stdout is reserved for command results.

use colored::*;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "HINDSIGHT_LOG";

fn default_directive(verbose: bool) -> &'static str {
  if verbose {
    "hindsight=debug,octocrab=info,warn"
  } else {
    "hindsight=info,warn"
  }
}

/// Install the tracing subscriber; later calls are ignored
pub fn init(verbose: bool) {
  let filter =
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

  let _ = tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr).with_target(verbose))
    .with(filter)
    .try_init();
}

fn format_prefix(color: Color, prefix: &str) -> String {
  format!("[{}]{:<width$}", prefix.color(color).bold(), "", width = 7usize.saturating_sub(prefix.len() + 2))
}

fn log(color: Color, prefix: &str, message: &str) {
  let prefix = format_prefix(color, prefix);
  for line in message.lines() {
    eprintln!("{prefix} {line}");
  }
}

pub fn info(message: &str) {
  log(Color::Blue, "info", message);
}

pub fn warn(message: &str) {
  log(Color::Yellow, "warn", message);
}

pub fn fail(message: &str) {
  log(Color::BrightRed, "fail", message);
}

pub fn success(message: &str) {
  log(Color::Green, "sccs", message);
}

/// Headline for the start of a command
pub fn announce(message: &str) {
  let banner = "=".repeat(50);
  eprintln!("{}", banner.bright_blue());
  log(Color::BrightBlue, "info", message);
  eprintln!("{}", banner.bright_blue());
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_prefix_padding() {
    colored::control::set_override(false);
    assert_eq!(format_prefix(Color::Blue, "info"), "[info] ");
    assert_eq!(format_prefix(Color::Green, "sccs"), "[sccs] ");
    assert_eq!(format_prefix(Color::Red, "error"), "[error]");
  }

  #[test]
  fn test_default_directive() {
    assert!(default_directive(true).contains("hindsight=debug"));
    assert!(default_directive(false).contains("hindsight=info"));
  }

  #[test]
  fn test_init_twice_is_harmless() {
    init(false);
    init(true);
  }
}
