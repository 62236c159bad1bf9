//! Logging and color bootstrap.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber from the environment.
///
/// `F2F_LOG_LEVEL` picks the level (DEBUG, INFO, WARN, ERROR; default INFO).
/// ANSI color is disabled when `F2F_NO_COLOR=TRUE` or stderr is not a
/// terminal; the same rule drives the colored stdout summaries.
pub fn init() {
    let level = match std::env::var("F2F_LOG_LEVEL")
        .unwrap_or_default()
        .to_uppercase()
        .as_str()
    {
        "DEBUG" => "debug",
        "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    };

    let no_color = std::env::var("F2F_NO_COLOR")
        .map(|value| value.to_uppercase() == "TRUE")
        .unwrap_or(false)
        || !std::io::stderr().is_terminal();
    if no_color {
        colored::control::set_override(false);
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .init();
}
