//! Process-wide tracing setup

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Level from `--log-level`; unknown or missing values fall back to
/// debug under `--verbose`, info otherwise
pub fn resolve_level(level: Option<&str>, verbose: bool) -> Level {
    let parsed = level
        .map(|s| if s.eq_ignore_ascii_case("warning") { "warn" } else { s })
        .and_then(|s| Level::from_str(s).ok());

    match parsed {
        Some(level) => level,
        None if verbose => Level::DEBUG,
        None => Level::INFO,
    }
}

fn directive(level: Level) -> String {
    format!("{}={}", env!("CARGO_CRATE_NAME"), level)
}

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
pub fn init_logger(level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_level() {
        assert_eq!(resolve_level(None, false), Level::INFO);
        assert_eq!(resolve_level(None, true), Level::DEBUG);
        assert_eq!(resolve_level(Some("error"), true), Level::ERROR);
        assert_eq!(resolve_level(Some("WARNING"), false), Level::WARN);
        assert_eq!(resolve_level(Some("loud"), false), Level::INFO);
    }

    #[test]
    fn test_directive_targets_this_crate() {
        assert_eq!(directive(Level::WARN), "kite_runner=WARN");
    }
}
