//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
pub(crate) const ENV_PREFIX: &str = "KITE_RUNNER";

/// Overrides read from `KITE_RUNNER_*` variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Worker pool size from KITE_RUNNER_THREADS
    pub threads: Option<usize>,
    /// Run timeout from KITE_RUNNER_TIMEOUT
    pub timeout: Option<u64>,
    /// Round guard from KITE_RUNNER_MAX_ROUNDS
    pub max_rounds: Option<u32>,
    /// Request id from KITE_RUNNER_REQUEST_ID
    pub request_id: Option<String>,
    /// Report directory from KITE_RUNNER_REPORT_DIR
    pub report_dir: Option<String>,
    /// Log directory from KITE_RUNNER_LOG_DIR
    pub log_dir: Option<String>,
    /// Config file from KITE_RUNNER_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary lookup, keyed by the full variable name
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}_{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            threads: get("THREADS").and_then(|v| v.parse().ok()),
            timeout: get("TIMEOUT").and_then(|v| v.parse().ok()),
            max_rounds: get("MAX_ROUNDS").and_then(|v| v.parse().ok()),
            request_id: get("REQUEST_ID"),
            report_dir: get("REPORT_DIR"),
            log_dir: get("LOG_DIR"),
            config_file: get("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.threads.is_some()
            || self.timeout.is_some()
            || self.max_rounds.is_some()
            || self.request_id.is_some()
            || self.report_dir.is_some()
            || self.log_dir.is_some()
            || self.config_file.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_config_empty() {
        let config = EnvConfig::from_lookup(lookup(&[]));
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_config_parses_values() {
        let config = EnvConfig::from_lookup(lookup(&[
            ("KITE_RUNNER_THREADS", "6"),
            ("KITE_RUNNER_MAX_ROUNDS", " 3 "),
            ("KITE_RUNNER_TIMEOUT", "not-a-number"),
            ("KITE_RUNNER_REQUEST_ID", "abc"),
            ("KITE_RUNNER_LOG_DIR", ""),
        ]));

        assert!(config.has_any());
        assert_eq!(config.threads, Some(6));
        assert_eq!(config.max_rounds, Some(3));
        assert_eq!(config.timeout, None);
        assert_eq!(config.request_id.as_deref(), Some("abc"));
        assert_eq!(config.log_dir, None);
    }
}
