//! Configuration module
//!
//! Loads the runner configuration (including the tuple matrix) from YAML or
//! JSON, with environment variable overrides.

mod env;

pub use env::EnvConfig;
use env::ENV_PREFIX;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};
use crate::models::{Client, Tuple};

/// Exit code a test command uses to ask for another round (EX_TEMPFAIL)
pub const DEFAULT_RETRY_EXIT_CODE: i32 = 75;

fn default_retry_exit_code() -> i32 {
    DEFAULT_RETRY_EXIT_CODE
}

/// External command run once per attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    #[serde(default = "default_retry_exit_code")]
    pub retry_exit_code: i32,
}

/// Runner configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Test name, used for the log directory and report name
    pub name: String,

    /// Request identifier prefixed to the log directory
    pub request_id: Option<String>,

    /// Parent suite recorded in the report
    pub parent_suite: Option<String>,

    /// Worker pool size
    pub threads: usize,

    /// Stop after this many rounds even if units still ask for retry
    pub max_rounds: Option<u32>,

    /// Interrupt the run after this many seconds
    pub timeout_secs: Option<u64>,

    /// Profile handed to firefox clients that request one
    pub firefox_profile: Option<String>,

    /// Extension handed to chrome clients that request one
    pub chrome_extension: Option<String>,

    pub report_dir: PathBuf,

    pub log_dir: PathBuf,

    pub command: Option<CommandConfig>,

    /// Client tuples, one test execution each
    pub tuples: Vec<Tuple>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            name: "kite".to_string(),
            request_id: None,
            parent_suite: None,
            threads: 4,
            max_rounds: None,
            timeout_secs: None,
            firefox_profile: None,
            chrome_extension: None,
            report_dir: PathBuf::from("reports"),
            log_dir: PathBuf::from("logs"),
            command: None,
            tuples: Vec::new(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a YAML or JSON file
    pub fn load(path: impl AsRef<Path>) -> RunnerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RunnerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = if is_yaml_file(path) {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };
        let mut config: Self = parsed.map_err(|message| RunnerError::ConfigParse {
            path: path.to_path_buf(),
            message,
        })?;

        config.report_dir = expand_path(&config.report_dir);
        config.log_dir = expand_path(&config.log_dir);
        Ok(config)
    }

    /// Save configuration to a YAML or JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> RunnerResult<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).map_err(|e| e.to_string())
        } else {
            serde_json::to_string_pretty(self).map_err(|e| e.to_string())
        }
        .map_err(|message| RunnerError::ConfigParse {
            path: path.to_path_buf(),
            message,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment overrides (env takes precedence over the file)
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if !env.has_any() {
            return;
        }
        debug!("Applying {ENV_PREFIX}_* environment overrides");

        if let Some(threads) = env.threads {
            self.threads = threads;
        }
        if let Some(timeout) = env.timeout {
            self.timeout_secs = Some(timeout);
        }
        if let Some(max_rounds) = env.max_rounds {
            self.max_rounds = Some(max_rounds);
        }
        if let Some(request_id) = &env.request_id {
            self.request_id = Some(request_id.clone());
        }
        if let Some(dir) = &env.report_dir {
            self.report_dir = expand_path(dir);
        }
        if let Some(dir) = &env.log_dir {
            self.log_dir = expand_path(dir);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> RunnerResult<()> {
        if self.name.trim().is_empty() {
            return Err(RunnerError::InvalidConfig("name must not be empty".into()));
        }
        if self.threads == 0 {
            return Err(RunnerError::InvalidConfig(
                "threads must be at least 1".into(),
            ));
        }
        if self.max_rounds == Some(0) {
            return Err(RunnerError::InvalidConfig(
                "max_rounds must be at least 1".into(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(RunnerError::InvalidConfig(
                "timeout_secs must be at least 1".into(),
            ));
        }
        if let Some(first) = self.tuples.first() {
            if first.is_empty() {
                return Err(RunnerError::InvalidConfig("tuple 1 has no clients".into()));
            }
            if let Some(pos) = self.tuples.iter().position(|t| t.len() != first.len()) {
                return Err(RunnerError::InvalidConfig(format!(
                    "tuple {} has {} client(s), expected {}",
                    pos + 1,
                    self.tuples[pos].len(),
                    first.len()
                )));
            }
        }
        if let Some(command) = &self.command {
            if command.program.trim().is_empty() {
                return Err(RunnerError::InvalidConfig(
                    "command.program must not be empty".into(),
                ));
            }
            if command.retry_exit_code == 0 {
                return Err(RunnerError::InvalidConfig(
                    "command.retry_exit_code must not be 0".into(),
                ));
            }
        }
        Ok(())
    }

    /// Example configuration written by `kite-runner init`
    pub fn example() -> Self {
        Self {
            name: "JoinRoomTest".to_string(),
            request_id: None,
            parent_suite: Some("nightly".to_string()),
            threads: 2,
            max_rounds: Some(5),
            timeout_secs: Some(600),
            firefox_profile: Some("/opt/kite/profiles/firefox".to_string()),
            chrome_extension: None,
            command: Some(CommandConfig {
                program: "./run-test.sh".to_string(),
                args: vec!["--room".to_string(), "kite".to_string()],
                working_dir: None,
                retry_exit_code: DEFAULT_RETRY_EXIT_CODE,
            }),
            tuples: vec![
                Tuple::new(vec![
                    Client::new("chrome").with_version("120").with_platform("linux"),
                    Client::new("firefox").with_version("121").with_platform("linux"),
                ]),
                Tuple::new(vec![
                    Client::new("chrome").with_version("120").with_platform("linux"),
                    Client::new("chrome").with_version("120").with_platform("windows"),
                ]),
            ],
            ..Self::default()
        }
    }
}

/// Expand ~ to home directory
fn expand_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunnerConfig::default();
        assert_eq!(config.threads, 4);
        assert!(config.max_rounds.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_save_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kite.yaml");

        let config = RunnerConfig::example();
        config.save(&path).unwrap();

        let loaded = RunnerConfig::load(&path).unwrap();
        assert_eq!(loaded.name, config.name);
        assert_eq!(loaded.tuples, config.tuples);
        assert_eq!(loaded.command, config.command);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_load_json_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kite.json");
        std::fs::write(
            &path,
            r#"{
                "name": "smoke",
                "threads": 3,
                "command": {"program": "true"},
                "tuples": [[{"browser_name": "chrome"}], [{"browser_name": "safari"}]]
            }"#,
        )
        .unwrap();

        let config = RunnerConfig::load(&path).unwrap();
        assert_eq!(config.threads, 3);
        assert_eq!(config.tuples.len(), 2);
        assert_eq!(
            config.command.unwrap().retry_exit_code,
            DEFAULT_RETRY_EXIT_CODE
        );
        assert_eq!(config.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = RunnerConfig::load(dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(RunnerError::ConfigRead { .. })));

        let bad = dir.path().join("bad.yml");
        std::fs::write(&bad, "threads: [not a number").unwrap();
        assert!(matches!(
            RunnerConfig::load(&bad),
            Err(RunnerError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RunnerConfig::example();
        config.threads = 0;
        assert!(config.validate().is_err());

        let mut config = RunnerConfig::example();
        config.max_rounds = Some(0);
        assert!(config.validate().is_err());

        let mut config = RunnerConfig::example();
        config
            .tuples
            .push(Tuple::new(vec![Client::new("chrome")]));
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("tuple 3"));
    }

    #[test]
    fn test_apply_env() {
        let mut config = RunnerConfig::default();
        let env = EnvConfig {
            threads: Some(9),
            max_rounds: Some(2),
            request_id: Some("req-1".to_string()),
            ..EnvConfig::default()
        };
        config.apply_env(&env);

        assert_eq!(config.threads, 9);
        assert_eq!(config.max_rounds, Some(2));
        assert_eq!(config.request_id.as_deref(), Some("req-1"));
        assert!(config.timeout_secs.is_none());
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("reports"), PathBuf::from("reports"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/kite/logs"), home.join("kite/logs"));
        }
    }
}
