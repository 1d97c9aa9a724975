//! Logging configuration from environment variables

use std::path::PathBuf;

/// Prefix of the daily rolling log file (`dashboard.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "dashboard.log";

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_FILTER: &str = "dashboard=info,warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugConfig {
    /// `EnvFilter` directive used when `RUST_LOG` does not parse
    pub log_level: String,
    pub log_dir: PathBuf,
    /// Mirror log lines to stdout
    pub log_to_stdout: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_FILTER.to_string(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_to_stdout: false,
        }
    }
}

impl DebugConfig {
    /// Reads `RUST_LOG`, `DASHBOARD_LOG_DIR` and `DASHBOARD_LOG_STDOUT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("RUST_LOG")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.log_level),
            log_dir: lookup("DASHBOARD_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            log_to_stdout: lookup("DASHBOARD_LOG_STDOUT")
                .is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes")),
        }
    }

    /// Base path of the rolling log; the appender adds a date suffix.
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_PREFIX)
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.log_level.contains("debug") || self.log_level.contains("trace")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = DebugConfig::from_lookup(lookup(&[]));
        assert_eq!(config, DebugConfig::default());
        assert_eq!(config.log_file(), PathBuf::from("logs/dashboard.log"));
        assert!(!config.is_debug_enabled());
    }

    #[test]
    fn test_overrides() {
        let config = DebugConfig::from_lookup(lookup(&[
            ("RUST_LOG", "dashboard=debug"),
            ("DASHBOARD_LOG_DIR", "/tmp/dash"),
            ("DASHBOARD_LOG_STDOUT", "true"),
        ]));
        assert!(config.is_debug_enabled());
        assert!(config.log_to_stdout);
        assert_eq!(config.log_file(), PathBuf::from("/tmp/dash/dashboard.log"));
    }
}
