//! Logger configuration
//!
//! Holds where session logs live and how their filenames are derived.
//! Values can be set programmatically or read from `AGENTLOG_*` environment
//! variables.

use crate::error::{LogError, Result};
use std::path::PathBuf;

/// Default directory for session log files
pub const DEFAULT_LOG_DIR: &str = "logs/sessions";

/// Default number of session identifier characters encoded in filenames
pub const DEFAULT_ID_PREFIX_LEN: usize = 8;

pub const ENV_LOG_DIR: &str = "AGENTLOG_DIR";
pub const ENV_ID_PREFIX_LEN: &str = "AGENTLOG_ID_PREFIX_LEN";
pub const ENV_SYNC_WRITES: &str = "AGENTLOG_SYNC_WRITES";

/// Configuration for a session logger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Directory holding one log file per session
    pub log_dir: PathBuf,
    /// Session identifier prefix length used in filenames
    pub id_prefix_len: usize,
    /// Call fsync after every appended record
    pub sync_writes: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_DIR)
    }
}

impl LoggerConfig {
    /// Create a configuration rooted at the given directory
    pub fn new<P: Into<PathBuf>>(log_dir: P) -> Self {
        Self {
            log_dir: log_dir.into(),
            id_prefix_len: DEFAULT_ID_PREFIX_LEN,
            sync_writes: false,
        }
    }

    /// Build a configuration from `AGENTLOG_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(ENV_LOG_DIR) {
            Ok(dir) if !dir.trim().is_empty() => Self::new(dir),
            _ => Self::default(),
        };

        if let Ok(raw) = std::env::var(ENV_ID_PREFIX_LEN) {
            let len = raw.trim().parse::<usize>().map_err(|e| {
                LogError::config(format!("{ENV_ID_PREFIX_LEN}={raw:?} is not a number: {e}"))
            })?;
            config.id_prefix_len = len;
        }

        if let Ok(raw) = std::env::var(ENV_SYNC_WRITES) {
            config.sync_writes = parse_flag(&raw).ok_or_else(|| {
                LogError::config(format!("{ENV_SYNC_WRITES}={raw:?} is not a boolean"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the log directory
    pub fn with_log_dir<P: Into<PathBuf>>(mut self, log_dir: P) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Set the identifier prefix length
    pub fn with_id_prefix_len(mut self, len: usize) -> Self {
        self.id_prefix_len = len;
        self
    }

    /// Enable or disable fsync after each append
    pub fn with_sync_writes(mut self, enabled: bool) -> Self {
        self.sync_writes = enabled;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.id_prefix_len == 0 {
            return Err(LogError::config("id_prefix_len must be at least 1"));
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(LogError::config("log_dir cannot be empty"));
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(ENV_LOG_DIR);
        std::env::remove_var(ENV_ID_PREFIX_LEN);
        std::env::remove_var(ENV_SYNC_WRITES);
    }

    #[test]
    fn test_default_config() {
        let config = LoggerConfig::default();
        assert_eq!(config.log_dir, PathBuf::from(DEFAULT_LOG_DIR));
        assert_eq!(config.id_prefix_len, 8);
        assert!(!config.sync_writes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = LoggerConfig::new("/var/log/agent")
            .with_id_prefix_len(12)
            .with_sync_writes(true);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/agent"));
        assert_eq!(config.id_prefix_len, 12);
        assert!(config.sync_writes);
    }

    #[test]
    fn test_zero_prefix_is_invalid() {
        let config = LoggerConfig::default().with_id_prefix_len(0);
        assert!(matches!(config.validate(), Err(LogError::InvalidConfig(_))));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_variables() {
        clear_env();
        std::env::set_var(ENV_LOG_DIR, "/tmp/agentlog-env");
        std::env::set_var(ENV_ID_PREFIX_LEN, "6");
        std::env::set_var(ENV_SYNC_WRITES, "yes");

        let config = LoggerConfig::from_env().unwrap();
        assert_eq!(config.log_dir, PathBuf::from("/tmp/agentlog-env"));
        assert_eq!(config.id_prefix_len, 6);
        assert!(config.sync_writes);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_falls_back_to_defaults() {
        clear_env();
        assert_eq!(LoggerConfig::from_env().unwrap(), LoggerConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_values() {
        clear_env();
        std::env::set_var(ENV_ID_PREFIX_LEN, "eight");
        assert!(LoggerConfig::from_env().is_err());

        clear_env();
        std::env::set_var(ENV_SYNC_WRITES, "maybe");
        assert!(LoggerConfig::from_env().is_err());
        clear_env();
    }
}
