//! Supervisor configuration.
//!
//! All mutable state lives in one explicitly constructed [`Supervisor`];
//! everything it needs to know about the outside world lives in one immutable
//! [`SupervisorConfig`] supplied at construction. The front end builds the
//! config (from defaults or a `config.toml`) and hands it over once.
//!
//! [`Supervisor`]: crate::supervisor::Supervisor

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// User-configurable supervisor settings.
///
/// All fields have sensible defaults. Users can override any subset via
/// `config.toml` -- missing fields use defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Directory scanned for client profiles.
    pub profile_dir: PathBuf,
    /// Filename extension that marks a file as a profile (without the dot).
    pub profile_extension: String,
    /// Client binary launched for each connection.
    pub client_binary: PathBuf,
    /// Credential file passed verbatim to the client.
    pub auth_file: PathBuf,
    /// Hook script run by the client when the tunnel comes up.
    pub up_script: PathBuf,
    /// Hook script run by the client when the tunnel goes down.
    pub down_script: PathBuf,
    /// `--script-security` level passed to the client.
    pub script_security: u8,
    /// Log file the client writes to; tailed for display.
    pub client_log: PathBuf,
    /// File the supervisor appends its own activity log to; also tailed.
    pub activity_log: PathBuf,
    /// Dwell period between automatic profile rotations (seconds).
    pub cycle_period: u64,
    /// Number of lines kept per log tail.
    pub tail_lines: usize,
    /// Interval between log tail refreshes (seconds).
    pub tail_poll: u64,
    /// Maximum seconds to wait for a graceful client exit before escalating
    /// to a forced kill.
    pub stop_grace: u64,
    /// Maximum number of entries kept in the in-memory event log.
    pub max_log_entries: usize,
    /// Minimum log level kept (`"debug"`, `"info"`, `"warning"`, `"error"`).
    pub log_level: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        use crate::constants;

        Self {
            profile_dir: PathBuf::from(constants::DEFAULT_PROFILE_DIR),
            profile_extension: constants::DEFAULT_PROFILE_EXTENSION.to_string(),
            client_binary: PathBuf::from(constants::DEFAULT_CLIENT_BINARY),
            auth_file: PathBuf::from(constants::DEFAULT_AUTH_FILE),
            up_script: PathBuf::from(constants::DEFAULT_UP_SCRIPT),
            down_script: PathBuf::from(constants::DEFAULT_DOWN_SCRIPT),
            script_security: constants::DEFAULT_SCRIPT_SECURITY,
            client_log: PathBuf::from(constants::DEFAULT_CLIENT_LOG),
            activity_log: PathBuf::from(constants::DEFAULT_ACTIVITY_LOG),
            cycle_period: constants::DEFAULT_CYCLE_PERIOD_SECS,
            tail_lines: constants::DEFAULT_TAIL_LINES,
            tail_poll: constants::DEFAULT_TAIL_POLL_SECS,
            stop_grace: constants::DEFAULT_STOP_GRACE_SECS,
            max_log_entries: constants::DEFAULT_MAX_LOG_ENTRIES,
            log_level: constants::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Loads a [`SupervisorConfig`] from a TOML file.
///
/// Returns defaults if the file doesn't exist. Returns an error if the file
/// exists but is malformed -- a half-understood config steering a process
/// supervisor is worse than no config.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<SupervisorConfig, String> {
    if !path.exists() {
        return Ok(SupervisorConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;

    toml::from_str(&content).map_err(|e| format!("Invalid config at {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants;

    #[test]
    fn test_defaults_reference_constants() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.profile_dir, Path::new(constants::DEFAULT_PROFILE_DIR));
        assert_eq!(cfg.profile_extension, constants::DEFAULT_PROFILE_EXTENSION);
        assert_eq!(cfg.cycle_period, constants::DEFAULT_CYCLE_PERIOD_SECS);
        assert_eq!(cfg.tail_lines, constants::DEFAULT_TAIL_LINES);
        assert_eq!(cfg.script_security, constants::DEFAULT_SCRIPT_SECURITY);
        assert_eq!(cfg.log_level, constants::DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_load_config_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("tunrotor-no-such-config.toml");
        let _ = std::fs::remove_file(&path);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.cycle_period, constants::DEFAULT_CYCLE_PERIOD_SECS);
    }

    #[test]
    fn test_load_config_partial_override() {
        let path = std::env::temp_dir().join(format!(
            "tunrotor-partial-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "cycle_period = 120\ntail_lines = 25\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.cycle_period, 120);
        assert_eq!(cfg.tail_lines, 25);
        // Untouched fields keep their defaults
        assert_eq!(cfg.profile_extension, constants::DEFAULT_PROFILE_EXTENSION);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_config_rejects_unknown_fields() {
        let path = std::env::temp_dir().join(format!(
            "tunrotor-unknown-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "cycle_perod = 120\n").unwrap();

        let result = load_config(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid config"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_config_rejects_malformed_toml() {
        let path = std::env::temp_dir().join(format!(
            "tunrotor-malformed-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "cycle_period = = 120\n").unwrap();

        assert!(load_config(&path).is_err());

        let _ = std::fs::remove_file(&path);
    }
}
