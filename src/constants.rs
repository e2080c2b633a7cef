//! Application-wide constants and compiled-in defaults.
//!
//! These are the compiled-in defaults. Users can override the configurable
//! ones via `config.toml`. `SupervisorConfig::default()` references these so
//! there is exactly one source of truth.

// === Application Metadata ===

/// Application name (from Cargo.toml).
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
/// Current application version (from Cargo.toml).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// === Path Defaults ===

/// Default directory scanned for client profiles.
pub const DEFAULT_PROFILE_DIR: &str = "/etc/openvpn/config";
/// Filename extension that marks a file as a profile.
pub const DEFAULT_PROFILE_EXTENSION: &str = "ovpn";
/// Default client binary.
pub const DEFAULT_CLIENT_BINARY: &str = "/usr/sbin/openvpn";
/// Default credential file passed to the client via `--auth-user-pass`.
pub const DEFAULT_AUTH_FILE: &str = "/etc/openvpn/config/secret";
/// Default hook script run by the client when the tunnel comes up.
pub const DEFAULT_UP_SCRIPT: &str = "/etc/openvpn/config/up.cmd";
/// Default hook script run by the client when the tunnel goes down.
pub const DEFAULT_DOWN_SCRIPT: &str = "/etc/openvpn/config/down.cmd";
/// Default log file the client writes to (`--log`).
pub const DEFAULT_CLIENT_LOG: &str = "/var/log/openvpn.log";
/// Default file the supervisor appends its own activity log to.
pub const DEFAULT_ACTIVITY_LOG: &str = "/var/log/tunrotor.log";

// === Timing Defaults ===

/// Default dwell period between automatic profile rotations (seconds).
pub const DEFAULT_CYCLE_PERIOD_SECS: u64 = 3600;
/// Default interval between log tail refreshes (seconds).
pub const DEFAULT_TAIL_POLL_SECS: u64 = 1;
/// Default maximum seconds to wait for a graceful client exit before
/// escalating to a forced kill.
pub const DEFAULT_STOP_GRACE_SECS: u64 = 10;
/// Seconds to wait for exit confirmation after a kill signal before the
/// controller declares the process gone anyway.
pub const KILL_CONFIRM_SECS: u64 = 2;
/// Step between exit checks while waiting on a signalled process.
pub const EXIT_POLL_STEP_MS: u64 = 100;

// === Client Launch Defaults ===

/// `--script-security` level passed to the client so hook scripts may run.
pub const DEFAULT_SCRIPT_SECURITY: u8 = 2;

// === Logging Defaults ===

/// Default number of lines kept per log tail.
pub const DEFAULT_TAIL_LINES: usize = 10;
/// Default maximum number of entries kept in the in-memory event log.
pub const DEFAULT_MAX_LOG_ENTRIES: usize = 1000;
/// Default minimum log level shown in the event log.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// === Status Messages ===

/// Placeholder when the process table holds no client process.
pub const MSG_NO_PROCESS: &str = "No client process found.";
