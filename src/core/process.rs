//! Client process lifecycle.
//!
//! [`ProcessController`] owns the single external client process: it builds
//! the launch command, spawns the process, polls it for unexpected exits,
//! and terminates it gracefully or forcefully. There is at most one live
//! process at any instant, and nothing else holds the handle.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use thiserror::Error;

use crate::catalog::Profile;
use crate::config::SupervisorConfig;
use crate::constants;
use crate::logger::{self, LogLevel};

/// Step between exit checks while waiting on a signalled process.
const EXIT_POLL_STEP: Duration = Duration::from_millis(constants::EXIT_POLL_STEP_MS);

/// A client process could not be launched.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A process is already running; stop or kill it first.
    #[error("a client process is already running")]
    AlreadyRunning,
    /// The spawn itself failed (missing binary, bad permissions).
    #[error("failed to spawn {}: {}", .binary.display(), .source)]
    Spawn {
        /// The binary that could not be spawned.
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A termination signal could not be delivered.
///
/// Logged by the caller; the controller still marks the process absent so a
/// stuck handle can never block future starts.
#[derive(Debug, Error)]
#[error("failed to deliver {signal:?} to client process {pid}: {source}")]
pub struct TerminationError {
    /// The signal that failed to deliver.
    pub signal: Signal,
    /// The target process id.
    pub pid: i32,
    source: Errno,
}

/// Configuration subset needed to launch and terminate the client.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Client binary.
    pub binary: PathBuf,
    /// Credential file passed via `--auth-user-pass`.
    pub auth_file: PathBuf,
    /// Log destination passed via `--log`.
    pub client_log: PathBuf,
    /// Up hook script.
    pub up_script: PathBuf,
    /// Down hook script.
    pub down_script: PathBuf,
    /// `--script-security` level.
    pub script_security: u8,
    /// Grace period for a stop before escalating to a kill.
    pub stop_grace: Duration,
}

impl From<&SupervisorConfig> for LaunchConfig {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            binary: config.client_binary.clone(),
            auth_file: config.auth_file.clone(),
            client_log: config.client_log.clone(),
            up_script: config.up_script.clone(),
            down_script: config.down_script.clone(),
            script_security: config.script_security,
            stop_grace: Duration::from_secs(config.stop_grace),
        }
    }
}

/// Builds the fixed client argument list for a profile.
///
/// Paths are separate argv entries, never a shell string, so no quoting is
/// needed regardless of what the filenames contain.
#[must_use]
pub fn build_args(cfg: &LaunchConfig, profile: &Profile) -> Vec<String> {
    vec![
        "--config".to_string(),
        profile.path.to_string_lossy().into_owned(),
        "--auth-user-pass".to_string(),
        cfg.auth_file.to_string_lossy().into_owned(),
        "--log".to_string(),
        cfg.client_log.to_string_lossy().into_owned(),
        "--up".to_string(),
        cfg.up_script.to_string_lossy().into_owned(),
        "--down".to_string(),
        cfg.down_script.to_string_lossy().into_owned(),
        "--script-security".to_string(),
        cfg.script_security.to_string(),
    ]
}

/// Owner of the single external client process.
pub struct ProcessController {
    cfg: LaunchConfig,
    child: Option<Child>,
    profile: Option<Profile>,
}

impl ProcessController {
    /// Creates a controller with no process (cold start; nothing is adopted
    /// from a prior run).
    #[must_use]
    pub fn new(cfg: LaunchConfig) -> Self {
        Self {
            cfg,
            child: None,
            profile: None,
        }
    }

    /// Launches the client with the given profile.
    ///
    /// # Errors
    ///
    /// [`LaunchError::AlreadyRunning`] if a process is live (existing state
    /// untouched), or [`LaunchError::Spawn`] if the spawn fails (state stays
    /// absent either way).
    pub fn start(&mut self, profile: &Profile) -> Result<(), LaunchError> {
        if self.poll() {
            return Err(LaunchError::AlreadyRunning);
        }

        let args = build_args(&self.cfg, profile);
        // stdout/stderr discarded: the client writes its real output to the
        // --log file, and an unread pipe could block it.
        let spawned = Command::new(&self.cfg.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                logger::log(
                    LogLevel::Info,
                    "PROCESS",
                    format!(
                        "Executing: {} {} (pid {})",
                        self.cfg.binary.display(),
                        args.join(" "),
                        child.id()
                    ),
                );
                self.child = Some(child);
                self.profile = Some(profile.clone());
                Ok(())
            }
            Err(e) => Err(LaunchError::Spawn {
                binary: self.cfg.binary.clone(),
                source: e,
            }),
        }
    }

    /// Requests a graceful exit and waits for it.
    ///
    /// Sends SIGTERM, then waits up to the configured grace period. A
    /// process that ignores the request is escalated to SIGKILL rather than
    /// blocking the supervisor forever. No-op when absent.
    ///
    /// # Errors
    ///
    /// [`TerminationError`] if the signal could not be delivered; the
    /// controller is absent afterwards regardless.
    pub fn stop(&mut self) -> Result<(), TerminationError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let profile = self.profile.take();
        let pid = child_pid(&child);
        let name = profile.map(|p| p.name).unwrap_or_default();

        if matches!(child.try_wait(), Ok(Some(_))) {
            logger::log(
                LogLevel::Info,
                "PROCESS",
                format!("Client process for '{name}' had already exited (pid {pid})"),
            );
            return Ok(());
        }

        if let Err(e) = send_signal(pid, Signal::SIGTERM) {
            if e.source == Errno::ESRCH {
                let _ = child.wait();
                return Ok(());
            }
            logger::log(LogLevel::Error, "PROCESS", e.to_string());
            // Last resort so the handle is not leaked as a zombie
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        if wait_for_exit(&mut child, self.cfg.stop_grace) {
            logger::log(
                LogLevel::Info,
                "PROCESS",
                format!("Stopped client process for '{name}' (pid {pid})"),
            );
        } else {
            logger::log(
                LogLevel::Warning,
                "PROCESS",
                format!(
                    "Client process for '{name}' (pid {pid}) ignored SIGTERM for {}s; escalating to SIGKILL",
                    self.cfg.stop_grace.as_secs()
                ),
            );
            let _ = send_signal(pid, Signal::SIGKILL);
            if !wait_for_exit(
                &mut child,
                Duration::from_secs(constants::KILL_CONFIRM_SECS),
            ) {
                logger::log(
                    LogLevel::Warning,
                    "PROCESS",
                    format!("No exit confirmation for pid {pid}; marking absent anyway"),
                );
            }
        }
        Ok(())
    }

    /// Forces immediate termination.
    ///
    /// Sends SIGKILL and waits a short confirmation window for the exit to
    /// be observed, so a kill followed by a start can never leave two
    /// processes live. If confirmation times out the controller still marks
    /// the process absent and logs the discrepancy. No-op when absent.
    ///
    /// # Errors
    ///
    /// [`TerminationError`] if the signal could not be delivered; the
    /// controller is absent afterwards regardless.
    pub fn kill(&mut self) -> Result<(), TerminationError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let profile = self.profile.take();
        let pid = child_pid(&child);
        let name = profile.map(|p| p.name).unwrap_or_default();

        if matches!(child.try_wait(), Ok(Some(_))) {
            logger::log(
                LogLevel::Info,
                "PROCESS",
                format!("Client process for '{name}' had already exited (pid {pid})"),
            );
            return Ok(());
        }

        if let Err(e) = send_signal(pid, Signal::SIGKILL) {
            if e.source == Errno::ESRCH {
                let _ = child.wait();
                return Ok(());
            }
            logger::log(LogLevel::Error, "PROCESS", e.to_string());
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        if wait_for_exit(
            &mut child,
            Duration::from_secs(constants::KILL_CONFIRM_SECS),
        ) {
            logger::log(
                LogLevel::Info,
                "PROCESS",
                format!("Killed client process for '{name}' (pid {pid})"),
            );
        } else {
            logger::log(
                LogLevel::Warning,
                "PROCESS",
                format!(
                    "Kill of pid {pid} not confirmed within {}s; marking absent anyway",
                    constants::KILL_CONFIRM_SECS
                ),
            );
        }
        Ok(())
    }

    /// Reaps an exited child and reports whether a process is still running.
    ///
    /// The supervisor calls this every tick, so a process that dies on its
    /// own is observed (and logged) within one second.
    pub fn poll(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                let name = self
                    .profile
                    .take()
                    .map(|p| p.name)
                    .unwrap_or_default();
                logger::log(
                    LogLevel::Warning,
                    "PROCESS",
                    format!("Client process for '{name}' exited on its own ({status})"),
                );
                self.child = None;
                false
            }
            Err(e) => {
                logger::log(
                    LogLevel::Error,
                    "PROCESS",
                    format!("Failed to poll client process: {e}"),
                );
                self.child = None;
                self.profile = None;
                false
            }
        }
    }

    /// Whether a process handle is currently held (without reaping).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// The profile the running process was launched with.
    #[must_use]
    pub fn active_profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Human-readable status line derived from the OS process table.
    ///
    /// Queries `ps` for command lines mentioning the client binary instead
    /// of trusting the controller's own handle, so the panel reflects
    /// reality even when the handle is stale.
    #[must_use]
    pub fn describe(&self) -> String {
        let needle = self
            .cfg
            .binary
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("openvpn")
            .to_string();

        match Command::new("ps")
            .args(["-ax", "-o", "pid,command"])
            .output()
        {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let lines: Vec<&str> = stdout
                    .lines()
                    .skip(1) // header
                    .map(str::trim)
                    .filter(|l| l.contains(&needle))
                    .collect();
                if lines.is_empty() {
                    constants::MSG_NO_PROCESS.to_string()
                } else {
                    lines.join("\n")
                }
            }
            Ok(_) => constants::MSG_NO_PROCESS.to_string(),
            Err(e) => {
                logger::log(
                    LogLevel::Error,
                    "PROCESS",
                    format!("Failed to query process table: {e}"),
                );
                format!("Error querying process table: {e}")
            }
        }
    }
}

/// Scope-exit guarantee: a supervisor that goes away takes its client with
/// it, so no orphaned tunnel outlives an abnormal shutdown.
impl Drop for ProcessController {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if matches!(child.try_wait(), Ok(None)) {
                logger::log(
                    LogLevel::Warning,
                    "PROCESS",
                    format!("Terminating client process (pid {}) at teardown", child.id()),
                );
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}

#[allow(clippy::cast_possible_wrap)]
fn child_pid(child: &Child) -> i32 {
    child.id() as i32
}

fn send_signal(pid: i32, signal: Signal) -> Result<(), TerminationError> {
    kill(Pid::from_raw(pid), signal).map_err(|source| TerminationError {
        signal,
        pid,
        source,
    })
}

/// Polls for process exit until `timeout` elapses. Returns whether the
/// process was reaped in time.
fn wait_for_exit(child: &mut Child, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Err(_) => return true, // unobservable, treat as gone
            Ok(None) => {}
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(EXIT_POLL_STEP);
    }
}
