//! Core supervisor state machine.
//!
//! [`Supervisor`] owns every piece of mutable state: the operating mode, the
//! profile catalog and selection, the process controller, and the rotation
//! timer. The front end forwards operator [`Intent`]s, drives [`on_tick`]
//! once per second from its event loop, and renders [`snapshot`]s.
//!
//! All mutation happens on the caller's single thread; each intent and each
//! tick is one atomic step. Multi-step transitions (stop, kill, start during
//! a rotation) are additionally fenced by an in-progress flag so an intent
//! queued mid-transition cannot splice into the sequence.
//!
//! [`on_tick`]: Supervisor::on_tick
//! [`snapshot`]: Supervisor::snapshot

use std::sync::mpsc::Receiver;
use std::time::Duration;

use crate::catalog::{self, Profile};
use crate::config::SupervisorConfig;
use crate::constants;
use crate::core::process::{LaunchConfig, ProcessController};
use crate::core::tailer;
use crate::core::timer::CycleTimer;
use crate::logger::{self, LogLevel};
use crate::message::Intent;
use crate::state::{Mode, SupervisorSnapshot};

/// Orchestrates the client process, the profile catalog, and the rotation
/// timer.
pub struct Supervisor {
    config: SupervisorConfig,
    profiles: Vec<Profile>,
    /// Operator's cursor into the catalog.
    selected: Option<usize>,
    mode: Mode,
    controller: ProcessController,
    timer: CycleTimer,
    /// Fences the stop/kill/start sequences against intents queued mid-flight.
    transition_in_progress: bool,
    should_quit: bool,
    /// Latest process-table description, refreshed each tick.
    process_status: String,
}

impl Supervisor {
    /// Creates a supervisor: fixed mode, first profile pre-selected when the
    /// catalog is non-empty, no process (nothing is adopted from a prior run).
    ///
    /// An unreadable profile directory degrades to an empty catalog with a
    /// logged warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the activity log cannot be opened for appending;
    /// a supervisor that cannot record what it does must not start.
    pub fn new(config: SupervisorConfig) -> Result<Self, String> {
        logger::configure(&config.log_level, config.max_log_entries);
        logger::attach_file(&config.activity_log).map_err(|e| {
            format!(
                "Cannot open activity log {}: {e}",
                config.activity_log.display()
            )
        })?;

        logger::log(
            LogLevel::Info,
            "INIT",
            format!(
                "{} v{} starting...",
                constants::APP_NAME,
                constants::APP_VERSION
            ),
        );

        let profiles = match catalog::load(&config.profile_dir, &config.profile_extension) {
            Ok(profiles) => profiles,
            Err(e) => {
                logger::log(
                    LogLevel::Warning,
                    "CATALOG",
                    format!("{e}; continuing with an empty catalog"),
                );
                Vec::new()
            }
        };
        logger::log(
            LogLevel::Info,
            "CATALOG",
            format!(
                "Loaded {} profiles from {}",
                profiles.len(),
                config.profile_dir.display()
            ),
        );

        let selected = if profiles.is_empty() { None } else { Some(0) };
        let controller = ProcessController::new(LaunchConfig::from(&config));
        let timer = CycleTimer::new(config.cycle_period);

        Ok(Self {
            config,
            profiles,
            selected,
            mode: Mode::Fixed,
            controller,
            timer,
            transition_in_progress: false,
            should_quit: false,
            process_status: constants::MSG_NO_PROCESS.to_string(),
        })
    }

    /// The configuration this supervisor was built with.
    #[must_use]
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Whether a quit intent has been processed.
    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Processes one operator intent.
    pub fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::SelectProfile(name) => self.select_profile(&name),
            Intent::ToggleMode => self.toggle_mode(),
            Intent::StartStop => self.start_stop(),
            Intent::CycleAdvance => self.manual_cycle(),
            Intent::Kill => self.kill(),
            Intent::RefreshCatalog => self.refresh_catalog(),
            Intent::Quit => self.shutdown(),
        }
    }

    /// One-second heartbeat, driven by the front end's event loop.
    ///
    /// Observes process exits, keeps the timer in sync, rotates when the
    /// countdown fires, and refreshes the process-table description.
    pub fn on_tick(&mut self) {
        // Poll first: a process that died since the last tick must disarm
        // the timer within this tick, not the next one.
        self.controller.poll();
        self.sync_timer();

        if self.timer.tick() {
            self.cycle_advance();
        }

        self.process_status = self.controller.describe();
    }

    /// Point-in-time view for the front end.
    #[must_use]
    pub fn snapshot(&self) -> SupervisorSnapshot {
        SupervisorSnapshot {
            mode: self.mode,
            selected: self
                .selected
                .and_then(|i| self.profiles.get(i))
                .map(|p| p.name.clone()),
            active: self.controller.active_profile().map(|p| p.name.clone()),
            running: self.controller.is_running(),
            cycle_remaining: self.timer.remaining(),
            process_status: self.process_status.clone(),
        }
    }

    /// Spawns the two log tailers: one over the client's log, one over the
    /// supervisor's own activity log.
    ///
    /// The receivers go straight to the front end; dropping one retires its
    /// worker, and calling again restarts the pair.
    #[must_use]
    pub fn spawn_tailers(&self) -> (Receiver<Vec<String>>, Receiver<Vec<String>>) {
        let interval = Duration::from_secs(self.config.tail_poll.max(1));
        (
            tailer::spawn_tailer(
                self.config.client_log.clone(),
                self.config.tail_lines,
                interval,
            ),
            tailer::spawn_tailer(
                self.config.activity_log.clone(),
                self.config.tail_lines,
                interval,
            ),
        )
    }

    /// Kills any running process and marks the supervisor done.
    pub fn shutdown(&mut self) {
        if self.controller.poll() {
            if let Err(e) = self.controller.kill() {
                logger::log(LogLevel::Error, "PROCESS", e.to_string());
            }
        }
        self.timer.disarm();
        self.should_quit = true;
        logger::log(LogLevel::Info, "APP", "Shutting down supervisor");
    }

    fn select_profile(&mut self, name: &str) {
        match catalog::index_of(&self.profiles, name) {
            Some(idx) => {
                self.selected = Some(idx);
                logger::log(LogLevel::Info, "INTENT", format!("Selected '{name}'"));
            }
            None => {
                logger::log(
                    LogLevel::Warning,
                    "INTENT",
                    format!("Selection ignored: '{name}' is not in the catalog"),
                );
            }
        }
    }

    fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        logger::log(
            LogLevel::Info,
            "MODE",
            format!("Mode switched to {}", self.mode),
        );
        self.sync_timer();
    }

    fn start_stop(&mut self) {
        if self.transition_in_progress {
            logger::log(
                LogLevel::Warning,
                "INTENT",
                "start-stop ignored: another transition is in flight",
            );
            return;
        }
        self.transition_in_progress = true;

        if self.controller.poll() {
            if let Err(e) = self.controller.stop() {
                logger::log(LogLevel::Error, "PROCESS", e.to_string());
            }
        } else {
            self.start_selected();
        }

        self.transition_in_progress = false;
        self.sync_timer();
    }

    fn manual_cycle(&mut self) {
        if self.mode != Mode::Cycle || !self.controller.poll() {
            logger::log(
                LogLevel::Warning,
                "CYCLE",
                "Manual advance ignored: requires cycle mode and a running process",
            );
            return;
        }
        self.cycle_advance();
    }

    fn kill(&mut self) {
        if !self.controller.poll() {
            logger::log(LogLevel::Info, "INTENT", "Kill ignored: no running process");
            return;
        }
        if let Err(e) = self.controller.kill() {
            logger::log(LogLevel::Error, "PROCESS", e.to_string());
        }
        self.sync_timer();
    }

    fn refresh_catalog(&mut self) {
        let selected_name = self
            .selected
            .and_then(|i| self.profiles.get(i))
            .map(|p| p.name.clone());

        match catalog::load(&self.config.profile_dir, &self.config.profile_extension) {
            Ok(profiles) => {
                self.profiles = profiles;
                logger::log(
                    LogLevel::Info,
                    "CATALOG",
                    format!("Catalog refreshed: {} profiles", self.profiles.len()),
                );
            }
            Err(e) => {
                logger::log(
                    LogLevel::Warning,
                    "CATALOG",
                    format!("{e}; keeping the previous catalog"),
                );
                return;
            }
        }

        self.selected = selected_name
            .and_then(|name| catalog::index_of(&self.profiles, &name))
            .or(if self.profiles.is_empty() {
                None
            } else {
                Some(0)
            });
    }

    /// Starts the selected profile, if any. Launch failures are logged and
    /// leave the controller absent; the operator can retry.
    fn start_selected(&mut self) {
        let Some(idx) = self.selected else {
            logger::log(
                LogLevel::Warning,
                "INTENT",
                "No profile selected; nothing to start",
            );
            return;
        };
        let profile = self.profiles[idx].clone();
        if let Err(e) = self.controller.start(&profile) {
            logger::log(LogLevel::Error, "PROCESS", format!("Launch failed: {e}"));
        }
    }

    /// Stops the current process, then advances the selection to the next
    /// catalog entry and starts it. With a catalog of size one this restarts
    /// the same profile.
    fn cycle_advance(&mut self) {
        if self.transition_in_progress {
            logger::log(
                LogLevel::Warning,
                "CYCLE",
                "Advance skipped: another transition is in flight",
            );
            return;
        }
        self.transition_in_progress = true;

        if let Err(e) = self.controller.stop() {
            logger::log(LogLevel::Error, "PROCESS", e.to_string());
        }
        // Unconditional kill in case the graceful stop did not take
        if let Err(e) = self.controller.kill() {
            logger::log(LogLevel::Error, "PROCESS", e.to_string());
        }

        if let Some(idx) = self.selected {
            let next = (idx + 1) % self.profiles.len();
            self.selected = Some(next);
            let name = self.profiles[next].name.clone();
            logger::log(LogLevel::Info, "CYCLE", format!("Rotating to '{name}'"));
            self.start_selected();
            if self.controller.is_running() {
                // Fresh dwell period for the new session
                self.timer.arm();
            }
        }

        self.transition_in_progress = false;
        self.sync_timer();
    }

    /// Re-derives the timer's armed state.
    ///
    /// Armed iff (cycle mode AND process running). Called after every
    /// transition and every tick; an already armed timer keeps its countdown.
    fn sync_timer(&mut self) {
        let should_arm = self.mode == Mode::Cycle && self.controller.is_running();
        if should_arm && !self.timer.is_armed() {
            self.timer.arm();
        } else if !should_arm && self.timer.is_armed() {
            self.timer.disarm();
        }
    }
}
