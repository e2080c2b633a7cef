//! Event logging with an activity-log file sink.
//!
//! Everything the supervisor does is recorded twice: in a bounded in-memory
//! buffer the front end renders directly, and in an append-only activity-log
//! file. The file is what the self-monitoring tailer follows, so the
//! operator watches the supervisor's own actions stream past next to the
//! client's log.

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::SystemTime;

use crate::constants;

/// Severity of an event-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Development chatter, hidden by default.
    Debug = 0,
    /// Normal operation.
    Info = 1,
    /// Something degraded but the supervisor carries on.
    Warning = 2,
    /// An operation failed outright.
    Error = 3,
}

impl LogLevel {
    /// Fixed-width tag used in rendered lines.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO ",
            Self::Warning => "WARN ",
            Self::Error => "ERROR",
        }
    }

    /// Parses a level name, case-insensitive. Unrecognised values fall back
    /// to `Info` rather than erroring; a typo in the config should not mute
    /// or flood the log.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" => Self::Debug,
            "warning" | "warn" => Self::Warning,
            "error" | "err" => Self::Error,
            _ => Self::Info,
        }
    }
}

/// One recorded event.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: SystemTime,
    pub level: LogLevel,
    pub category: String,
    pub message: String,
}

impl LogEntry {
    /// Renders the entry as `[HH:MM:SS] [LEVEL] CATEGORY: message`, the
    /// activity log's line format.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "[{}] [{}] {}: {}",
            local_clock(self.timestamp),
            self.level.tag(),
            self.category,
            self.message
        )
    }
}

struct EventLog {
    recent: VecDeque<LogEntry>,
    capacity: usize,
    threshold: LogLevel,
    sink: Option<PathBuf>,
}

impl EventLog {
    fn record(&mut self, entry: LogEntry) {
        if entry.level < self.threshold {
            return;
        }

        // Sink failures after the startup probe are swallowed: losing a log
        // line must never take the supervisor down.
        if let Some(path) = &self.sink {
            if let Ok(mut file) = open_for_append(path) {
                let _ = writeln!(file, "{}", entry.to_line());
            }
        }

        self.recent.push_back(entry);
        while self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
    }
}

static EVENT_LOG: OnceLock<Arc<Mutex<EventLog>>> = OnceLock::new();

fn event_log() -> &'static Arc<Mutex<EventLog>> {
    EVENT_LOG.get_or_init(|| {
        Arc::new(Mutex::new(EventLog {
            recent: VecDeque::with_capacity(constants::DEFAULT_MAX_LOG_ENTRIES),
            capacity: constants::DEFAULT_MAX_LOG_ENTRIES,
            threshold: LogLevel::Info,
            sink: None,
        }))
    })
}

fn open_for_append(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}

/// Records one event under the given level and category.
pub fn log(level: LogLevel, category: &str, message: impl Into<String>) {
    if let Ok(mut event_log) = event_log().lock() {
        event_log.record(LogEntry {
            timestamp: SystemTime::now(),
            level,
            category: category.to_string(),
            message: message.into(),
        });
    }
}

/// The buffered entries, oldest first, for the front end's event panel.
#[must_use]
pub fn entries() -> Vec<LogEntry> {
    event_log()
        .lock()
        .map(|event_log| event_log.recent.iter().cloned().collect())
        .unwrap_or_default()
}

/// Applies the user's log settings. Called once at supervisor construction.
pub fn configure(level: &str, capacity: usize) {
    if let Ok(mut event_log) = event_log().lock() {
        event_log.threshold = LogLevel::parse(level);
        event_log.capacity = capacity;
        while event_log.recent.len() > event_log.capacity {
            event_log.recent.pop_front();
        }
    }
}

/// Routes every subsequent entry to the activity-log file as well.
///
/// The path is probed for appendability first. A supervisor that cannot
/// record its own activity must not start, so unlike later sink errors this
/// one is surfaced to the caller.
///
/// # Errors
///
/// Returns an error if the file cannot be opened for appending.
pub fn attach_file(path: &Path) -> std::io::Result<()> {
    open_for_append(path)?;
    if let Ok(mut event_log) = event_log().lock() {
        event_log.sink = Some(path.to_path_buf());
    }
    Ok(())
}

/// Raises or lowers the severity threshold.
pub fn set_threshold(level: LogLevel) {
    if let Ok(mut event_log) = event_log().lock() {
        event_log.threshold = level;
    }
}

/// Drops all buffered entries. The file sink, if attached, is untouched.
pub fn clear() {
    if let Ok(mut event_log) = event_log().lock() {
        event_log.recent.clear();
    }
}

/// Local wall-clock `HH:MM:SS` for a timestamp.
#[allow(unsafe_code)]
fn local_clock(time: SystemTime) -> String {
    const FALLBACK: &str = "00:00:00";

    let Ok(elapsed) = time.duration_since(SystemTime::UNIX_EPOCH) else {
        return FALLBACK.to_string();
    };
    // time_t is i64 on every supported platform; the wrap is in year 2262
    #[allow(clippy::cast_possible_wrap)]
    let clock = elapsed.as_secs() as libc::time_t;

    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    // SAFETY: both pointers are valid for the duration of the call, and
    // localtime_r (unlike localtime) touches no shared state.
    if unsafe { libc::localtime_r(&clock, &mut tm) }.is_null() {
        return FALLBACK.to_string();
    }

    format!("{:02}:{:02}:{:02}", tm.tm_hour, tm.tm_min, tm.tm_sec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_log(capacity: usize, threshold: LogLevel) -> EventLog {
        EventLog {
            recent: VecDeque::new(),
            capacity,
            threshold,
            sink: None,
        }
    }

    fn entry(level: LogLevel, message: &str) -> LogEntry {
        LogEntry {
            timestamp: SystemTime::now(),
            level,
            category: "TEST".to_string(),
            message: message.to_string(),
        }
    }

    // Other test modules log through the global instance concurrently, so
    // assertions on it check containment, never counts.
    #[test]
    fn test_global_log_and_read_back() {
        let message = format!("global round trip {}", std::process::id());
        log(LogLevel::Error, "TEST", message.clone());

        assert!(entries()
            .iter()
            .any(|e| e.category == "TEST" && e.message == message));
    }

    #[test]
    fn test_threshold_filters_lower_levels() {
        let mut event_log = bare_log(16, LogLevel::Warning);

        event_log.record(entry(LogLevel::Debug, "dropped"));
        event_log.record(entry(LogLevel::Info, "dropped"));
        event_log.record(entry(LogLevel::Warning, "kept"));
        event_log.record(entry(LogLevel::Error, "kept"));

        assert_eq!(event_log.recent.len(), 2);
        assert!(event_log.recent.iter().all(|e| e.message == "kept"));
    }

    #[test]
    fn test_buffer_is_bounded() {
        let mut event_log = bare_log(10, LogLevel::Info);

        for i in 0..50 {
            event_log.record(entry(LogLevel::Info, &format!("entry {i}")));
        }

        assert_eq!(event_log.recent.len(), 10);
        // Oldest entries were evicted first
        assert_eq!(event_log.recent[0].message, "entry 40");
    }

    #[test]
    fn test_sink_receives_rendered_lines() {
        let path = std::env::temp_dir().join(format!(
            "tunrotor-sink-{}.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        // A private EventLog rather than the global one, so parallel tests
        // attaching their own sinks cannot interfere
        let mut event_log = bare_log(16, LogLevel::Info);
        event_log.sink = Some(path.clone());
        event_log.record(entry(LogLevel::Warning, "sink check"));
        event_log.record(entry(LogLevel::Debug, "below threshold"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[WARN ] TEST: sink check"));
        // Filtered entries reach neither the buffer nor the file
        assert!(!content.contains("below threshold"));
        assert_eq!(event_log.recent.len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_attach_file_rejects_unwritable_path() {
        assert!(attach_file(Path::new("/nonexistent-dir/tunrotor.log")).is_err());
    }

    #[test]
    fn test_parse_level_names() {
        assert_eq!(LogLevel::parse("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("WARN"), LogLevel::Warning);
        assert_eq!(LogLevel::parse(" error "), LogLevel::Error);
        assert_eq!(LogLevel::parse("info"), LogLevel::Info);
        assert_eq!(LogLevel::parse("nonsense"), LogLevel::Info);
    }

    #[test]
    fn test_entry_line_format() {
        let entry = LogEntry {
            timestamp: SystemTime::UNIX_EPOCH,
            level: LogLevel::Error,
            category: "PROCESS".to_string(),
            message: "launch failed".to_string(),
        };
        let line = entry.to_line();
        assert!(line.ends_with("[ERROR] PROCESS: launch failed"));
        // [HH:MM:SS] prefix, whatever the timezone
        assert_eq!(line.as_bytes()[0], b'[');
        assert_eq!(line.as_bytes()[9], b']');
    }

    #[test]
    fn test_local_clock_shape() {
        let formatted = local_clock(SystemTime::now());
        assert_eq!(formatted.len(), 8);
        assert_eq!(formatted.as_bytes()[2], b':');
        assert_eq!(formatted.as_bytes()[5], b':');
    }
}
