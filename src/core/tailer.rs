//! Background log tailing.
//!
//! Each tailer runs in its own thread and publishes "current last N lines"
//! snapshots of one file over an MPSC channel, refreshed on a fixed
//! interval. Two instances run side by side: one over the client's log and
//! one over the supervisor's own activity log.
//!
//! Every refresh fully re-reads and re-truncates the file instead of
//! tracking offsets. The monitored logs are small, and a full re-read is
//! immune to truncation and rotation underneath us.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use crate::logger::{self, LogLevel};

/// Returns the last `max` lines of `content`.
///
/// The result never exceeds `max` lines regardless of input size.
#[must_use]
pub fn tail_lines(content: &str, max: usize) -> Vec<String> {
    let total = content.lines().count();
    content
        .lines()
        .skip(total.saturating_sub(max))
        .map(str::to_string)
        .collect()
}

/// Spawns a background tailer over `path`.
///
/// Every `interval` the worker re-reads the file and sends the last
/// `max_lines` lines. Read failures (file missing, rotated away, permission
/// change) are logged and retried on the next interval; the worker never
/// terminates on them. The worker exits when the receiver is dropped, so a
/// fresh call restarts the sequence.
pub fn spawn_tailer(path: PathBuf, max_lines: usize, interval: Duration) -> Receiver<Vec<String>> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        // Tracks whether the last read failed, so a flaky file logs one
        // warning per outage instead of one per second.
        let mut failing = false;

        loop {
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    if failing {
                        logger::log(
                            LogLevel::Info,
                            "TAIL",
                            format!("{} is readable again", path.display()),
                        );
                        failing = false;
                    }
                    if tx.send(tail_lines(&content, max_lines)).is_err() {
                        break; // receiver gone, tailer retires
                    }
                }
                Err(e) => {
                    if !failing {
                        logger::log(
                            LogLevel::Warning,
                            "TAIL",
                            format!("Cannot read {}: {e}; retrying", path.display()),
                        );
                        failing = true;
                    }
                }
            }

            thread::sleep(interval);
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_lines_shorter_than_max() {
        let lines = tail_lines("one\ntwo\n", 10);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_tail_lines_truncates_to_max() {
        let content: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let lines = tail_lines(&content, 10);
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "line 40");
        assert_eq!(lines[9], "line 49");
    }

    #[test]
    fn test_tail_lines_never_exceeds_max() {
        for total in [0usize, 1, 9, 10, 11, 500] {
            let content: String = (0..total).map(|i| format!("{i}\n")).collect();
            assert!(tail_lines(&content, 10).len() <= 10);
        }
    }

    #[test]
    fn test_tail_lines_empty_input() {
        assert!(tail_lines("", 10).is_empty());
    }

    #[test]
    fn test_tail_lines_no_trailing_newline() {
        let lines = tail_lines("a\nb\nc", 2);
        assert_eq!(lines, vec!["b", "c"]);
    }

    #[test]
    fn test_spawn_tailer_publishes_snapshots() {
        let path = std::env::temp_dir().join(format!(
            "tunrotor-tailer-{}.log",
            std::process::id()
        ));
        std::fs::write(&path, "alpha\nbeta\n").unwrap();

        let rx = spawn_tailer(path.clone(), 10, Duration::from_millis(20));
        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, vec!["alpha", "beta"]);

        // The file grows; a later snapshot reflects the growth
        std::fs::write(&path, "alpha\nbeta\ngamma\n").unwrap();
        let mut latest = first;
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while latest.len() < 3 && std::time::Instant::now() < deadline {
            if let Ok(snap) = rx.recv_timeout(Duration::from_millis(200)) {
                latest = snap;
            }
        }
        assert_eq!(latest, vec!["alpha", "beta", "gamma"]);

        drop(rx);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_spawn_tailer_survives_missing_file() {
        let path = std::env::temp_dir().join(format!(
            "tunrotor-tailer-late-{}.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        // File does not exist yet: the worker must keep retrying, not die
        let rx = spawn_tailer(path.clone(), 5, Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(100));
        std::fs::write(&path, "late arrival\n").unwrap();

        let snap = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(snap, vec!["late arrival"]);

        drop(rx);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_spawn_tailer_bounds_output() {
        let path = std::env::temp_dir().join(format!(
            "tunrotor-tailer-bound-{}.log",
            std::process::id()
        ));
        let content: String = (0..100).map(|i| format!("entry {i}\n")).collect();
        std::fs::write(&path, content).unwrap();

        let rx = spawn_tailer(path.clone(), 10, Duration::from_millis(20));
        let snap = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(snap.len(), 10);
        assert_eq!(snap[9], "entry 99");

        drop(rx);
        let _ = std::fs::remove_file(&path);
    }
}
