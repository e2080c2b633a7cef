//! Supervisor state types.

/// Operating mode of the supervisor.
///
/// `Fixed` is manual-only: the process runs until the operator stops it.
/// `Cycle` rotates to the next profile after each dwell period, but only
/// while a process is actually running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Manual control only.
    #[default]
    Fixed,
    /// Automatic rotation on a timer while a process is running.
    Cycle,
}

impl Mode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Fixed => Self::Cycle,
            Self::Cycle => Self::Fixed,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Cycle => write!(f, "cycle"),
        }
    }
}

/// Point-in-time view of the supervisor, consumed by the front end.
///
/// `selected` is the operator's cursor in the catalog; `active` is the
/// profile the running process was launched with. While a process is
/// running, `active` is always set; it clears on stop/kill/exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSnapshot {
    /// Current operating mode.
    pub mode: Mode,
    /// Name of the profile the operator has selected, if any.
    pub selected: Option<String>,
    /// Name of the profile the running process was launched with.
    pub active: Option<String>,
    /// Whether a client process is currently running.
    pub running: bool,
    /// Seconds until the next automatic rotation; `None` renders as "n/a"
    /// (Fixed mode, or no running process).
    pub cycle_remaining: Option<u64>,
    /// Human-readable line derived from the OS process table.
    pub process_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_fixed() {
        assert_eq!(Mode::default(), Mode::Fixed);
    }

    #[test]
    fn test_mode_toggle_round_trip() {
        assert_eq!(Mode::Fixed.toggled(), Mode::Cycle);
        assert_eq!(Mode::Cycle.toggled(), Mode::Fixed);
        assert_eq!(Mode::Fixed.toggled().toggled(), Mode::Fixed);
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Fixed.to_string(), "fixed");
        assert_eq!(Mode::Cycle.to_string(), "cycle");
    }
}
