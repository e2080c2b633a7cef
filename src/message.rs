//! Operator intents.
//!
//! All externally driven state mutations flow through this centralized
//! Intent enum. The front end captures keys, maps them to intents, and
//! forwards them to [`Supervisor::handle_intent`]; the supervisor processes
//! one intent at a time, which keeps every transition a single atomic step.
//!
//! [`Supervisor::handle_intent`]: crate::supervisor::Supervisor::handle_intent

/// All operator intents that can modify supervisor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Select a profile by name. Never starts or stops anything by itself.
    SelectProfile(String),
    /// Flip between fixed and cycle mode.
    ToggleMode,
    /// Stop the running process, or start the selected profile if none runs.
    StartStop,
    /// Manually rotate to the next profile (cycle mode only).
    CycleAdvance,
    /// Force-kill the running process without waiting for graceful exit.
    Kill,
    /// Re-scan the profile directory.
    RefreshCatalog,
    /// Kill any running process and shut the supervisor down.
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_equality() {
        assert_eq!(
            Intent::SelectProfile("a.ovpn".to_string()),
            Intent::SelectProfile("a.ovpn".to_string())
        );
        assert_ne!(
            Intent::SelectProfile("a.ovpn".to_string()),
            Intent::SelectProfile("b.ovpn".to_string())
        );
        assert_ne!(Intent::StartStop, Intent::Kill);
    }
}
