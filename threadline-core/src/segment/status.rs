//! Status inference for delegation groups.

use crate::types::GroupStatus;

/// Tracks a group's lifecycle while it is being scanned.
///
/// The status is a pure function of what has been observed: `Pending` until
/// an artifact arrives, `InProgress` afterwards, `Completed` once the terminal
/// result is seen. It never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTracker {
    status: GroupStatus,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            status: GroupStatus::Pending,
        }
    }

    pub fn observe_artifact(&mut self) {
        self.advance(GroupStatus::InProgress);
    }

    pub fn observe_terminal(&mut self) {
        self.advance(GroupStatus::Completed);
    }

    pub fn status(&self) -> GroupStatus {
        self.status
    }

    fn advance(&mut self, next: GroupStatus) {
        self.status = self.status.max(next);
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_pending() {
        assert_eq!(StatusTracker::new().status(), GroupStatus::Pending);
    }

    #[test]
    fn test_artifact_then_terminal() {
        let mut tracker = StatusTracker::new();
        tracker.observe_artifact();
        assert_eq!(tracker.status(), GroupStatus::InProgress);
        tracker.observe_terminal();
        assert_eq!(tracker.status(), GroupStatus::Completed);
    }

    #[test]
    fn test_never_regresses() {
        let mut tracker = StatusTracker::new();
        tracker.observe_terminal();
        tracker.observe_artifact();
        assert_eq!(tracker.status(), GroupStatus::Completed);
    }

    #[test]
    fn test_terminal_without_artifacts_completes() {
        let mut tracker = StatusTracker::new();
        tracker.observe_terminal();
        assert_eq!(tracker.status(), GroupStatus::Completed);
    }
}
