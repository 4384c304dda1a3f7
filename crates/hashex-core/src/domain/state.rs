//! Lifecycle states for task records and for the manager itself.

use serde::{Deserialize, Serialize};

/// State of one task record.
///
/// State transitions:
/// - Pending -> Complete
///
/// There is no cancelled state: cancelling a wait detaches the waiter,
/// never the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Started, result not yet stored.
    Pending,

    /// Result (or error) stored. Terminal.
    Complete,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Complete)
    }
}

/// State of the manager as a whole.
///
/// State transitions:
/// - Accepting -> Draining -> Stopped
///
/// One-directional: there is no restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerState {
    /// New tasks are accepted.
    Accepting,

    /// Shutdown was requested; tasks are still running.
    Draining,

    /// Shutdown was requested and nothing is running.
    Stopped,
}

impl ManagerState {
    pub(crate) fn from_parts(stopping: bool, in_flight: usize) -> Self {
        match (stopping, in_flight) {
            (false, _) => ManagerState::Accepting,
            (true, 0) => ManagerState::Stopped,
            (true, _) => ManagerState::Draining,
        }
    }

    /// Can `start` succeed in this state?
    pub fn is_accepting(self) -> bool {
        matches!(self, ManagerState::Accepting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::idle(false, 0, ManagerState::Accepting)]
    #[case::busy(false, 3, ManagerState::Accepting)]
    #[case::draining(true, 2, ManagerState::Draining)]
    #[case::stopped(true, 0, ManagerState::Stopped)]
    fn manager_state_from_flag_and_count(
        #[case] stopping: bool,
        #[case] in_flight: usize,
        #[case] expected: ManagerState,
    ) {
        assert_eq!(ManagerState::from_parts(stopping, in_flight), expected);
    }

    #[test]
    fn only_complete_is_terminal() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(TaskState::Complete.is_terminal());
    }

    #[rstest]
    #[case::accepting(ManagerState::Accepting, true)]
    #[case::draining(ManagerState::Draining, false)]
    #[case::stopped(ManagerState::Stopped, false)]
    fn only_accepting_takes_new_tasks(#[case] state: ManagerState, #[case] expected: bool) {
        assert_eq!(state.is_accepting(), expected);
    }

    #[test]
    fn states_serialize_snake_case() {
        let s = serde_json::to_string(&ManagerState::Draining).unwrap();
        assert_eq!(s, "\"draining\"");
    }
}
