use serde::{Deserialize, Serialize};

use crate::domain::ManagerState;

/// Point-in-time view of a manager's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub state: ManagerState,
    /// Started, not yet complete.
    pub pending: usize,
    pub complete: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.pending + self.complete
    }
}
