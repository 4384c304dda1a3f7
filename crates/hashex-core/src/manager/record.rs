//! Per-task bookkeeping: the completion slot and its single writer.

use tokio::sync::watch;

use crate::domain::TaskState;
use crate::error::{ManagerError, TaskError};
use crate::task::TaskOutput;

/// What a finished task left behind.
pub(crate) type Outcome = Result<TaskOutput, TaskError>;

type Slot = Option<Outcome>;

/// The manager's entry for one task.
///
/// Design:
/// - Created at `start`, before the task runs, with an empty slot.
/// - Exactly one [`Completion`] may fill the slot; once filled it never changes.
/// - Readers clone the receiver and wait without holding the manager lock.
#[derive(Debug)]
pub(crate) struct TaskRecord {
    done: watch::Receiver<Slot>,
}

impl TaskRecord {
    pub(crate) fn new() -> (Self, Completion) {
        let (tx, rx) = watch::channel(None);
        (Self { done: rx }, Completion { tx: Some(tx) })
    }

    pub(crate) fn state(&self) -> TaskState {
        if self.done.borrow().is_some() {
            TaskState::Complete
        } else {
            TaskState::Pending
        }
    }

    pub(crate) fn subscribe(&self) -> Waiter {
        Waiter {
            done: self.done.clone(),
        }
    }
}

/// A reader's handle on one record's completion slot.
pub(crate) struct Waiter {
    done: watch::Receiver<Slot>,
}

impl Waiter {
    /// Resolves with the stored outcome once the slot is filled.
    /// Returns immediately when it already is.
    pub(crate) async fn outcome(&mut self) -> Result<TaskOutput, ManagerError> {
        let slot = match self.done.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone(),
            // The writer always fills the slot before it goes away.
            Err(_) => None,
        };
        slot.unwrap_or_else(|| Err(TaskError::msg(NEVER_RAN)))
            .map_err(ManagerError::Task)
    }
}

const NEVER_RAN: &str = "task was dropped before it ran";

/// The single writer of a record's slot.
///
/// Consumed by [`complete`](Completion::complete). If it is dropped without
/// completing (the execution never got to run), the slot is filled with an
/// error so waiters are never stranded.
#[derive(Debug)]
pub(crate) struct Completion {
    tx: Option<watch::Sender<Slot>>,
}

impl Completion {
    pub(crate) fn complete(mut self, outcome: Outcome) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(outcome));
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(Err(TaskError::msg(NEVER_RAN))));
        }
    }
}
