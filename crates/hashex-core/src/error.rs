use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::TaskId;

#[derive(Debug, Clone, Error)]
pub enum ManagerError {
    #[error("shutting down: cannot start a new task")]
    ShuttingDown,

    #[error("no such task: {0}")]
    NoSuchTask(TaskId),

    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The task itself failed. Passed through untouched.
    #[error(transparent)]
    Task(TaskError),
}

impl ManagerError {
    /// Did a cancellation signal end the call (rather than the task or the manager)?
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ManagerError::Cancelled | ManagerError::DeadlineExceeded)
    }
}

impl From<TaskError> for ManagerError {
    fn from(err: TaskError) -> Self {
        ManagerError::Task(err)
    }
}

/// Error produced by a task's own execution.
///
/// Opaque to the manager. Clones share the same underlying error, so every
/// waiter on a failed task sees the identical value.
#[derive(Clone)]
pub struct TaskError(Arc<dyn StdError + Send + Sync>);

impl TaskError {
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }

    /// An error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(Arc::new(Message(message.into())))
    }

    /// Does `other` share the same underlying error?
    pub fn ptr_eq(&self, other: &TaskError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }
}

impl fmt::Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskError").field(&self.0).finish()
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl StdError for TaskError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}
