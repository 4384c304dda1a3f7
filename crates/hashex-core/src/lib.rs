//! hashex-core
//!
//! In-process asynchronous task tracking.
//!
//! - **domain**: ids, lifecycle states, the cancellation signal
//! - **task**: the `Task` trait implemented by units of work
//! - **manager**: `Manager` (start / wait / shutdown)
//! - **error**: `ManagerError`, `TaskError`
//! - **observability**: point-in-time counts
//!
//! ```no_run
//! use hashex_core::{CancelSignal, Manager, Task, TaskError, TaskOutput};
//!
//! struct Answer;
//!
//! impl Task for Answer {
//!     fn run(&self) -> Result<TaskOutput, TaskError> {
//!         Ok(42.into())
//!     }
//! }
//!
//! # async fn demo() -> Result<(), hashex_core::ManagerError> {
//! let tasks = Manager::new();
//! let id = tasks.start(Answer)?;
//! let out = tasks.wait(id, &CancelSignal::background()).await?;
//! assert_eq!(out, 42);
//! tasks.shutdown(&CancelSignal::background()).await?;
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod error;
pub mod manager;
pub mod observability;
pub mod task;

pub use domain::{CancelSignal, ManagerState, TaskId, TaskState};
pub use error::{ManagerError, TaskError};
pub use manager::Manager;
pub use observability::TaskCounts;
pub use task::{Task, TaskOutput};
