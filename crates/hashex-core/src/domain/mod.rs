//! Domain model: ids, lifecycle states and the cancellation signal.

pub mod cancel;
pub mod ids;
pub mod state;

pub use cancel::CancelSignal;
pub use ids::TaskId;
pub use state::{ManagerState, TaskState};
