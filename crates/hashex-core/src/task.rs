use std::sync::Arc;

use crate::error::TaskError;

/// Value a task produces on success.
pub type TaskOutput = serde_json::Value;

/// A unit of work the manager can run.
///
/// `run` is blocking and is called exactly once, on a dedicated thread from
/// the blocking pool. Implementations own their thread-safety.
///
/// # Example
/// ```
/// use hashex_core::{Task, TaskError, TaskOutput};
///
/// struct Upper(String);
///
/// impl Task for Upper {
///     fn run(&self) -> Result<TaskOutput, TaskError> {
///         Ok(self.0.to_uppercase().into())
///     }
/// }
/// ```
pub trait Task: Send + 'static {
    fn run(&self) -> Result<TaskOutput, TaskError>;
}

impl<T: Task + ?Sized> Task for Box<T> {
    fn run(&self) -> Result<TaskOutput, TaskError> {
        (**self).run()
    }
}

impl<T: Task + Sync + ?Sized> Task for Arc<T> {
    fn run(&self) -> Result<TaskOutput, TaskError> {
        (**self).run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    impl Task for Echo {
        fn run(&self) -> Result<TaskOutput, TaskError> {
            Ok(self.0.into())
        }
    }

    #[test]
    fn boxed_and_shared_tasks_delegate() {
        let boxed: Box<dyn Task> = Box::new(Echo("boxed"));
        assert_eq!(boxed.run().unwrap(), "boxed");

        let shared = Arc::new(Echo("shared"));
        assert_eq!(shared.run().unwrap(), "shared");
    }
}
