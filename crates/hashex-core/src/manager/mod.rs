//! Task manager: runs tasks in the background and hands their results to
//! any number of waiters, tracked by id.

mod record;

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::domain::{CancelSignal, ManagerState, TaskId, TaskState};
use crate::error::{ManagerError, TaskError};
use crate::observability::TaskCounts;
use crate::task::{Task, TaskOutput};

use self::record::{Completion, TaskRecord};

/// Keeps track of a set of tasks.
///
/// Records are kept forever: there is no expiry, so a long-running process
/// grows by one record per accepted task.
///
/// Clones share the same bookkeeping.
#[derive(Clone)]
pub struct Manager {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    /// Mirrors `Inner::in_flight`; only written under the lock.
    in_flight_tx: watch::Sender<usize>,
    /// Runtime captured at construction, used when `start` is called from a
    /// thread outside any runtime.
    runtime: Option<Handle>,
}

/// Everything behind the lock. Every operation on it is O(1).
struct Inner {
    tasks: HashMap<TaskId, TaskRecord>,
    next_id: TaskId,
    stopping: bool,
    in_flight: usize,
}

impl Inner {
    fn allocate_id(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    fn state(&self) -> ManagerState {
        ManagerState::from_parts(self.stopping, self.in_flight)
    }
}

impl Shared {
    fn set_in_flight(&self, inner: &mut Inner, in_flight: usize) {
        inner.in_flight = in_flight;
        self.in_flight_tx.send_replace(in_flight);
    }
}

impl Manager {
    /// Create a manager bound to the current Tokio runtime, if any.
    ///
    /// Without a runtime, tasks started outside one run on their own threads.
    pub fn new() -> Self {
        Self::build(Handle::try_current().ok())
    }

    /// Create a manager whose tasks run on `handle`'s blocking pool whenever
    /// `start` is called outside a runtime.
    pub fn with_handle(handle: Handle) -> Self {
        Self::build(Some(handle))
    }

    fn build(runtime: Option<Handle>) -> Self {
        let (in_flight_tx, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    tasks: HashMap::new(),
                    next_id: TaskId::FIRST,
                    stopping: false,
                    in_flight: 0,
                }),
                in_flight_tx,
                runtime,
            }),
        }
    }

    /// Start running `task` in the background and return its id.
    ///
    /// Returns as soon as the task is scheduled. Fails with
    /// [`ManagerError::ShuttingDown`] once [`shutdown`](Self::shutdown) has been
    /// called, without consuming an id.
    ///
    /// May be called from any thread. The task runs on the blocking pool of
    /// the caller's runtime, else of the manager's own runtime, else on a
    /// dedicated thread.
    pub fn start<T: Task>(&self, task: T) -> Result<TaskId, ManagerError> {
        let runtime = Handle::try_current()
            .ok()
            .or_else(|| self.shared.runtime.clone());

        let (id, completion) = {
            let mut inner = self.shared.inner.lock();
            if !inner.state().is_accepting() {
                return Err(ManagerError::ShuttingDown);
            }

            let id = inner.allocate_id();
            let (record, completion) = TaskRecord::new();
            inner.tasks.insert(id, record);
            let in_flight = inner.in_flight + 1;
            self.shared.set_in_flight(&mut inner, in_flight);
            (id, completion)
        };

        let execution = Execution {
            id,
            task,
            completion,
            _in_flight: InFlight {
                shared: Arc::clone(&self.shared),
            },
        };
        match runtime {
            Some(handle) => {
                handle.spawn_blocking(move || execution.run());
            }
            None => {
                let spawned = std::thread::Builder::new()
                    .name(format!("hashex-task-{id}"))
                    .spawn(move || execution.run());
                // On failure the execution is dropped, which records the
                // task as never run and releases its in-flight slot.
                if let Err(err) = spawned {
                    error!(task_id = %id, error = %err, "cannot spawn task thread");
                }
            }
        }

        debug!(task_id = %id, "task started");
        Ok(id)
    }

    /// Wait for task `id` to complete and return what it produced.
    ///
    /// Once a task has completed, every later call returns the same output
    /// immediately. If `signal` fires first, its cause is returned and the
    /// task keeps running; a later `wait` can still collect the result.
    pub async fn wait(&self, id: TaskId, signal: &CancelSignal) -> Result<TaskOutput, ManagerError> {
        let mut waiter = {
            let inner = self.shared.inner.lock();
            inner.tasks.get(&id).map(TaskRecord::subscribe)
        }
        .ok_or(ManagerError::NoSuchTask(id))?;

        tokio::select! {
            biased;
            outcome = waiter.outcome() => outcome,
            err = signal.done() => Err(err),
        }
    }

    /// Stop accepting tasks and wait until no task is running.
    ///
    /// If `signal` fires first, its cause is returned; running tasks are not
    /// interrupted and finish in the background. Safe to call repeatedly.
    pub async fn shutdown(&self, signal: &CancelSignal) -> Result<(), ManagerError> {
        let mut in_flight = {
            let mut inner = self.shared.inner.lock();
            if !inner.stopping {
                inner.stopping = true;
                debug!(in_flight = inner.in_flight, "shutdown requested");
            }
            self.shared.in_flight_tx.subscribe()
        };

        tokio::select! {
            biased;
            // The sender lives in `self.shared`, so the channel cannot close here.
            _ = in_flight.wait_for(|n| *n == 0) => {
                debug!("all tasks drained");
                Ok(())
            }
            err = signal.done() => Err(err),
        }
    }

    pub fn state(&self) -> ManagerState {
        self.shared.inner.lock().state()
    }

    /// Number of tasks started but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.shared.inner.lock().in_flight
    }

    pub fn counts(&self) -> TaskCounts {
        let inner = self.shared.inner.lock();
        TaskCounts {
            state: inner.state(),
            pending: inner.in_flight,
            complete: inner.tasks.len() - inner.in_flight,
        }
    }

    /// State of task `id`, or `None` if this manager never issued it.
    pub fn task_state(&self, id: TaskId) -> Option<TaskState> {
        self.shared.inner.lock().tasks.get(&id).map(TaskRecord::state)
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("counts", &self.counts())
            .finish()
    }
}

/// One background run of a task.
///
/// Field order matters on the drop path: the slot is filled before the
/// in-flight count goes down.
struct Execution<T> {
    id: TaskId,
    task: T,
    completion: Completion,
    _in_flight: InFlight,
}

impl<T: Task> Execution<T> {
    fn run(self) {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.task.run()))
            .unwrap_or_else(|_| Err(TaskError::msg("task panicked")));
        debug!(task_id = %self.id, ok = outcome.is_ok(), "task completed");
        self.completion.complete(outcome);
        // `_in_flight` drops last, after the result is visible.
    }
}

/// Counts one execution as in flight until dropped.
struct InFlight {
    shared: Arc<Shared>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        let in_flight = inner.in_flight.saturating_sub(1);
        self.shared.set_in_flight(&mut inner, in_flight);
    }
}
