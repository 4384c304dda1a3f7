//! Cancellation signal for `wait` and `shutdown`.
//!
//! A [`CancelSignal`] fires for one of two causes:
//! - an explicit cancel (through its [`CancellationToken`]) -> `Cancelled`
//! - its deadline passing -> `DeadlineExceeded`
//!
//! Firing only ends the caller's wait. It never reaches the task.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::ManagerError;

#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelSignal {
    /// A signal that never fires on its own.
    pub fn background() -> Self {
        Self::default()
    }

    /// Fire when `token` is cancelled. Cancelling the signal also cancels
    /// the token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// A signal that is already cancelled.
    pub fn cancelled() -> Self {
        let signal = Self::background();
        signal.cancel();
        signal
    }

    /// Add a deadline `timeout` from now. An earlier deadline already set wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Add a deadline. An earlier deadline already set wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The cause, if the signal has already fired.
    pub fn err(&self) -> Option<ManagerError> {
        if self.token.is_cancelled() {
            return Some(ManagerError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(ManagerError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the signal fires, with the cause as an error.
    ///
    /// Pends forever for a background signal.
    pub async fn done(&self) -> ManagerError {
        if let Some(err) = self.err() {
            return err;
        }

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => ManagerError::Cancelled,
                    _ = sleep_until(deadline) => ManagerError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ManagerError::Cancelled
            }
        }
    }
}
