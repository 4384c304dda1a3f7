//! The hashing task run behind `POST /hash`.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hashex_core::{Task, TaskError, TaskOutput};
use sha2::{Digest, Sha512};

/// How long a hash takes by default.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// Hashes a password: SHA-512, base64-encoded, returned as a JSON string.
///
/// `run` first sleeps for `delay` (the service deliberately answers slowly).
#[derive(Clone)]
pub struct HashTask {
    password: String,
    delay: Duration,
}

impl HashTask {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            delay: DEFAULT_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for HashTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashTask")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl Task for HashTask {
    fn run(&self) -> Result<TaskOutput, TaskError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(hash_password(&self.password).into())
    }
}

fn hash_password(password: &str) -> String {
    let digest = Sha512::digest(password.as_bytes());
    STANDARD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const ANGRY_MONKEY: &str =
        "ZEHhWB65gUlzdVwtDQArEyx+KVLzp/aTaRaPlBzYRIFj6vjFdqEb0Q5B8zVKCZ0vKbZPZklJz0Fd7su2A+gf7Q==";

    #[test]
    fn computes_base64_sha512_as_a_string() {
        let out = HashTask::new("angryMonkey")
            .with_delay(Duration::ZERO)
            .run()
            .unwrap();
        assert_eq!(out.as_str(), Some(ANGRY_MONKEY));
    }

    #[test]
    fn sleeps_for_its_delay() {
        let delay = Duration::from_millis(30);
        let start = Instant::now();
        HashTask::new("xyz").with_delay(delay).run().unwrap();
        assert!(start.elapsed() >= delay);
    }

    #[test]
    fn defaults_to_five_seconds() {
        assert_eq!(HashTask::new("xyz").delay, Duration::from_secs(5));
    }

    #[test]
    fn debug_does_not_leak_the_password() {
        let shown = format!("{:?}", HashTask::new("hunter2"));
        assert!(!shown.contains("hunter2"));
    }
}
