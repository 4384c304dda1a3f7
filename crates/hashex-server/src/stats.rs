//! Timing statistics for an endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;
use serde::Serialize;

/// Accumulated calls to one endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    pub calls: u64,
    pub elapsed: Duration,
}

impl CallStats {
    pub fn add(&mut self, elapsed: Duration) {
        self.calls += 1;
        self.elapsed += elapsed;
    }

    /// Mean time per call, zero before the first call.
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            return Duration::ZERO;
        }
        // Durations divide by u32; totals past u32::MAX calls fall back to nanos.
        match u32::try_from(self.calls) {
            Ok(calls) => self.elapsed / calls,
            Err(_) => Duration::from_nanos((self.elapsed.as_nanos() / self.calls as u128) as u64),
        }
    }
}

/// Response body of `GET /stats`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatsReport {
    pub total: u64,
    /// Microseconds.
    pub average: u64,
}

impl From<CallStats> for StatsReport {
    fn from(stats: CallStats) -> Self {
        Self {
            total: stats.calls,
            average: stats.average().as_micros() as u64,
        }
    }
}

/// Thread-safe tracker shared between the middleware and the report handler.
#[derive(Debug, Default)]
pub struct EndpointStats {
    stats: Mutex<CallStats>,
}

impl EndpointStats {
    pub fn record(&self, elapsed: Duration) {
        self.stats.lock().add(elapsed);
    }

    pub fn snapshot(&self) -> CallStats {
        *self.stats.lock()
    }
}

/// Middleware timing every request that passes through it.
pub async fn track(State(stats): State<Arc<EndpointStats>>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(req).await;
    stats.record(start.elapsed());
    response
}
