//! Command-line configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;

use crate::hash_task::DEFAULT_DELAY;

/// Asynchronous password hashing service.
#[derive(Debug, Parser)]
#[command(name = "hashex", version, about)]
pub struct Args {
    /// Port to serve on.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// IP to bind to. The default serves only the local machine; use 0.0.0.0
    /// for all interfaces.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// Artificial delay before each hash is computed, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_DELAY.as_millis() as u64)]
    pub hash_delay_ms: u64,

    /// Give up waiting for a result after this many seconds (408). Unset waits
    /// as long as the client stays connected.
    #[arg(long)]
    pub result_timeout_secs: Option<u64>,

    /// Stop waiting for running hashes after this many seconds on shutdown.
    /// Unset waits for all of them.
    #[arg(long)]
    pub drain_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub hash_delay: Duration,
    pub result_timeout: Option<Duration>,
    pub drain_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            hash_delay: DEFAULT_DELAY,
            result_timeout: None,
            drain_timeout: None,
        }
    }
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            addr: SocketAddr::new(args.bind, args.port),
            hash_delay: Duration::from_millis(args.hash_delay_ms),
            result_timeout: args.result_timeout_secs.map(Duration::from_secs),
            drain_timeout: args.drain_timeout_secs.map(Duration::from_secs),
        }
    }
}
