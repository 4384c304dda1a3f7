//! hashex: asynchronous password hashing over HTTP.
//!
//! Wiring only. The pieces:
//! - `hashex_core::Manager` runs tasks in the background, tracked by id
//! - `api` layers the HTTP API onto the manager, `hash_task` does the hashing
//! - `stats` times the submit endpoint
//! - `server` serves and shuts down gracefully

mod api;
mod config;
mod hash_task;
mod server;
mod stats;

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::{Args, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from(Args::parse());
    let listener = TcpListener::bind(config.addr).await?;

    let state = Arc::new(AppState::new(config));
    tokio::spawn(server::watch_signals(state.shutdown.clone()));

    server::serve(listener, state).await
}
