//! Serving and graceful shutdown.
//!
//! Shutdown sequence, once `AppState::shutdown` is cancelled:
//! 1. the task manager stops accepting hashes (new submissions get 503)
//! 2. running hashes are drained, results stay retrievable meanwhile
//! 3. the listener closes and in-flight requests finish

use std::sync::Arc;

use hashex_core::CancelSignal;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::{AppState, router};

/// Serve until a shutdown is triggered and completed.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "starting hash API server");

    let app = router(Arc::clone(&state));
    axum::serve(listener, app)
        .with_graceful_shutdown(drain_tasks(state))
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves once a shutdown was triggered and the task manager has drained
/// (or the drain timeout passed).
pub async fn drain_tasks(state: Arc<AppState>) {
    state.shutdown.cancelled().await;
    info!(
        in_flight = state.tasks.in_flight(),
        "waiting for running tasks to finish"
    );

    let mut signal = CancelSignal::background();
    if let Some(timeout) = state.config.drain_timeout {
        signal = signal.with_timeout(timeout);
    }

    match state.tasks.shutdown(&signal).await {
        Ok(()) => info!("all tasks finished"),
        Err(err) => warn!(
            error = %err,
            in_flight = state.tasks.in_flight(),
            "stopped waiting for running tasks"
        ),
    }
}

/// Trigger `shutdown` on Ctrl+C or SIGTERM.
///
/// The first signal starts a graceful shutdown; a second Ctrl+C exits
/// immediately.
pub async fn watch_signals(shutdown: CancellationToken) {
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(err) = res {
                error!(error = %err, "cannot listen for Ctrl+C");
                return;
            }
            info!("received Ctrl+C, shutting down");
        }
        _ = terminate() => info!("received SIGTERM, shutting down"),
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("received second Ctrl+C, exiting immediately");
        std::process::exit(1);
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(err) => {
            error!(error = %err, "cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use hashex_core::{ManagerError, ManagerState};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::time::{Instant, timeout};

    use crate::config::ServerConfig;
    use crate::hash_task::HashTask;

    fn state_with(hash_delay: Duration, drain_timeout: Option<Duration>) -> Arc<AppState> {
        Arc::new(AppState::new(ServerConfig {
            hash_delay,
            drain_timeout,
            ..ServerConfig::default()
        }))
    }

    #[tokio::test]
    async fn drain_waits_for_running_hashes() {
        let state = state_with(Duration::ZERO, None);
        let id = state
            .tasks
            .start(HashTask::new("x").with_delay(Duration::from_millis(100)))
            .unwrap();

        let drain = tokio::spawn(drain_tasks(Arc::clone(&state)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!drain.is_finished(), "drain must wait for a shutdown trigger");

        state.shutdown.cancel();
        timeout(Duration::from_secs(2), drain).await.unwrap().unwrap();

        assert_eq!(state.tasks.state(), ManagerState::Stopped);
        assert!(matches!(
            state.tasks.start(HashTask::new("y")),
            Err(ManagerError::ShuttingDown)
        ));
        let out = state
            .tasks
            .wait(id, &CancelSignal::background())
            .await
            .unwrap();
        assert!(out.is_string());
    }

    #[tokio::test]
    async fn drain_gives_up_after_its_timeout() {
        let state = state_with(Duration::ZERO, Some(Duration::from_millis(20)));
        state
            .tasks
            .start(HashTask::new("x").with_delay(Duration::from_millis(400)))
            .unwrap();

        state.shutdown.cancel();
        let start = Instant::now();
        drain_tasks(Arc::clone(&state)).await;

        assert!(start.elapsed() < Duration::from_millis(300));
        assert_eq!(state.tasks.state(), ManagerState::Draining);
    }

    async fn http(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn serves_until_shutdown_endpoint_is_hit() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = state_with(Duration::ZERO, None);
        let server = tokio::spawn(serve(listener, Arc::clone(&state)));

        let body = "password=angryMonkey";
        let submit = format!(
            "POST /hash HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let response = http(addr, &submit).await;
        assert!(response.starts_with("HTTP/1.1 202"), "{response}");
        assert!(response.ends_with("\r\n\r\n1"), "{response}");

        let response = http(
            addr,
            "GET /hash/1 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("ZEHhWB65"), "{response}");

        let response = http(
            addr,
            "GET /shutdown HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.ends_with("Shutting down"), "{response}");

        timeout(Duration::from_secs(2), server)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
        assert_eq!(state.tasks.state(), ManagerState::Stopped);
    }
}
