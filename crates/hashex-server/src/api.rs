//! HTTP front-end to the task manager.
//!
//! - `POST /hash`      -> starts a hash, responds with the task id
//! - `GET  /hash/{id}` -> waits for the hash and responds with it
//! - `GET  /stats`     -> timing of `POST /hash`
//! - `/shutdown`       -> starts a graceful shutdown
//!
//! Only HTTP translation lives here; the work itself is [`HashTask`].

use std::sync::Arc;

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Form, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{any, get, post};
use axum::{Router, middleware};
use hashex_core::{CancelSignal, Manager, ManagerError, TaskId, TaskOutput};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::config::ServerConfig;
use crate::hash_task::HashTask;
use crate::stats::{self, EndpointStats, StatsReport};

const INTERNAL_ERROR: &str = "Sorry, something went wrong.";

/// Shared application state.
pub struct AppState {
    pub config: ServerConfig,
    pub tasks: Manager,
    pub stats: Arc<EndpointStats>,
    /// Cancelled to start a graceful shutdown.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            tasks: Manager::new(),
            stats: Arc::new(EndpointStats::default()),
            shutdown: CancellationToken::new(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let submit = post(start_hash).route_layer(middleware::from_fn_with_state(
        Arc::clone(&state.stats),
        stats::track,
    ));

    Router::new()
        .route("/hash", submit)
        .route("/hash/{id}", get(get_result))
        .route("/stats", get(get_stats))
        .route("/shutdown", any(request_shutdown))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct HashForm {
    #[serde(default)]
    password: String,
}

/// The password is read from the form body, falling back to the query string.
async fn start_hash(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HashForm>, QueryRejection>,
    form: Result<Form<HashForm>, FormRejection>,
) -> Response {
    let from_body = form.ok().map(|Form(form)| form.password);
    let from_query = query.ok().map(|Query(query)| query.password);
    let Some(password) = from_body
        .into_iter()
        .chain(from_query)
        .find(|password| !password.is_empty())
    else {
        return (StatusCode::BAD_REQUEST, "Missing password form field").into_response();
    };

    let task = HashTask::new(password).with_delay(state.config.hash_delay);
    match state.tasks.start(task) {
        Ok(id) => {
            debug!(task_id = %id, "hash started");
            (StatusCode::ACCEPTED, id.to_string()).into_response()
        }
        Err(ManagerError::ShuttingDown) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Unable to accept new requests: the server is shutting down.",
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "attempting to start new hash");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR).into_response()
        }
    }
}

/// Blocks until the hash is ready, the result timeout passes, or the client
/// goes away (which drops this future).
async fn get_result(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<TaskId>() else {
        return no_such_task();
    };

    let mut signal = CancelSignal::background();
    if let Some(timeout) = state.config.result_timeout {
        signal = signal.with_timeout(timeout);
    }

    match state.tasks.wait(id, &signal).await {
        Ok(result) => json_line(&result),
        Err(ManagerError::NoSuchTask(_)) => no_such_task(),
        Err(err) if err.is_cancellation() => (
            StatusCode::REQUEST_TIMEOUT,
            "Request failed, please try again.",
        )
            .into_response(),
        Err(err) => {
            error!(task_id = %id, error = %err, "failure waiting for task");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR).into_response()
        }
    }
}

/// JSON body terminated by a newline.
fn json_line(value: &TaskOutput) -> Response {
    match serde_json::to_vec(value) {
        Ok(mut body) => {
            body.push(b'\n');
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Err(err) => {
            error!(error = %err, "encoding task result");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR).into_response()
        }
    }
}

fn no_such_task() -> Response {
    (StatusCode::NOT_FOUND, "No such task").into_response()
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsReport> {
    Json(StatsReport::from(state.stats.snapshot()))
}

async fn request_shutdown(State(state): State<Arc<AppState>>) -> &'static str {
    state.shutdown.cancel();
    "Shutting down"
}
