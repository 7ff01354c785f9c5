// server/src/main.rs
//! Thin HTTP/WebSocket surface over the ledger + payout engine. Everything
//! that matters — balance invariants, idempotent admission, retry
//! semantics — lives in `ledger-engine-core`; this binary just exposes it.

use std::sync::Arc;

use axum::{
    extract::{Path, State, ws::{Message, WebSocket, WebSocketUpgrade}},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_engine_core::adapters::memory::MemoryBackend;
use ledger_engine_core::adapters::postgres::PostgresBackend;
use ledger_engine_core::external::SimulatedPayoutProvider;
use ledger_engine_core::store::PgStore;
use ledger_engine_core::task_runner::{InMemoryJobQueue, Job, JobKind, JobQueue, TaskRunner};
use ledger_engine_core::{config::Config, Amount, Backend, EventLog, Ledger, NewPayout, PayoutEngine, Projector};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Clone)]
struct AppState {
    engine: Arc<PayoutEngine>,
    queue: Arc<InMemoryJobQueue>,
    backend: Arc<dyn Backend>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "falling back to in-memory backend, no DATABASE_URL configured");
            run_with_memory_backend().await;
            return;
        }
    };

    let store = PgStore::connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    store.init_schema().await.expect("failed to init schema");

    let backend: Arc<dyn Backend> = Arc::new(PostgresBackend::new(store));
    serve(backend).await;
}

async fn run_with_memory_backend() {
    let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
    serve(backend).await;
}

async fn serve(backend: Arc<dyn Backend>) {
    ledger_engine_core::bootstrap::seed_accounts(&backend)
        .await
        .expect("failed to seed accounts");

    let event_log = Arc::new(EventLog::new(backend.clone()));
    let ledger = Arc::new(Ledger::new(backend.clone()));
    let projector = Arc::new(Projector::new(backend.clone()));
    let engine = Arc::new(PayoutEngine::new(
        backend.clone(),
        event_log,
        ledger,
        projector,
    ));
    let queue: Arc<InMemoryJobQueue> = Arc::new(InMemoryJobQueue::new());
    let provider = Arc::new(SimulatedPayoutProvider::new());
    let runner = Arc::new(TaskRunner::new(
        queue.clone(),
        engine.clone(),
        provider,
    ));

    tokio::spawn(background_worker_loop(runner));

    let state = AppState {
        engine,
        queue,
        backend,
    };

    let app = Router::new()
        .route("/api/payouts", post(create_payout))
        .route("/api/payouts/:id", get(get_payout))
        .route("/api/ws", get(ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .expect("failed to bind listener");
    info!("listening on 0.0.0.0:8080");
    axum::serve(listener, app).await.expect("server error");
}

/// Polls the in-memory queue on a fixed cadence. A real deployment would
/// replace this with however the host's actual task broker delivers
/// work; `TaskRunner::run_once` itself doesn't care either way.
async fn background_worker_loop(runner: Arc<TaskRunner>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(500));
    loop {
        interval.tick().await;
        if let Err(e) = runner.run_once().await {
            error!(error = %e, "task runner iteration failed");
        }
    }
}

#[derive(Deserialize)]
struct CreatePayoutRequest {
    idempotency_key: String,
    amount: String,
    #[serde(default)]
    currency: String,
    recipient_account: String,
    recipient_name: String,
    description: String,
}

fn error_response(err: &ledger_engine_core::EngineError) -> Response {
    use ledger_engine_core::EngineError;
    let status = match err {
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::NotFound(_) | EngineError::UnknownAccount(_) => StatusCode::NOT_FOUND,
        EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::InvariantViolation(_) | EngineError::Transient(_) | EngineError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

async fn create_payout(
    State(state): State<AppState>,
    Json(req): Json<CreatePayoutRequest>,
) -> Response {
    let amount = match Amount::parse(&req.amount) {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };

    let already_existed = matches!(
        state.engine.get_by_idempotency_key(&req.idempotency_key).await,
        Ok(Some(_))
    );

    let new_payout = NewPayout {
        idempotency_key: req.idempotency_key,
        amount,
        currency: req.currency,
        recipient_account: req.recipient_account,
        recipient_name: req.recipient_name,
        description: req.description,
        metadata: serde_json::json!({}),
    };

    match state.engine.admit(new_payout).await {
        Ok(payout) => {
            if !already_existed {
                let _ = state
                    .queue
                    .enqueue(Job::new(payout.id, JobKind::ProcessPayout))
                    .await;
            }
            let status = if already_existed {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, Json(payout)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn get_payout(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.engine.get(id).await {
        Ok(Some(payout)) => Json(payout).into_response(),
        Ok(None) => {
            (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_stream_events(socket, state))
}

/// Streams newly-appended events to the client, polling the event log
/// since the demo doesn't wire up a pub/sub fan-out for this layer.
async fn ws_stream_events(mut socket: WebSocket, state: AppState) {
    let mut last_seen = 0i64;
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(500));
    loop {
        interval.tick().await;
        let events = match state.backend.read_events_after(last_seen, 50).await {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "failed to read events for websocket stream");
                continue;
            }
        };
        for event in events {
            last_seen = event.sequence_number;
            let payload = match serde_json::to_string(&event) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if socket.send(Message::Text(payload)).await.is_err() {
                return;
            }
        }
    }
}
