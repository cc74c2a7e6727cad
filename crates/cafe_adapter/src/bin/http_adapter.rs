#![forbid(unsafe_code)]

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use cafe_adapter::{AdapterHealthResponse, AdapterRuntime};
use cafe_kernel_contracts::dialog::{FulfillmentRequest, TurnInput, TurnOutput};
use cafe_kernel_contracts::session::SessionAttributes;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let runtime = Arc::new(AdapterRuntime::default_from_env()?);
    let addr = runtime.config().http_bind;

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/chat/turn", post(run_turn))
        .route("/v1/chat/fulfillment", post(run_fulfillment))
        .with_state(runtime);

    tracing::info!(%addr, "cafe_adapter_http listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn healthz(
    State(runtime): State<Arc<AdapterRuntime>>,
) -> (StatusCode, Json<AdapterHealthResponse>) {
    (StatusCode::OK, Json(runtime.health_report()))
}

async fn run_turn(
    State(runtime): State<Arc<AdapterRuntime>>,
    Json(input): Json<TurnInput>,
) -> (StatusCode, Json<TurnOutput>) {
    let attrs = input.session_attributes.clone();
    let worker = runtime.clone();
    let joined = tokio::task::spawn_blocking(move || worker.run_turn(input)).await;
    turn_response(&runtime, attrs, joined)
}

async fn run_fulfillment(
    State(runtime): State<Arc<AdapterRuntime>>,
    Json(request): Json<FulfillmentRequest>,
) -> (StatusCode, Json<TurnOutput>) {
    let attrs = request.session_attributes.clone();
    let worker = runtime.clone();
    let joined = tokio::task::spawn_blocking(move || worker.run_fulfillment(request)).await;
    turn_response(&runtime, attrs, joined)
}

/// A turn task that dies still answers the channel with the localized apology.
fn turn_response(
    runtime: &AdapterRuntime,
    attrs: SessionAttributes,
    joined: Result<TurnOutput, tokio::task::JoinError>,
) -> (StatusCode, Json<TurnOutput>) {
    match joined {
        Ok(output) => (StatusCode::OK, Json(output)),
        Err(err) => {
            tracing::error!(error = %err, "turn task did not complete");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(runtime.apology(attrs)))
        }
    }
}
