//! HTTP surface: the scoring endpoint an orchestrator calls during
//! extender-aware scheduling, plus a couple of operational diagnostics.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info};

use crate::cache::LoadCache;
use crate::config::Config;
use crate::driver;
use crate::model::{ExtenderArgs, ResourceKind};

pub struct AppState {
    pub config: Config,
    pub cache: Arc<LoadCache>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/prioritizeVerb", post(prioritize))
        .route("/v1/ping", get(ping))
        .route("/v1/test/cache", get(cache_snapshot))
        .with_state(state)
}

async fn ping() -> &'static str {
    "ok"
}

async fn prioritize(State(state): State<Arc<AppState>>, Json(args): Json<ExtenderArgs>) -> Response {
    info!(candidates = args.resolved_node_names().len(), "scoring request received");
    match driver::score(&state.config, &state.cache, &args) {
        Ok(list) => Json(list).into_response(),
        Err(err) => {
            error!(error = %err, "scoring failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn cache_snapshot(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.cache.snapshot();
    let mut known_hosts: Vec<String> = Vec::new();
    let mut body: serde_json::Map<String, serde_json::Value> = snapshot
        .into_iter()
        .map(|(kind, sample): (ResourceKind, _)| {
            known_hosts.extend(sample.keys().cloned());
            (kind.to_string(), serde_json::to_value(&*sample).unwrap_or(serde_json::Value::Null))
        })
        .collect();
    known_hosts.sort();
    known_hosts.dedup();

    let unscorable = driver::unknown_candidates(&state.config.capacity, &known_hosts);
    body.insert(
        "unknown_to_capacity_table".to_string(),
        serde_json::to_value(unscorable).unwrap_or(serde_json::Value::Null),
    );
    body.insert(
        "last_committed".to_string(),
        state
            .cache
            .last_committed()
            .map(|ts| serde_json::Value::String(ts.to_rfc3339()))
            .unwrap_or(serde_json::Value::Null),
    );
    Json(serde_json::Value::Object(body))
}
