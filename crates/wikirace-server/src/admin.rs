//! Read-only admin debug surface.
//!
//! A small HTTP listener, separate from the game port, exposing room
//! listings and a single room's full state. Gated by the `x-admin-secret`
//! header; not part of the client contract.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::Mutex;
use wikirace_engine::RoomRegistry;
use wikirace_protocol::RoomId;

use crate::ServerError;

const SECRET_HEADER: &str = "x-admin-secret";

#[derive(Clone)]
struct AdminState {
    registry: Arc<Mutex<RoomRegistry>>,
    secret: String,
}

/// Builds the admin router.
pub fn router(registry: Arc<Mutex<RoomRegistry>>, secret: String) -> Router {
    Router::new()
        .route("/rooms", get(overview))
        .route("/rooms/{room_id}", get(room_detail))
        .with_state(AdminState { registry, secret })
}

/// Serves the admin router on its own listener until the process exits.
pub async fn serve(
    bind: String,
    registry: Arc<Mutex<RoomRegistry>>,
    secret: String,
) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(addr = %bind, "admin surface listening");
    axum::serve(listener, router(registry, secret)).await?;
    Ok(())
}

fn authorized(state: &AdminState, headers: &HeaderMap) -> bool {
    headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == state.secret)
}

async fn overview(State(state): State<AdminState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"error": "unauthorized"})))
            .into_response();
    }
    let rooms = state.registry.lock().await.overview().await;
    let data: Vec<_> = rooms
        .iter()
        .map(|info| {
            serde_json::json!({
                "roomId": info.room_id,
                "state": info.state,
                "connected": info.connected,
                "updated": info.updated,
            })
        })
        .collect();
    Json(serde_json::json!({ "data": data })).into_response()
}

async fn room_detail(
    State(state): State<AdminState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"error": "unauthorized"})))
            .into_response();
    }
    let room_id = RoomId(room_id);
    let handle = state.registry.lock().await.get(&room_id);
    let snapshot = match handle {
        Some(handle) => handle.snapshot().await.ok(),
        None => None,
    };
    match snapshot {
        Some(snapshot) => Json(serde_json::json!({ "data": snapshot })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("Room {room_id} is not found") })),
        )
            .into_response(),
    }
}
