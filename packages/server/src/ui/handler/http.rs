//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};

use crate::{infrastructure::dto::websocket::UserDto, ui::state::AppState};

use super::websocket::{ConnectQuery, credentials_from_request};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Users currently online, in the same order as the `online_users` push
pub async fn online_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserDto>>, StatusCode> {
    let credentials = credentials_from_request(query, &headers);
    if state
        .authenticate_usecase
        .execute(&credentials)
        .await
        .is_none()
    {
        return Err(StatusCode::UNAUTHORIZED);
    }

    match state.broadcast_online_users_usecase.online_users().await {
        // Domain Model から DTO への変換
        Ok(users) => Ok(Json(users.iter().map(UserDto::from).collect())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load online users");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
