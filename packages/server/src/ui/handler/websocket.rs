//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, COOKIE},
    },
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use serde::Deserialize;

use crate::{
    domain::{Connection, UserId},
    ui::state::AppState,
    usecase::Credentials,
};

use super::pump::{InboundPump, OutboundPump};

const SESSION_COOKIE: &str = "session_id";

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// Collect credentials in the order they are tried: query, cookie, bearer.
pub fn credentials_from_request(query: ConnectQuery, headers: &HeaderMap) -> Credentials {
    Credentials {
        query_token: query.token,
        cookie_session: cookie_value(headers, SESSION_COOKIE),
        bearer: bearer_token(headers),
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Response {
    let credentials = credentials_from_request(query, &headers);
    let Some(user_id) = state.authenticate_usecase.execute(&credentials).await else {
        tracing::warn!("Rejected unauthenticated WebSocket connection");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    ws.max_message_size(state.config.max_frame_bytes)
        .on_failed_upgrade(move |e| {
            tracing::warn!(%user_id, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let (connection, queue) = Connection::open(user_id, state.config.outbound_queue_capacity);
    tracing::debug!(%user_id, connection_id = %connection.id(), "WebSocket upgraded");

    // 古い接続はここで閉じられる
    state.connect_user_usecase.execute(connection.clone()).await;

    let (sink, stream) = socket.split();

    let outbound = OutboundPump::new(
        connection.clone(),
        queue,
        state.disconnect_user_usecase.clone(),
        state.config.close_grace,
    );
    let inbound = InboundPump::new(
        connection,
        state.route_message_usecase.clone(),
        state.disconnect_user_usecase.clone(),
        state.config.max_frame_bytes,
    );

    let send_task = tokio::spawn(outbound.run(sink));
    inbound.run(stream).await;

    // teardown 後は close_grace 以内に送信ポンプが終わる
    if let Err(e) = send_task.await {
        tracing::error!(%user_id, error = %e, "Outbound pump panicked");
    }
}
