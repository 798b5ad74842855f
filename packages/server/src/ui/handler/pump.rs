//! The two per-connection loops.
//!
//! The inbound pump is the only reader of a socket and the outbound pump the
//! only writer: each owns exactly one half of the split socket. Both end in
//! the same idempotent teardown.

use std::{fmt::Display, sync::Arc, time::Duration};

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};

use crate::{
    domain::{Connection, OutboundQueue},
    infrastructure::dto::websocket::decode_client_event,
    usecase::{DisconnectUserUseCase, RouteMessageUseCase},
};

/// Reads frames and hands them to the router.
pub struct InboundPump {
    connection: Arc<Connection>,
    router: Arc<RouteMessageUseCase>,
    teardown: Arc<DisconnectUserUseCase>,
    max_frame_bytes: usize,
}

impl InboundPump {
    pub fn new(
        connection: Arc<Connection>,
        router: Arc<RouteMessageUseCase>,
        teardown: Arc<DisconnectUserUseCase>,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            connection,
            router,
            teardown,
            max_frame_bytes,
        }
    }

    /// Run until the peer goes away, a read fails, or the connection is closed.
    pub async fn run<S, E>(self, mut stream: S)
    where
        S: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let user_id = self.connection.user_id();

        loop {
            let frame = tokio::select! {
                _ = self.connection.closed() => break,
                frame = stream.next() => frame,
            };

            let text = match frame {
                None => {
                    tracing::debug!(%user_id, "Inbound stream ended");
                    break;
                }
                Some(Err(e)) => {
                    tracing::info!(%user_id, error = %e, "WebSocket read failed");
                    break;
                }
                Some(Ok(Message::Text(text))) => text.as_str().to_string(),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        tracing::warn!(%user_id, "Dropped non UTF-8 binary frame");
                        continue;
                    }
                },
                Some(Ok(Message::Close(_))) => {
                    tracing::debug!(%user_id, "Client requested close");
                    break;
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            };

            if text.len() > self.max_frame_bytes {
                tracing::warn!(
                    %user_id,
                    size = text.len(),
                    max = self.max_frame_bytes,
                    "Inbound frame too large, closing connection"
                );
                break;
            }

            self.handle_text(&text).await;
        }

        self.teardown.execute(&self.connection).await;
    }

    async fn handle_text(&self, text: &str) {
        let user_id = self.connection.user_id();

        let event = match decode_client_event(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Dropped undecodable frame");
                return;
            }
        };

        let tag = event.tag().to_string();
        tracing::debug!(%user_id, %tag, "Routing inbound frame");
        if let Err(e) = self.router.execute(user_id, event).await {
            tracing::warn!(%user_id, %tag, error = %e, "Failed to route message");
        }
    }
}

/// Drains the outbound queue into the socket.
pub struct OutboundPump {
    connection: Arc<Connection>,
    queue: OutboundQueue,
    teardown: Arc<DisconnectUserUseCase>,
    close_grace: Duration,
}

impl OutboundPump {
    pub fn new(
        connection: Arc<Connection>,
        queue: OutboundQueue,
        teardown: Arc<DisconnectUserUseCase>,
        close_grace: Duration,
    ) -> Self {
        Self {
            connection,
            queue,
            teardown,
            close_grace,
        }
    }

    /// Write queued frames in order. Once the queue is closed and drained a
    /// close frame is sent; a failed write ends the connection.
    ///
    /// After teardown the pump gets `close_grace` to finish. When that runs
    /// out, a write still pending is abandoned and the sink is dropped.
    pub async fn run<S>(mut self, mut sink: S)
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
    {
        let user_id = self.connection.user_id();
        let connection = self.connection.clone();
        let close_grace = self.close_grace;
        let deadline = async move {
            connection.terminated().await;
            tokio::time::sleep(close_grace).await;
        };

        tokio::select! {
            _ = self.drain(&mut sink) => {}
            _ = deadline => {
                tracing::info!(%user_id, "Socket write did not finish after teardown, dropping it");
            }
        }
        drop(sink);

        // Eviction closes the queue without going through teardown.
        self.teardown.execute(&self.connection).await;
    }

    async fn drain<S>(&mut self, sink: &mut S)
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
    {
        let user_id = self.connection.user_id();

        while let Some(frame) = self.queue.next().await {
            if let Err(e) = sink.send(Message::Text(frame.into())).await {
                tracing::info!(%user_id, error = %e, "WebSocket write failed");
                return;
            }
        }

        if let Err(e) = sink.send(Message::Close(None)).await {
            tracing::debug!(%user_id, error = %e, "Failed to send close frame");
        }
        let _ = sink.close().await;
    }
}
