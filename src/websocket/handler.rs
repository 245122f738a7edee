//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::messages::{ClientMessage, ServerMessage};
use crate::api::AppState;

/// WebSocket upgrade handler
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            None
        }
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let hub = Arc::clone(&state.ws_hub);
    let (mut sender, mut receiver) = socket.split();

    // Create channel for sending messages to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = match hub.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register WebSocket connection");
            if let Some(msg) = encode(&ServerMessage::Error { message: e.to_string() }) {
                let _ = sender.send(msg).await;
            }
            return;
        }
    };

    // Already subscribed to notifications, so changes after this snapshot are queued
    let greeting = [
        ServerMessage::Connected {
            connection_id: connection_id.clone(),
        },
        ServerMessage::Stack {
            notifications: state.sink.visible().await,
        },
    ];
    for message in &greeting {
        let Some(msg) = encode(message) else {
            continue;
        };
        if sender.send(msg).await.is_err() {
            tracing::error!(connection_id = %connection_id, "Failed to send greeting");
            hub.unregister(&connection_id).await;
            return;
        }
    }

    let conn_id_for_send = connection_id.clone();

    // Forward messages from the channel to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let Some(msg) = encode(&message) else {
                continue;
            };
            if sender.send(msg).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let state_for_recv = Arc::clone(&state);
    let conn_id_for_recv = connection_id.clone();

    // Receive messages from the WebSocket and handle them
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&state_for_recv, &conn_id_for_recv, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    hub.unregister(&connection_id).await;
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(state: &AppState, connection_id: &str, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_client_message(state, connection_id, client_msg).await,
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        text = %text,
                        "Invalid client message"
                    );
                    let error_msg = ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    };
                    let _ = state.ws_hub.send_to(connection_id, error_msg).await;
                }
            }
            true
        }
        Message::Binary(_) => {
            let error_msg = ServerMessage::Error {
                message: "Binary messages not supported".to_string(),
            };
            let _ = state.ws_hub.send_to(connection_id, error_msg).await;
            true
        }
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

/// Handle a parsed client message
async fn handle_client_message(state: &AppState, connection_id: &str, message: ClientMessage) {
    let hub = &state.ws_hub;

    let response = match message {
        ClientMessage::Subscribe { topics } => match hub.subscribe(connection_id, topics).await {
            Ok(subscribed) => ServerMessage::Subscribed { topics: subscribed },
            Err(e) => {
                tracing::error!(connection_id = %connection_id, error = %e, "Subscribe error");
                ServerMessage::Error { message: e.to_string() }
            }
        },
        ClientMessage::Unsubscribe { topics } => match hub.unsubscribe(connection_id, topics).await {
            Ok(unsubscribed) => ServerMessage::Unsubscribed { topics: unsubscribed },
            Err(e) => {
                tracing::error!(connection_id = %connection_id, error = %e, "Unsubscribe error");
                ServerMessage::Error { message: e.to_string() }
            }
        },
        ClientMessage::Dismiss { id } => {
            // Success is announced to subscribers through the sink events
            if state.sink.dismiss(&id).await {
                return;
            }
            ServerMessage::Error {
                message: format!("Notification {} is not visible", id),
            }
        }
        ClientMessage::Ping => ServerMessage::Pong,
    };

    let _ = hub.send_to(connection_id, response).await;
}
