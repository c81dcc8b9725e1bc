use crate::{
    websocket::{
        messages::{ClientMessage, ServerMessage},
        session::{GameSession, SessionCommand},
    },
    AppState, SessionInfo,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// WebSocket upgrade handler
pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(100);

    let session_id = Uuid::new_v4();
    let (session, commands) = GameSession::new(session_id, state.clone(), tx.clone());
    state.sessions.insert(session_id, SessionInfo::new());
    tracing::info!("WebSocket session {} established", session_id);

    let mut session_task = tokio::spawn(session.run());

    // Spawn a task to send messages to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize message: {}", e);
                }
            }
        }
    });

    // Handle incoming messages from the client
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        if commands
                            .send(SessionCommand::Client(client_msg))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!("Failed to parse message: {}", e);
                        let error_msg = ServerMessage::Error {
                            message: format!("Invalid message format: {}", e),
                        };
                        let _ = tx.send(error_msg).await;
                    }
                },
                Message::Close(_) => {
                    tracing::info!("Client {} disconnected", session_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for any task to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            session_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
            session_task.abort();
        }
        _ = (&mut session_task) => {
            send_task.abort();
            recv_task.abort();
        }
    }

    state.sessions.remove(&session_id);
    tracing::info!("WebSocket session {} closed", session_id);
}
