//! Single websocket endpoint relaying the kernel's push-channel events.
//! Pass-through only: every subscriber gets the whole `All` subject and
//! serializes events as they arrive.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use fleetd::services::push_hub::Subject;
use tracing::debug;

use crate::routes::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(kernel): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay(socket, kernel))
}

async fn relay(mut socket: WebSocket, kernel: AppState) {
    let subscriber = kernel.push_hub.subscribe([Subject::All]).await;

    loop {
        tokio::select! {
            event = subscriber.recv() => {
                let Some(event) = event else { break };
                let Ok(payload) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(error = %e, "websocket read error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    subscriber.unsubscribe().await;
}
