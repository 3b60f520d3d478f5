use crate::models::{ClientRequest, ServerEvent};
use crate::session::Session;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};

/// WebSocket handler for chat clients
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (conn, mut outbound) = state.hub.register();
    tracing::debug!(conn, "Connection opened");

    // Event forwarding task
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            match serde_json::to_string(&event) {
                Ok(msg) => {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize event: {}", e);
                }
            }
        }
    });

    state.coordinator.on_connect(conn).await;

    // Requests are handled one at a time; the session never leaves this task
    let mut session = Session::new();
    loop {
        let msg = tokio::select! {
            msg = receiver.next() => msg,
            _ = &mut send_task => {
                tracing::debug!(conn, "Send task completed");
                break;
            }
        };

        match msg {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientRequest>(&text) {
                Ok(request) => state.coordinator.handle(conn, &mut session, request).await,
                Err(e) => {
                    tracing::debug!(conn, "Unparseable client frame: {}", e);
                    state
                        .hub
                        .send_to(conn, ServerEvent::error(format!("Invalid request: {e}")));
                }
            },
            Some(Ok(Message::Ping(data))) => {
                // Pong is handled automatically by axum
                tracing::trace!("Received ping: {:?}", data);
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!(conn, "WebSocket error: {}", e);
                break;
            }
        }
    }

    state.coordinator.disconnect(conn, &mut session).await;
    send_task.abort();
}
