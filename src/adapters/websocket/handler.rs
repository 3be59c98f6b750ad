//! WebSocket upgrade handler for task notification connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Read the handshake token when the registry requires one
//! 2. Register the session (refusals close with code 1008)
//! 3. Join the room named in the path and send `connected`
//! 4. On a task-status socket, push the task's status if it already finished
//! 5. Dispatch client events and drain routed frames until disconnect
//! 6. Deregister from every room before the transport is released

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};

use crate::domain::foundation::{ConnectionId, RoomId, TaskId};
use crate::domain::realtime::{ChannelMessage, Room};
use crate::ports::TaskQueue;

use super::{
    dispatch::EventDispatcher,
    messages::{ClientFrame, ConnectedMessage, HandshakeFrame, ServerMessage},
    registry::SessionRegistry,
    router::RoomEventRouter,
};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub router: Arc<RoomEventRouter>,
    pub dispatcher: Arc<EventDispatcher>,
    /// Read once per task-status socket to catch up on finished tasks.
    pub queue: Arc<dyn TaskQueue>,
    /// How long an authenticated connection may take to send its token.
    pub handshake_timeout: Duration,
}

impl WebSocketState {
    pub fn new(
        router: Arc<RoomEventRouter>,
        dispatcher: Arc<EventDispatcher>,
        queue: Arc<dyn TaskQueue>,
        handshake_timeout: Duration,
    ) -> Self {
        Self {
            router,
            dispatcher,
            queue,
            handshake_timeout,
        }
    }

    fn registry(&self) -> &Arc<SessionRegistry> {
        self.router.registry()
    }
}

/// Route: `GET /ws/task_status/:task_id`
///
/// Joins the task's own room, where its completion status is pushed. A
/// task that already finished has its status sent right after `connected`.
pub async fn task_status_handler(
    ws: WebSocketUpgrade,
    Path(task_id): Path<String>,
    State(state): State<WebSocketState>,
) -> Response {
    let task_id = match TaskId::parse(&task_id) {
        Ok(id) => id,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid task id").into_response(),
    };
    let room = Room::task_status(&task_id);
    ws.on_upgrade(move |socket| handle_socket(socket, room, Some(task_id), state))
}

/// Route: `GET /ws/task_info/:room_id`
///
/// Joins a caller-chosen room fed by `task_info` events.
pub async fn task_info_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(state): State<WebSocketState>,
) -> Response {
    let room = match RoomId::new(room_id) {
        Ok(id) => Room::task_info(id),
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid room id").into_response(),
    };
    ws.on_upgrade(move |socket| handle_socket(socket, room, None, state))
}

/// Handle an established WebSocket connection.
///
/// `watched` is the task whose finished status should be replayed once
/// the session is in its room.
async fn handle_socket(
    mut socket: WebSocket,
    room: Room,
    watched: Option<TaskId>,
    state: WebSocketState,
) {
    let token = if state.registry().authenticator().requires_token() {
        read_handshake(&mut socket, state.handshake_timeout).await
    } else {
        None
    };

    let session = match state.registry().connect(token.as_deref()).await {
        Ok(session) => session,
        Err(err) => {
            close_with_policy(socket, err.to_string()).await;
            return;
        }
    };
    let connection_id = session.id;

    if let Err(err) = state.router.join(connection_id, &room).await {
        tracing::warn!(connection_id = %connection_id, room = %room, error = %err, "Path room join failed");
        state.router.disconnect(connection_id).await;
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let (mut sender, mut receiver) = socket.split();

    let connected = ServerMessage::Connected(ConnectedMessage::new(connection_id, room.id.clone()));
    if let Err(e) = send_message(&mut sender, &connected).await {
        tracing::debug!("Failed to send connected message: {}", e);
        state.router.disconnect(connection_id).await;
        return;
    }

    if let Some(task_id) = &watched {
        if let Some(status) = finished_status(&state, task_id).await {
            state.registry().send_to(connection_id, status).await;
        }
    }

    // Forward routed frames to the client
    let mut send_task = {
        let mut outbound = session.outbound;
        tokio::spawn(async move {
            while let Some(msg) = outbound.recv().await {
                if let Err(e) = send_message(&mut sender, &msg).await {
                    tracing::debug!(
                        connection_id = %connection_id,
                        "Send error, closing connection: {}",
                        e
                    );
                    break;
                }
            }
        })
    };

    // Handle incoming frames from client
    let mut recv_task = {
        let state = state.clone();
        tokio::spawn(async move {
            while let Some(result) = receiver.next().await {
                match result {
                    Ok(Message::Text(text)) => handle_text(&state, connection_id, &text).await,
                    Ok(Message::Binary(_)) => {
                        tracing::warn!(
                            connection_id = %connection_id,
                            "Received unsupported binary message"
                        );
                    }
                    // Protocol ping/pong is answered by axum
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                    Ok(Message::Close(_)) => {
                        tracing::debug!(connection_id = %connection_id, "Client sent close frame");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(connection_id = %connection_id, "Receive error: {}", e);
                        break;
                    }
                }
            }
        })
    };

    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut recv_task => {}
    }

    state.router.disconnect(connection_id).await;
    send_task.abort();
    recv_task.abort();
}

/// Status frame for a task that finished before its watcher joined.
///
/// A broker failure here is logged and skipped; live pushes still arrive.
async fn finished_status(state: &WebSocketState, task_id: &TaskId) -> Option<ServerMessage> {
    match state.queue.get_state(task_id).await {
        Ok(info) if info.state.is_ready() => Some(ServerMessage::event(&ChannelMessage::task_status(
            &info.status_event(),
        ))),
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(task_id = %task_id, error = %err, "Task state lookup failed");
            None
        }
    }
}

async fn handle_text(state: &WebSocketState, connection_id: ConnectionId, text: &str) {
    let reply = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => {
            let ack = state
                .dispatcher
                .dispatch(connection_id, frame, &state.router)
                .await;
            ServerMessage::Ack(ack)
        }
        Err(e) => {
            tracing::debug!(connection_id = %connection_id, "Undecodable frame: {}", e);
            ServerMessage::error("INVALID_FRAME", e.to_string())
        }
    };
    state.registry().send_to(connection_id, reply).await;
}

/// Wait for the `{"token": ...}` frame. Any other first frame, or none
/// before the deadline, yields no token.
async fn read_handshake(socket: &mut WebSocket, wait: Duration) -> Option<String> {
    let first_text = async {
        while let Some(result) = socket.next().await {
            match result {
                Ok(Message::Text(text)) => return Some(text),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                _ => return None,
            }
        }
        None
    };

    match tokio::time::timeout(wait, first_text).await {
        Ok(Some(text)) => serde_json::from_str::<HandshakeFrame>(&text)
            .ok()
            .and_then(|frame| frame.token),
        Ok(None) => None,
        Err(_) => {
            tracing::debug!("Handshake timed out");
            None
        }
    }
}

async fn close_with_policy(mut socket: WebSocket, reason: String) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: Cow::Owned(reason),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!("Failed to send close frame: {}", e);
    }
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("ServerMessage serialization failed: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(json)).await
}

/// Create axum router for the WebSocket endpoints.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .merge(websocket_router().with_state(ws_state));
/// ```
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new()
        .route("/ws/task_status/:task_id", get(task_status_handler))
        .route("/ws/task_info/:room_id", get(task_info_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::pubsub::InMemoryPubSub;
    use crate::adapters::task_queue::InMemoryTaskQueue;
    use crate::domain::task::{JobDescriptor, TaskInfo};
    use crate::ports::{JobSource, PubSub};
    use serde_json::{json, Value};

    fn state_with(queue: Arc<InMemoryTaskQueue>) -> WebSocketState {
        let registry = Arc::new(SessionRegistry::anonymous(8));
        let pubsub: Arc<dyn PubSub> = Arc::new(InMemoryPubSub::default());
        WebSocketState::new(
            Arc::new(RoomEventRouter::new(registry, pubsub)),
            Arc::new(EventDispatcher::task_namespace()),
            queue,
            Duration::from_secs(5),
        )
    }

    fn state() -> WebSocketState {
        state_with(Arc::new(InMemoryTaskQueue::new("p1", Duration::from_secs(60))))
    }

    #[test]
    fn websocket_state_shares_router() {
        let state = state();
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.router, &cloned.router));
    }

    #[test]
    fn websocket_router_creates_routes() {
        let _router: axum::Router = websocket_router().with_state(state());
    }

    #[tokio::test]
    async fn undecodable_text_gets_error_frame() {
        let state = state();
        let mut session = state.registry().connect(None).await.unwrap();

        handle_text(&state, session.id, "not json").await;

        match session.outbound.recv().await {
            Some(ServerMessage::Error(err)) => assert_eq!(err.code, "INVALID_FRAME"),
            other => panic!("expected error frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn client_frame_gets_ack_with_its_id() {
        let state = state();
        let mut session = state.registry().connect(None).await.unwrap();

        handle_text(&state, session.id, r#"{"event":"join_room","data":{"room":"r"},"id":4}"#).await;

        match session.outbound.recv().await {
            Some(ServerMessage::Ack(ack)) => {
                assert_eq!(ack.id, Some(4));
                assert_eq!(ack.status_code(), 200);
            }
            other => panic!("expected ack, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn finished_task_yields_its_status_frame() {
        let queue = Arc::new(InMemoryTaskQueue::new("p1", Duration::from_secs(60)));
        let task_id = queue
            .submit(JobDescriptor::new("health_check", Value::Null).unwrap())
            .await
            .unwrap();
        queue
            .store(&TaskInfo::succeeded(task_id.clone(), json!("ok")))
            .await
            .unwrap();
        let state = state_with(queue);

        match finished_status(&state, &task_id).await {
            Some(ServerMessage::Event(event)) => {
                assert_eq!(event.event, "task_status");
                assert_eq!(event.room.as_str(), task_id.as_str());
                assert_eq!(event.data, json!({"state": "SUCCESS"}));
            }
            other => panic!("expected status event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn pending_or_unknown_task_yields_nothing() {
        let queue = Arc::new(InMemoryTaskQueue::new("p1", Duration::from_secs(60)));
        let pending = queue
            .submit(JobDescriptor::new("health_check", Value::Null).unwrap())
            .await
            .unwrap();
        let state = state_with(queue);

        assert!(finished_status(&state, &pending).await.is_none());
        assert!(finished_status(&state, &TaskId::parse("nope").unwrap())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn broker_outage_skips_catch_up() {
        let queue = Arc::new(InMemoryTaskQueue::new("p1", Duration::from_secs(60)));
        queue.set_unavailable(true);
        let state = state_with(queue);

        assert!(finished_status(&state, &TaskId::parse("T1").unwrap())
            .await
            .is_none());
    }
}
