//! Connection session registry.
//!
//! Tracks every live connection on this instance, its room memberships,
//! and the outbound queue its socket task drains.
//!
//! # Architecture
//!
//! ```text
//! sessions: conn-a → {rooms: [task_status:T1, task_info:20], outbound}
//!           conn-b → {rooms: [task_status:T1], outbound}
//! rooms:    task_status:T1 → {conn-a, conn-b}
//!           task_info:20   → {conn-a}
//! ```
//!
//! Both maps live behind one lock, so membership edits from concurrent
//! session handlers are serialized and the two maps never disagree.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::domain::foundation::{
    AuthError, AuthenticatedUser, ConnectionId, StateMachine,
};
use crate::domain::realtime::{Room, SessionState};
use crate::ports::TokenValidator;

use super::messages::ServerMessage;

/// How connections are admitted.
#[derive(Clone)]
pub enum Authenticator {
    /// Every connection is accepted without identity.
    Anonymous,

    /// A valid token carrying every required scope is mandatory.
    Token {
        validator: Arc<dyn TokenValidator>,
        required_scopes: Vec<String>,
    },
}

impl Authenticator {
    pub fn token(validator: Arc<dyn TokenValidator>, required_scopes: Vec<String>) -> Self {
        Authenticator::Token {
            validator,
            required_scopes,
        }
    }

    /// Returns true if clients must send a handshake frame.
    pub fn requires_token(&self) -> bool {
        matches!(self, Authenticator::Token { .. })
    }

    async fn authenticate(
        &self,
        token: Option<&str>,
    ) -> Result<Option<AuthenticatedUser>, AuthError> {
        match self {
            Authenticator::Anonymous => Ok(None),
            Authenticator::Token {
                validator,
                required_scopes,
            } => {
                let token = token
                    .filter(|t| !t.is_empty())
                    .ok_or(AuthError::MissingToken)?;
                let user = validator.validate(token).await?;
                if let Some(scope) = user.missing_scope(required_scopes) {
                    return Err(AuthError::InsufficientScope(scope.to_string()));
                }
                Ok(Some(user))
            }
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Authenticator::Anonymous => f.write_str("Anonymous"),
            Authenticator::Token {
                required_scopes, ..
            } => f
                .debug_struct("Token")
                .field("required_scopes", required_scopes)
                .finish(),
        }
    }
}

/// Connection refused at handshake. The session never entered Open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("Connection refused: {0}")]
    Refused(#[from] AuthError),
}

/// Membership change rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Unknown session {0}")]
    UnknownSession(ConnectionId),

    #[error("Session {id} is {state}, membership requires open")]
    NotOpen { id: ConnectionId, state: SessionState },
}

/// What the socket task gets back from a successful connect.
#[derive(Debug)]
pub struct SessionHandle {
    pub id: ConnectionId,
    pub user: Option<AuthenticatedUser>,
    /// Frames routed to this connection, in delivery order.
    pub outbound: mpsc::Receiver<ServerMessage>,
}

struct SessionEntry {
    state: SessionState,
    rooms: HashSet<Room>,
    outbound: mpsc::Sender<ServerMessage>,
}

#[derive(Default)]
struct Membership {
    sessions: HashMap<ConnectionId, SessionEntry>,
    rooms: HashMap<Room, HashSet<ConnectionId>>,
}

impl Membership {
    fn open_entry(&mut self, id: ConnectionId) -> Result<&mut SessionEntry, RoomError> {
        let entry = self
            .sessions
            .get_mut(&id)
            .ok_or(RoomError::UnknownSession(id))?;
        if !entry.state.accepts_membership() {
            return Err(RoomError::NotOpen {
                id,
                state: entry.state,
            });
        }
        Ok(entry)
    }
}

/// Registry of live sessions on this instance.
///
/// The registry is the exclusive owner of sessions: they exist from a
/// successful `connect` until `disconnect`.
pub struct SessionRegistry {
    membership: RwLock<Membership>,
    authenticator: Authenticator,
    outbound_capacity: usize,
}

impl SessionRegistry {
    /// Create a registry admitting connections through `authenticator`.
    ///
    /// `outbound_capacity` bounds each connection's queue of undelivered
    /// frames; frames beyond it are dropped for that connection only.
    pub fn new(authenticator: Authenticator, outbound_capacity: usize) -> Self {
        Self {
            membership: RwLock::new(Membership::default()),
            authenticator,
            outbound_capacity: outbound_capacity.max(1),
        }
    }

    pub fn anonymous(outbound_capacity: usize) -> Self {
        Self::new(Authenticator::Anonymous, outbound_capacity)
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Admit a connection.
    ///
    /// On refusal the session goes from Connecting straight to Closed and
    /// nothing is registered.
    pub async fn connect(&self, token: Option<&str>) -> Result<SessionHandle, ConnectError> {
        let id = ConnectionId::new();
        let state = SessionState::Connecting;

        let user = match self.authenticator.authenticate(token).await {
            Ok(user) => user,
            Err(err) => {
                let closed = state
                    .transition_to(SessionState::Closed)
                    .unwrap_or(SessionState::Closed);
                tracing::info!(
                    connection_id = %id,
                    error = %err,
                    state = %closed,
                    "Connection refused"
                );
                return Err(ConnectError::Refused(err));
            }
        };

        let state = state
            .transition_to(SessionState::Open)
            .unwrap_or(SessionState::Open);
        let (tx, rx) = mpsc::channel(self.outbound_capacity);

        self.membership.write().await.sessions.insert(
            id,
            SessionEntry {
                state,
                rooms: HashSet::new(),
                outbound: tx,
            },
        );

        tracing::debug!(
            connection_id = %id,
            user_id = user.as_ref().map(|u| u.id.as_str()),
            "Session opened"
        );

        Ok(SessionHandle {
            id,
            user,
            outbound: rx,
        })
    }

    /// Add a session to a room. Idempotent.
    ///
    /// Returns true if the room was empty before this call.
    pub async fn join(&self, id: ConnectionId, room: &Room) -> Result<bool, RoomError> {
        let mut membership = self.membership.write().await;
        let entry = membership.open_entry(id)?;
        if !entry.rooms.insert(room.clone()) {
            return Ok(false);
        }

        let members = membership.rooms.entry(room.clone()).or_default();
        let opened = members.is_empty();
        members.insert(id);

        tracing::debug!(connection_id = %id, room = %room, "Joined room");
        Ok(opened)
    }

    /// Remove a session from a room. Idempotent.
    ///
    /// Returns true if the room has no members left.
    pub async fn leave(&self, id: ConnectionId, room: &Room) -> Result<bool, RoomError> {
        let mut membership = self.membership.write().await;
        let entry = membership.open_entry(id)?;
        if !entry.rooms.remove(room) {
            return Ok(false);
        }

        let emptied = remove_member(&mut membership.rooms, room, id);
        tracing::debug!(connection_id = %id, room = %room, "Left room");
        Ok(emptied)
    }

    /// Close a session and remove it from every room before returning.
    ///
    /// Returns the rooms that became empty. Unknown ids are a no-op.
    pub async fn disconnect(&self, id: ConnectionId) -> Vec<Room> {
        let mut membership = self.membership.write().await;
        let Some(mut entry) = membership.sessions.remove(&id) else {
            return Vec::new();
        };

        entry.state = entry
            .state
            .transition_to(SessionState::Closing)
            .unwrap_or(SessionState::Closing);

        let mut emptied = Vec::new();
        for room in entry.rooms.drain() {
            if remove_member(&mut membership.rooms, &room, id) {
                emptied.push(room);
            }
        }

        entry.state = entry
            .state
            .transition_to(SessionState::Closed)
            .unwrap_or(SessionState::Closed);

        tracing::debug!(
            connection_id = %id,
            emptied_rooms = emptied.len(),
            "Session closed"
        );
        emptied
    }

    /// Deliver a frame to every session currently in `room`.
    ///
    /// Returns the number of sessions the frame was queued for. A session
    /// whose queue is full misses this frame.
    pub async fn broadcast(&self, room: &Room, message: &ServerMessage) -> usize {
        let membership = self.membership.read().await;
        let Some(members) = membership.rooms.get(room) else {
            return 0;
        };

        let mut delivered = 0;
        for id in members {
            let Some(entry) = membership.sessions.get(id) else {
                continue;
            };
            match entry.outbound.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        connection_id = %id,
                        room = %room,
                        "Outbound queue full, dropping frame"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    /// Queue a frame for one session. Returns false if it cannot be queued.
    pub async fn send_to(&self, id: ConnectionId, message: ServerMessage) -> bool {
        let membership = self.membership.read().await;
        membership
            .sessions
            .get(&id)
            .map(|entry| entry.outbound.try_send(message).is_ok())
            .unwrap_or(false)
    }

    /// Sessions currently in `room`.
    pub async fn members(&self, room: &Room) -> Vec<ConnectionId> {
        self.membership
            .read()
            .await
            .rooms
            .get(room)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Rooms a session is in.
    pub async fn rooms_of(&self, id: ConnectionId) -> Vec<Room> {
        let membership = self.membership.read().await;
        let mut rooms: Vec<Room> = membership
            .sessions
            .get(&id)
            .map(|e| e.rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    /// State of a registered session; `None` once it has been closed.
    pub async fn session_state(&self, id: ConnectionId) -> Option<SessionState> {
        self.membership
            .read()
            .await
            .sessions
            .get(&id)
            .map(|e| e.state)
    }

    pub async fn session_count(&self) -> usize {
        self.membership.read().await.sessions.len()
    }

    pub async fn room_count(&self) -> usize {
        self.membership.read().await.rooms.len()
    }
}

fn remove_member(
    rooms: &mut HashMap<Room, HashSet<ConnectionId>>,
    room: &Room,
    id: ConnectionId,
) -> bool {
    let Some(members) = rooms.get_mut(room) else {
        return false;
    };
    members.remove(&id);
    if members.is_empty() {
        rooms.remove(room);
        true
    } else {
        false
    }
}
