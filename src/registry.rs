use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{error, warn};

use crate::transport::{SessionId, SessionState, SseEvent, SseSession};

type SessionMap = HashMap<SessionId, SseSession>;

/// The set of open SSE sessions
///
/// The single coordination point between the streaming endpoint and the RPC
/// dispatcher. `add`, `remove` and `broadcast` are serialized by one mutex, so
/// a broadcast always sees a consistent snapshot and never reaches a session
/// added after it returned.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<SessionMap>>,
}

impl SessionRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionMap> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a session
    ///
    /// Returns `false` and leaves the registry untouched when the session is
    /// no longer open.
    pub fn add(&self, session: SseSession) -> bool {
        let mut sessions = self.lock();
        if session.state() != SessionState::Open {
            warn!(session = %session.id(), state = ?session.state(), "Refusing to register closed session");
            return false;
        }
        sessions.insert(session.id(), session);
        true
    }

    /// Removes a session
    ///
    /// Returns whether it was present; removing an absent session is a no-op.
    pub fn remove(&self, id: SessionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Enqueues `message` on every current session
    ///
    /// Sessions that fail to accept the message (closed concurrently) are
    /// logged and skipped. Returns the number of sessions that accepted it.
    pub fn broadcast<T: Serialize>(&self, message: &T) -> usize {
        let value = match serde_json::to_value(message) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "Failed to serialize broadcast message");
                return 0;
            }
        };
        let event = SseEvent::from_value(value);

        let sessions = self.lock();
        let mut delivered = 0;
        for session in sessions.values() {
            match session.send_event(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(session = %session.id(), error = %e, "Skipping session during broadcast"),
            }
        }
        delivered
    }

    /// Whether no session is open
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of open sessions
    pub fn len(&self) -> usize {
        self.lock().len()
    }
}
