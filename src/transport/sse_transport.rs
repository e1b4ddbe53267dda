//! Server-sent events (SSE) session channel
//!
//! Each `GET /mcp` connection owns one [`SseSession`]: an unbounded FIFO queue
//! of [`SseEvent`]s plus a lifecycle flag. The sending half is shared with the
//! [`SessionRegistry`] so broadcasts can reach it; the receiving half lives in a
//! [`SessionStream`], which actix-web-lab turns into the HTTP response body.
//!
//! The stream suspends while the queue is empty and resumes as soon as a
//! message is enqueued. When the body is dropped (client disconnect, server
//! shutdown) or explicitly closed, the session is torn down and removed from
//! the registry exactly once.
//!
//! # Examples
//!
//! ```no_run
//! use warpcast_mcp::registry::SessionRegistry;
//! use warpcast_mcp::transport::SseSession;
//! use actix_web::Responder;
//! use actix_web_lab::sse;
//! use std::time::Duration;
//!
//! async fn sse_handler(registry: SessionRegistry) -> impl Responder {
//!     let (_session, stream) = SseSession::open(&registry);
//!     sse::Sse::from_stream(stream).with_keep_alive(Duration::from_secs(3))
//! }
//! ```

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web_lab::sse;
use bytestring::ByteString;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

use crate::registry::SessionRegistry;
use crate::transport::{Result, TransportError};

/// Path clients are told to POST JSON-RPC requests to
pub const MCP_ENDPOINT: &str = "/mcp";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one SSE session, unique for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an SSE session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Accepting messages
    Open = 0,
    /// Teardown in progress
    Closing = 1,
    /// Removed from the registry; no further delivery
    Closed = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// One SSE frame: an event name and a JSON payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseEvent {
    /// Event name, `message` unless tagged otherwise
    pub event: String,
    /// JSON payload
    pub data: Value,
}

impl SseEvent {
    /// Event name used when a payload is not explicitly tagged
    pub const DEFAULT_EVENT: &'static str = "message";

    /// Creates a named event
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Creates a `message` event
    pub fn message(data: Value) -> Self {
        Self::new(Self::DEFAULT_EVENT, data)
    }

    /// The bootstrap event telling the client where to POST requests
    pub fn endpoint() -> Self {
        Self::new("endpoint", json!({ "uri": MCP_ENDPOINT }))
    }

    /// Applies the framing policy to an arbitrary value
    ///
    /// An object with exactly the keys `event` (a string) and `data` is used
    /// as-is; anything else is wrapped as a `message` event.
    pub fn from_value(value: Value) -> Self {
        if let Value::Object(map) = &value {
            if map.len() == 2 {
                if let (Some(Value::String(event)), Some(data)) = (map.get("event"), map.get("data")) {
                    return Self::new(event.clone(), data.clone());
                }
            }
        }
        Self::message(value)
    }

    /// Renders the wire text: `event:` line, `data:` line, blank line
    pub fn to_frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event, self.data)
    }

    /// Converts into the actix-web-lab event, which renders the same frame
    pub fn into_sse_event(self) -> sse::Event {
        let data = ByteString::from(self.data.to_string());
        sse::Event::Data(sse::Data::new(data).event(self.event))
    }
}

/// Sending half of an SSE session
///
/// Cheap to clone; every clone refers to the same queue and lifecycle flag.
#[derive(Debug, Clone)]
pub struct SseSession {
    id: SessionId,
    sender: mpsc::UnboundedSender<SseEvent>,
    state: Arc<AtomicU8>,
}

impl SseSession {
    /// Opens a session, registers it, and queues the bootstrap `endpoint` event
    ///
    /// The bootstrap event is enqueued before the session becomes visible to
    /// broadcasts, so it is always the first frame on the stream.
    pub fn open(registry: &SessionRegistry) -> (Self, SessionStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let session = Self {
            id: SessionId::next(),
            sender,
            state: Arc::new(AtomicU8::new(SessionState::Open as u8)),
        };

        // The receiver is alive, so the first enqueue cannot fail.
        let _ = session.sender.send(SseEvent::endpoint());
        registry.add(session.clone());
        info!(session = %session.id, "SSE session opened");

        let stream = SessionStream {
            session: session.clone(),
            receiver: UnboundedReceiverStream::new(receiver),
            registry: registry.clone(),
        };
        (session, stream)
    }

    /// The session identity
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Enqueues a value, applying the `{event, data}` framing policy
    pub fn send(&self, value: Value) -> Result<()> {
        self.send_event(SseEvent::from_value(value))
    }

    /// Enqueues an already-framed event
    pub fn send_event(&self, event: SseEvent) -> Result<()> {
        if self.state() != SessionState::Open {
            return Err(TransportError::SessionClosed(self.id));
        }
        self.sender.send(event)?;
        Ok(())
    }

    /// Runs teardown once; later calls are no-ops
    fn teardown(&self, registry: &SessionRegistry) -> bool {
        if self
            .state
            .compare_exchange(
                SessionState::Open as u8,
                SessionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }
        let removed = registry.remove(self.id);
        self.state.store(SessionState::Closed as u8, Ordering::Release);
        info!(session = %self.id, removed, "SSE session closed");
        true
    }
}

/// Receiving half of an SSE session, used as the HTTP response body
///
/// Yields frames in FIFO order. Dropping the stream tears the session down.
#[derive(Debug)]
pub struct SessionStream {
    session: SseSession,
    receiver: UnboundedReceiverStream<SseEvent>,
    registry: SessionRegistry,
}

impl SessionStream {
    /// Waits for the next queued event
    ///
    /// Returns `None` once the session is closed and the queue drained.
    pub async fn next_event(&mut self) -> Option<SseEvent> {
        self.receiver.next().await
    }

    /// Closes the session and deregisters it
    ///
    /// Idempotent; already-queued events can still be drained afterwards.
    pub fn close(&mut self) {
        if self.session.teardown(&self.registry) {
            self.receiver.close();
        }
    }
}

impl Stream for SessionStream {
    type Item = std::result::Result<sse::Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.receiver.poll_next_unpin(cx) {
            Poll::Ready(Some(event)) => {
                debug!(session = %this.session.id, event = %event.event, "SSE frame out");
                Poll::Ready(Some(Ok(event.into_sse_event())))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.close();
    }
}
