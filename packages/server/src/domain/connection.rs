//! A single client's live connection as seen by the hub.
//!
//! A `Connection` owns the producer side of a bounded outbound queue and a
//! close signal. The socket itself never lives here: the read half belongs to
//! the inbound pump and the write half to the outbound pump, so nothing that
//! holds a `Connection` can touch the socket directly.
//!
//! ```text
//! router / broadcaster --try_enqueue--> [bounded queue] --> outbound pump --> socket
//! socket --> inbound pump --(closed() wakes it on close)
//! ```
//!
//! `close` is graceful: the outbound pump drains what is queued and sends a
//! close frame. `terminate` is issued by teardown and bounds that drain, so a
//! peer that stopped reading cannot hold the write half open.

use std::{
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering},
    },
};

use thiserror::Error;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch,
};

use super::value_object::UserId;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of a connection instance, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a connection. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Active,
    Closing,
    Closed,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Closing => 1,
            Self::Closed => 2,
        }
    }
}

/// Why a frame could not be enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    #[error("outbound queue is full")]
    Full,

    #[error("outbound queue is closed")]
    Closed,
}

/// Consumer side of a connection's outbound queue. Owned by the outbound pump.
#[derive(Debug)]
pub struct OutboundQueue {
    receiver: mpsc::Receiver<String>,
}

impl OutboundQueue {
    /// Wait for the next frame. `None` once the queue has been closed and drained.
    pub async fn next(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    /// `None` once the queue has been closed.
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    closed: watch::Sender<bool>,
    terminated: watch::Sender<bool>,
    state: AtomicU8,
    torn_down: AtomicBool,
}

impl Connection {
    /// Open a connection for `user_id` with an outbound queue of `capacity` frames.
    ///
    /// A capacity of zero is raised to one.
    pub fn open(user_id: UserId, capacity: usize) -> (Arc<Self>, OutboundQueue) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);
        let (terminated, _) = watch::channel(false);
        let connection = Arc::new(Self {
            id: ConnectionId::next(),
            user_id,
            outbound: Mutex::new(Some(sender)),
            closed,
            terminated,
            state: AtomicU8::new(ConnectionState::Active.as_u8()),
            torn_down: AtomicBool::new(false),
        });
        (connection, OutboundQueue { receiver })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Enqueue a frame without waiting for queue space.
    pub fn try_enqueue(&self, frame: String) -> Result<(), EnqueueError> {
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = outbound.as_ref() else {
            return Err(EnqueueError::Closed);
        };
        sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => EnqueueError::Full,
            TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Close the outbound queue and signal the inbound pump to stop.
    ///
    /// Frames already queued are still delivered before the outbound pump
    /// sends its close frame. Returns `true` only for the call that actually
    /// closed the connection; later calls are no-ops.
    pub fn close(&self) -> bool {
        let sender = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let _ = self.state.compare_exchange(
            ConnectionState::Active.as_u8(),
            ConnectionState::Closing.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.closed.send_replace(true);
        sender.is_some()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        let mut receiver = self.closed.subscribe();
        // The sender lives as long as `self`, so this cannot fail while we wait.
        let _ = receiver.wait_for(|closed| *closed).await;
    }

    /// Tell the outbound pump to let go of the socket.
    ///
    /// Implies `close`.
    pub fn terminate(&self) {
        self.close();
        self.terminated.send_replace(true);
    }

    pub fn is_terminated(&self) -> bool {
        *self.terminated.borrow()
    }

    /// Resolves once `terminate` has been called.
    pub async fn terminated(&self) {
        let mut receiver = self.terminated.subscribe();
        let _ = receiver.wait_for(|terminated| *terminated).await;
    }

    /// Claim the right to run teardown. Only the first caller gets `true`.
    pub fn begin_teardown(&self) -> bool {
        !self.torn_down.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn mark_closed(&self) {
        self.state
            .store(ConnectionState::Closed.as_u8(), Ordering::Release);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("state", &self.state())
            .finish()
    }
}
