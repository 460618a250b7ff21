//! Backend connection abstraction.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::config::Role;

/// One pooled connection from the proxy to one database server.
///
/// Writes are fire-and-forget: `write` returns as soon as the buffer
/// is handed to the transport. Replies arrive later, as separate
/// events on the session that owns this connection.
pub trait BackendConnection: Send + Sync + Debug {
    /// Hand a buffer to the transport. Returns false if the
    /// connection can't accept it.
    fn write(&self, buffer: &Bytes) -> bool;

    /// Close the connection. Replies in flight are dropped.
    fn close(&self);

    /// The server behind this connection is the primary.
    fn is_primary(&self) -> bool;

    /// The server behind this connection is up and serving.
    fn is_healthy(&self) -> bool;

    /// Server name, unique within the topology.
    fn name(&self) -> &str;

    /// Replication lag behind the primary, in seconds, if known.
    fn replication_lag(&self) -> Option<u64> {
        None
    }
}

/// Connection backed by an outbound channel serviced by a
/// transport task.
#[derive(Debug)]
pub struct ChannelConnection {
    name: String,
    role: Role,
    lag: Option<u64>,
    closed: AtomicBool,
    sender: UnboundedSender<Bytes>,
}

impl ChannelConnection {
    /// Create a connection and the receiving end its transport
    /// task reads from.
    pub fn pair(name: &str, role: Role) -> (Arc<Self>, UnboundedReceiver<Bytes>) {
        let (sender, receiver) = unbounded_channel();
        (Self::from_sender(name, role, sender), receiver)
    }

    /// Connection over an existing transport endpoint. Every call
    /// produces an independent connection object with its own close
    /// state; sessions never share one.
    pub fn from_sender(name: &str, role: Role, sender: UnboundedSender<Bytes>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            role,
            lag: None,
            closed: AtomicBool::new(false),
            sender,
        })
    }

    pub fn with_lag(mut self: Arc<Self>, lag: u64) -> Arc<Self> {
        // Only before the connection is shared.
        if let Some(conn) = Arc::get_mut(&mut self) {
            conn.lag = Some(lag);
        }
        self
    }
}

impl BackendConnection for ChannelConnection {
    fn write(&self, buffer: &Bytes) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.sender.send(buffer.clone()).is_ok()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_primary(&self) -> bool {
        self.role == Role::Primary
    }

    fn is_healthy(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.sender.is_closed()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn replication_lag(&self) -> Option<u64> {
        self.lag
    }
}
