//! Boundary types exchanged with the wire-protocol codec.
//!
//! The codec frames client and server packets into opaque byte
//! buffers and tags them; the routing core never looks inside.

use bytes::Bytes;

/// Routing hint attached to a statement by the codec or an
/// upstream filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Hint {
    /// Route to the primary.
    Master,
    /// Route to a replica.
    Slave,
    /// Route to the server with this name; previous target
    /// remains the fallback.
    NamedServer(String),
    /// Maximum acceptable replication lag, in seconds.
    MaxReplicationLag(u64),
}

/// One client statement, framed by the codec.
#[derive(Debug, Clone)]
pub struct Statement {
    buffer: Bytes,
    hints: Vec<Hint>,
}

impl Statement {
    pub fn new(buffer: impl Into<Bytes>) -> Self {
        Self {
            buffer: buffer.into(),
            hints: vec![],
        }
    }

    pub fn with_hints(mut self, hints: Vec<Hint>) -> Self {
        self.hints = hints;
        self
    }

    /// Raw statement bytes.
    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    pub fn hints(&self) -> &[Hint] {
        &self.hints
    }

    /// Statement text, for logging. Lossy on purpose.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }
}

/// One backend reply, framed and tagged by the codec.
#[derive(Debug, Clone)]
pub struct Reply {
    buffer: Bytes,
    session_command: bool,
    error: bool,
}

impl Reply {
    pub fn new(buffer: impl Into<Bytes>) -> Self {
        Self {
            buffer: buffer.into(),
            session_command: false,
            error: false,
        }
    }

    /// Tag this reply as a session-command response.
    pub fn session_command(mut self) -> Self {
        self.session_command = true;
        self
    }

    /// Tag this reply as an error response.
    pub fn error(mut self) -> Self {
        self.error = true;
        self
    }

    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    pub fn is_session_command(&self) -> bool {
        self.session_command
    }

    pub fn is_error(&self) -> bool {
        self.error
    }
}

/// Classified backend error report.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendErrorKind {
    /// Deadlock or lock-wait timeout; retryable on a
    /// conflict-avoiding cluster.
    WriteConflict(u16),
    /// The backend itself is gone.
    Unreachable,
    /// Any other server error; forwarded to the client.
    Other(u16),
}

/// Error reply received from a backend, decoded by the codec.
#[derive(Debug, Clone)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub buffer: Bytes,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, buffer: impl Into<Bytes>) -> Self {
        Self {
            kind,
            buffer: buffer.into(),
        }
    }
}
