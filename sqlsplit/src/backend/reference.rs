//! Per-(session, backend) state.

use std::sync::Arc;

use crate::frontend::sescmd::Cursor;
use crate::net::Statement;

use super::BackendConnection;

/// Bit flags describing what a backend reference is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefState(u8);

impl RefState {
    /// Backend participates in routing.
    pub const IN_USE: RefState = RefState(1);
    /// A statement has been dispatched.
    pub const QUERY_ACTIVE: RefState = RefState(1 << 1);
    /// Its reply hasn't been fully consumed yet.
    pub const WAITING_RESULT: RefState = RefState(1 << 2);
    /// Terminal: connection failed or session ended.
    pub const CLOSED: RefState = RefState(1 << 3);

    pub fn is(&self, state: RefState) -> bool {
        self.0 & state.0 == state.0
    }

    pub fn set(&mut self, state: RefState) {
        self.0 |= state.0;
    }

    pub fn clear(&mut self, state: RefState) {
        self.0 &= !state.0;
    }
}

/// One backend connection as seen by one session.
///
/// References are created when the session connects to a backend and
/// never removed from the session's list; a failed backend is marked
/// [`RefState::CLOSED`] and skipped, which keeps indexes stable for
/// the sticky node and the ledger cursors.
#[derive(Debug)]
pub struct BackendRef {
    conn: Arc<dyn BackendConnection>,
    state: RefState,
    /// Position in the session-command ledger.
    pub cursor: Cursor,
    /// Statement queued while a session command or an earlier
    /// statement is unacknowledged. At most one.
    pub pending: Option<Statement>,
    /// Dispatched statements with no reply yet.
    pub outstanding: u32,
}

impl BackendRef {
    pub fn new(conn: Arc<dyn BackendConnection>) -> Self {
        let mut state = RefState::default();
        state.set(RefState::IN_USE);
        Self {
            conn,
            state,
            cursor: Cursor::default(),
            pending: None,
            outstanding: 0,
        }
    }

    pub fn conn(&self) -> &Arc<dyn BackendConnection> {
        &self.conn
    }

    pub fn name(&self) -> &str {
        self.conn.name()
    }

    pub fn state(&self) -> RefState {
        self.state
    }

    pub fn in_use(&self) -> bool {
        self.state.is(RefState::IN_USE) && !self.state.is(RefState::CLOSED)
    }

    pub fn waiting_result(&self) -> bool {
        self.state.is(RefState::WAITING_RESULT)
    }

    /// Record a dispatched statement.
    pub fn dispatched(&mut self) {
        self.outstanding += 1;
        self.state.set(RefState::QUERY_ACTIVE);
        self.state.set(RefState::WAITING_RESULT);
    }

    /// Record a consumed reply. Flags clear when the last
    /// outstanding reply is in.
    pub fn replied(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.outstanding == 0 {
            self.state.clear(RefState::QUERY_ACTIVE);
            self.state.clear(RefState::WAITING_RESULT);
        }
    }

    /// Take this backend out of routing for good.
    pub fn close(&mut self) {
        self.state.clear(RefState::IN_USE);
        self.state.set(RefState::CLOSED);
        self.pending = None;
        self.outstanding = 0;
        self.conn.close();
    }
}
