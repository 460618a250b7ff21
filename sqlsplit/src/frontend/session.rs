//! Client session.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::backend::BackendRef;
use crate::net::Statement;

use super::sescmd::CommandLedger;
use super::tmp_table::TempTables;
use super::transaction::TransactionState;

/// Everything a session owns, guarded by the session lock.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Commit-mode tracker.
    pub trx: TransactionState,
    /// Temporary tables alive in this session.
    pub tmp_tables: TempTables,
    /// Session commands replayed to every backend.
    pub ledger: CommandLedger,
    /// Backend references, index-stable for the session's lifetime.
    pub backends: Vec<BackendRef>,
    /// Sticky backend for the open transaction.
    pub active_node: Option<usize>,
    /// Stored `BEGIN` waiting for the statement that decides
    /// the target backend.
    pub queued: Option<Statement>,
    /// Last ordinary statement dispatched, kept for write-conflict
    /// retry, with the backend it went to.
    pub last_stmt: Option<(usize, Statement)>,
    /// Write-conflict retries performed in the open transaction.
    pub conflict_retries: u32,
    /// Default database for unqualified table names.
    pub default_db: String,
}

impl SessionState {
    /// Backends participating in routing.
    pub fn live_backends(&self) -> usize {
        self.backends.iter().filter(|b| b.in_use()).count()
    }
}

/// One client connection's routing state.
///
/// Mutation happens only under the session lock, and only while the
/// session is open; [`Session::lock`] checks both.
#[derive(Debug)]
pub struct Session {
    id: u64,
    closed: AtomicBool,
    inner: Mutex<SessionState>,
}

impl Session {
    pub fn new(id: u64, default_db: &str) -> Self {
        Self {
            id,
            closed: AtomicBool::new(false),
            inner: Mutex::new(SessionState {
                default_db: default_db.to_owned(),
                ..Default::default()
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Acquire the session lock, unless the session was closed
    /// concurrently. Callers getting `None` abandon the operation
    /// rather than mutate a torn-down session.
    pub fn lock(&self) -> Option<MutexGuard<'_, SessionState>> {
        let guard = self.inner.lock();
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        Some(guard)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the session: every backend connection is closed and
    /// later lock attempts fail. Idempotent.
    pub fn close(&self) {
        let mut state = self.inner.lock();
        self.close_with(&mut state);
    }

    /// [`Session::close`] for callers already holding the session
    /// lock.
    pub fn close_with(&self, state: &mut SessionState) {
        self.closed.store(true, Ordering::Release);
        for bref in state.backends.iter_mut() {
            bref.close();
        }
    }
}
