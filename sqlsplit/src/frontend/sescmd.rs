//! Session-command ledger.
//!
//! Backends join a session at different times (initial connect,
//! reconnect after failure), but all of them must have applied the
//! same session-altering statements in the same order before they can
//! be trusted with ordinary statements. The ledger is the session's
//! append-only log of those statements; each backend holds a cursor
//! into it and replays the full prefix it hasn't applied yet.

use std::sync::atomic::{AtomicU64, Ordering};

use fnv::FnvHashSet;
use tracing::warn;

use crate::backend::BackendConnection;
use crate::net::{Reply, Statement};

/// One session command, identified by its sequence number.
#[derive(Debug)]
pub struct LedgerEntry {
    seq: u64,
    statement: Statement,
    /// The client has been answered for this entry.
    replied: bool,
    /// Backends (by reference index) that applied it.
    applied_by: FnvHashSet<usize>,
}

impl LedgerEntry {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn applied_by(&self) -> &FnvHashSet<usize> {
        &self.applied_by
    }
}

/// A backend's position in the ledger.
///
/// `applied` is the last entry dispatched to the backend, `acked`
/// the last entry whose reply the backend has delivered. Both start
/// before sequence 1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cursor {
    applied: u64,
    acked: u64,
}

impl Cursor {
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn acked(&self) -> u64 {
        self.acked
    }
}

/// What to do with a reconciled session-command reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconciled {
    /// First confirmation for this entry; forward to the client.
    Forward,
    /// The client was already answered by another backend; drop.
    Discard,
    /// The backend failed a command another backend applied; it
    /// has diverged irreversibly and must be closed.
    Diverged,
}

/// Ordered, append-only log of session commands.
///
/// Entries are never removed; the ledger lives as long as the
/// session.
#[derive(Debug, Default)]
pub struct CommandLedger {
    entries: Vec<LedgerEntry>,
    next_seq: AtomicU64,
}

impl CommandLedger {
    /// Append a command, assigning the next sequence number.
    pub fn append(&mut self, statement: Statement) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel) + 1;
        self.entries.push(LedgerEntry {
            seq,
            statement,
            replied: false,
            applied_by: FnvHashSet::default(),
        });
        seq
    }

    /// Highest sequence number appended so far.
    pub fn latest(&self) -> u64 {
        self.next_seq.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, seq: u64) -> Option<&LedgerEntry> {
        // Sequence numbers are dense, starting at 1.
        self.entries.get(seq.checked_sub(1)? as usize)
    }

    /// Dispatch every entry after the cursor to the backend, in
    /// ledger order, advancing the cursor past each accepted write.
    ///
    /// Returns false when a write is rejected partway; the cursor
    /// then still points at the last applied entry and the backend
    /// must be considered unhealthy for this session.
    pub fn advance(
        &mut self,
        cursor: &mut Cursor,
        conn: &dyn BackendConnection,
        backend: usize,
    ) -> bool {
        while (cursor.applied as usize) < self.entries.len() {
            let entry = &mut self.entries[cursor.applied as usize];

            if !conn.write(entry.statement.buffer()) {
                warn!(
                    backend = conn.name(),
                    seq = entry.seq,
                    "session command dispatch failed"
                );
                return false;
            }

            entry.applied_by.insert(backend);
            cursor.applied = entry.seq;
        }

        true
    }

    /// Reconcile a session-command reply from one backend.
    ///
    /// Every backend answers every ledger entry, but the client must
    /// see exactly one confirmation per command: the first one.
    pub fn reconcile_reply(&mut self, cursor: &mut Cursor, reply: &Reply) -> Reconciled {
        let seq = cursor.acked + 1;

        if seq > cursor.applied {
            warn!(seq, "session command reply without a dispatched command");
            return Reconciled::Discard;
        }

        cursor.acked = seq;

        let entry = match self.entries.get_mut(seq as usize - 1) {
            Some(entry) => entry,
            None => return Reconciled::Discard,
        };

        if reply.is_error() && entry.replied {
            // Another backend already confirmed this command.
            return Reconciled::Diverged;
        }

        if entry.replied {
            return Reconciled::Discard;
        }

        entry.replied = true;
        Reconciled::Forward
    }

    /// The backend has dispatched and been answered for the whole
    /// ledger.
    pub fn caught_up(&self, cursor: &Cursor) -> bool {
        cursor.applied == self.latest() && cursor.acked == self.latest()
    }
}
