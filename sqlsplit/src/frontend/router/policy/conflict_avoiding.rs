//! Conflict-avoiding policy for multi-writer clusters.
//!
//! Every node accepts writes; two transactions writing the same
//! rows on different nodes end in a certification conflict at
//! commit. Pinning statements to a node chosen by table-name hash
//! keeps hot tables on one writer, and conflicts that happen
//! anyway are retried by the router.

use tracing::trace;

use crate::frontend::router::hash::hash_backend;

use super::{least_loaded_slave, sticky_node, Error, Policy, RouteTarget, Selection};

/// Deadlock.
pub const ER_LOCK_DEADLOCK: u16 = 1213;
/// Lock wait timeout.
pub const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;

#[derive(Debug, Default)]
pub struct ConflictAvoiding;

impl Policy for ConflictAvoiding {
    fn name(&self) -> &'static str {
        "conflict_avoiding"
    }

    fn select(&self, selection: &Selection) -> Result<usize, Error> {
        // Load-balanced reads, unless reads must observe the hash
        // node's own writes.
        if selection.target.is(RouteTarget::SLAVE) && !selection.safe_reads {
            if let Some(index) = least_loaded_slave(selection, super::max_lag(selection)) {
                return Ok(index);
            }
            // Single-node topology: fall through to the hash pick.
        }

        if let Some(index) = sticky_node(selection) {
            return Ok(index);
        }

        let live = super::live_indexes(selection.backends);
        if live.is_empty() {
            return Err(Error::NoEligibleBackend);
        }

        let bucket = hash_backend(selection.tables, live.len());
        let index = live[bucket];
        trace!(
            backend = selection.backends[index].name(),
            bucket,
            "hash-selected node"
        );
        Ok(index)
    }

    fn retryable_conflict(&self, code: u16) -> bool {
        code == ER_LOCK_DEADLOCK || code == ER_LOCK_WAIT_TIMEOUT
    }
}
