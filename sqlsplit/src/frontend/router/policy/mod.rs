//! Per-topology routing policies.
//!
//! Every policy implements the same selection contract; the
//! statement router owns everything else (session commands, reply
//! reassembly, failure recovery).

pub mod conflict_avoiding;
pub mod read_write_split;
pub mod schema_sharded;

use std::fmt::Debug;

use tracing::warn;

use crate::backend::BackendRef;
use crate::config::PolicyKind;
use crate::net::Hint;

use super::target::RouteTarget;
use super::Error;

pub use conflict_avoiding::ConflictAvoiding;
pub use read_write_split::ReadWriteSplit;
pub use schema_sharded::SchemaSharded;

/// Everything a policy may consult to pick a backend.
#[derive(Debug)]
pub struct Selection<'a> {
    pub target: RouteTarget,
    pub backends: &'a [BackendRef],
    /// Sticky node of the open transaction, if one was chosen.
    pub active_node: Option<usize>,
    /// Tables the statement references.
    pub tables: &'a [String],
    pub hints: &'a [Hint],
    /// Transaction open before or after this statement.
    pub in_transaction: bool,
    /// Configured lag bound, used when no hint overrides it.
    pub default_max_lag: Option<u64>,
    /// Reads must see the selected node's own writes.
    pub safe_reads: bool,
}

/// Backend selection for one topology flavor.
pub trait Policy: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// Pick the backend reference index for a resolved target.
    fn select(&self, selection: &Selection) -> Result<usize, Error>;

    /// The error code is a write conflict worth retrying.
    fn retryable_conflict(&self, _code: u16) -> bool {
        false
    }
}

/// Instantiate the configured policy.
pub fn from_config(kind: PolicyKind) -> Box<dyn Policy> {
    match kind {
        PolicyKind::ReadWriteSplit => Box::new(ReadWriteSplit),
        PolicyKind::ConflictAvoiding => Box::new(ConflictAvoiding),
        PolicyKind::SchemaSharded => Box::new(SchemaSharded),
    }
}

/// Index of the primary's reference.
pub(super) fn master_index(backends: &[BackendRef]) -> Option<usize> {
    backends
        .iter()
        .position(|bref| bref.in_use() && bref.conn().is_primary() && bref.conn().is_healthy())
}

/// Sticky node of an open transaction, when it is still usable.
pub(super) fn sticky_node(selection: &Selection) -> Option<usize> {
    if !selection.in_transaction {
        return None;
    }
    let index = selection.active_node?;
    let bref = selection.backends.get(index)?;
    if bref.in_use() && bref.conn().is_healthy() {
        Some(index)
    } else {
        None
    }
}

/// Replica with the fewest outstanding requests that satisfies the
/// lag bound.
pub(super) fn least_loaded_slave(selection: &Selection, max_lag: Option<u64>) -> Option<usize> {
    selection
        .backends
        .iter()
        .enumerate()
        .filter(|(_, bref)| bref.in_use() && bref.conn().is_healthy() && !bref.conn().is_primary())
        .filter(|(_, bref)| within_lag(bref, max_lag))
        .min_by_key(|(_, bref)| bref.outstanding)
        .map(|(index, _)| index)
}

/// Backend named by a hint, regardless of role.
pub(super) fn named_server(selection: &Selection) -> Option<usize> {
    let name = selection.hints.iter().find_map(|hint| match hint {
        Hint::NamedServer(name) => Some(name.as_str()),
        _ => None,
    })?;

    let found = selection
        .backends
        .iter()
        .position(|bref| bref.in_use() && bref.conn().is_healthy() && bref.name() == name);

    if found.is_none() {
        warn!(
            server = name,
            "named server not found in a suitable state, using fallback target"
        );
    }
    found
}

/// Lag bound from hints, falling back to the configured default.
pub(super) fn max_lag(selection: &Selection) -> Option<u64> {
    selection
        .hints
        .iter()
        .find_map(|hint| match hint {
            Hint::MaxReplicationLag(lag) => Some(*lag),
            _ => None,
        })
        .or(selection.default_max_lag)
}

fn within_lag(bref: &BackendRef, max_lag: Option<u64>) -> bool {
    match (max_lag, bref.conn().replication_lag()) {
        (Some(bound), Some(lag)) => lag <= bound,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

/// In-use backends, the eligible set for fan-outs and hashing.
pub(super) fn live_indexes(backends: &[BackendRef]) -> Vec<usize> {
    backends
        .iter()
        .enumerate()
        .filter(|(_, bref)| bref.in_use() && bref.conn().is_healthy())
        .map(|(index, _)| index)
        .collect()
}
