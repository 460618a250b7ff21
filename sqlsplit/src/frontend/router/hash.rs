//! Table-name hashing for node selection.
//!
//! Statements touching the same table set land on the same node,
//! which conflict-avoiding replication needs to keep write sets
//! from colliding.

use std::hash::Hasher;

use fnv::FnvHasher;
use tracing::trace;

/// Pick a node index from the tables a statement targets.
///
/// Tables are sorted case-insensitively and the first one decides
/// the bucket. Statements whose other tables hash to different
/// buckets are only reported at trace level; the documented
/// behavior makes no correctness guarantee for them.
pub fn hash_backend(tables: &[String], nodes: usize) -> usize {
    if nodes == 0 || tables.is_empty() {
        return 0;
    }

    let mut sorted: Vec<String> = tables.iter().map(|t| t.to_lowercase()).collect();
    sorted.sort();

    let bucket = hash_one(&sorted[0]) % nodes;

    for table in &sorted[1..] {
        if hash_one(table) % nodes != bucket {
            trace!(
                table = table.as_str(),
                "statement touches cross-node tables"
            );
        }
    }

    bucket
}

fn hash_one(table: &str) -> usize {
    let mut hasher = FnvHasher::default();
    hasher.write(table.as_bytes());
    hasher.finish() as usize
}
