//! Schema-sharded routing.
//!
//! Each backend holds one schema; a statement goes to the backend
//! whose name matches the database qualifier of the tables it
//! touches.

use tracing::trace;

use super::{master_index, sticky_node, Error, Policy, Selection};

#[derive(Debug, Default)]
pub struct SchemaSharded;

impl Policy for SchemaSharded {
    fn name(&self) -> &'static str {
        "schema_sharded"
    }

    fn select(&self, selection: &Selection) -> Result<usize, Error> {
        if let Some(index) = sticky_node(selection) {
            return Ok(index);
        }

        let schema = selection
            .tables
            .iter()
            .find_map(|table| table.split_once('.').map(|(db, _)| db));

        if let Some(schema) = schema {
            let found = selection.backends.iter().position(|bref| {
                bref.in_use() && bref.conn().is_healthy() && bref.name() == schema
            });

            return match found {
                Some(index) => {
                    trace!(shard = schema, "schema-matched shard");
                    Ok(index)
                }
                None => Err(Error::NoEligibleBackend),
            };
        }

        // No qualified table: anything session-level lands on the
        // default shard.
        master_index(selection.backends).ok_or(Error::NoEligibleBackend)
    }
}
