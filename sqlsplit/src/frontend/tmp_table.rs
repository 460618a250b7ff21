//! Session-scoped temporary table tracking.
//!
//! Statements referencing a temporary table only exist on the node
//! that created it, so they get reclassified as master-affine.

use fnv::FnvHashSet;

use crate::classifier::{Classifier, QueryType};
use crate::net::Statement;

/// Usage counters, session scoped.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TempTableStats {
    pub created: u64,
    pub dropped: u64,
    pub queries: u64,
    pub writes: u64,
    pub reads: u64,
}

/// Map of fully-qualified temporary table names alive in a session.
#[derive(Debug, Default)]
pub struct TempTables {
    tables: FnvHashSet<String>,
    stats: TempTableStats,
}

impl TempTables {
    pub fn stats(&self) -> &TempTableStats {
        &self.stats
    }

    pub fn contains(&self, db: &str, table: &str) -> bool {
        self.tables.contains(&qualify(db, table))
    }

    /// Fold temporary-table effects into the query type.
    ///
    /// `CREATE TEMPORARY TABLE` registers the table, `DROP TABLE`
    /// unregisters it, and anything referencing a registered table
    /// gets [`QueryType::READ_TMP_TABLE`] added.
    pub fn reclassify(
        &mut self,
        db: &str,
        stmt: &Statement,
        qtype: QueryType,
        classifier: &dyn Classifier,
    ) -> QueryType {
        let mut qtype = qtype;
        let mut touched = 0u64;

        if qtype.is(QueryType::CREATE_TMP_TABLE) {
            if let Some(name) = classifier.created_table_name(stmt) {
                self.tables.insert(qualify(db, &name));
                self.stats.created += 1;
                touched += 1;
            }
        } else {
            let is_drop = classifier.is_drop_table(stmt);

            for name in classifier.table_names(stmt) {
                let key = qualify(db, &name);

                if is_drop {
                    if self.tables.remove(&key) {
                        self.stats.dropped += 1;
                        touched += 1;
                    }
                } else if self.tables.contains(&key) {
                    qtype |= QueryType::READ_TMP_TABLE;
                    touched += 1;

                    if qtype.is(QueryType::WRITE) {
                        self.stats.writes += 1;
                    } else {
                        self.stats.reads += 1;
                    }
                }
            }
        }

        if touched > 0 {
            self.stats.queries += 1;
        }

        qtype
    }
}

/// Qualify a table name with the session's default database
/// when it has none. Comparison is case-insensitive.
fn qualify(db: &str, table: &str) -> String {
    if table.contains('.') {
        table.to_lowercase()
    } else {
        format!("{}.{}", db, table).to_lowercase()
    }
}
