//! Statement classifier interface.
//!
//! Classification itself lives outside this crate. The router only
//! consumes the query-type bitmask and the extracted table names.

use std::fmt::Display;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::net::Statement;

/// Query type bitmask.
///
/// A statement can be several things at once, e.g. a `SET` that
/// also contains a `SELECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryType(u32);

impl QueryType {
    pub const UNKNOWN: QueryType = QueryType(0);
    /// Any `SELECT`.
    pub const READ: QueryType = QueryType(1);
    /// Data-modifying statement.
    pub const WRITE: QueryType = QueryType(1 << 1);
    /// Read that must see the primary's data.
    pub const MASTER_READ: QueryType = QueryType(1 << 2);
    /// Connection-scoped state change, e.g. `SET`, `USE`.
    pub const SESSION_WRITE: QueryType = QueryType(1 << 3);
    /// Read of a user variable.
    pub const USERVAR_READ: QueryType = QueryType(1 << 4);
    /// Read of a system variable.
    pub const SYSVAR_READ: QueryType = QueryType(1 << 5);
    /// Read of a global system variable.
    pub const GSYSVAR_READ: QueryType = QueryType(1 << 6);
    /// Write to a global system variable.
    pub const GSYSVAR_WRITE: QueryType = QueryType(1 << 7);
    /// `SHOW TABLES`.
    pub const SHOW_TABLES: QueryType = QueryType(1 << 8);
    /// `CREATE TEMPORARY TABLE`.
    pub const CREATE_TMP_TABLE: QueryType = QueryType(1 << 9);
    /// Statement referencing a known temporary table.
    pub const READ_TMP_TABLE: QueryType = QueryType(1 << 10);
    /// `BEGIN` or `START TRANSACTION`.
    pub const BEGIN_TRX: QueryType = QueryType(1 << 11);
    pub const COMMIT: QueryType = QueryType(1 << 12);
    pub const ROLLBACK: QueryType = QueryType(1 << 13);
    /// `SET autocommit=1`.
    pub const ENABLE_AUTOCOMMIT: QueryType = QueryType(1 << 14);
    /// `SET autocommit=0`.
    pub const DISABLE_AUTOCOMMIT: QueryType = QueryType(1 << 15);
    /// Prepared statement creation from text.
    pub const PREPARE_STMT: QueryType = QueryType(1 << 16);
    /// Named prepared statement creation.
    pub const PREPARE_NAMED_STMT: QueryType = QueryType(1 << 17);
    /// Prepared statement execution.
    pub const EXEC_STMT: QueryType = QueryType(1 << 18);

    /// The bitmask contains all bits of `other`.
    pub fn is(&self, other: QueryType) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// The bitmask contains any bit of `other`.
    pub fn intersects(&self, other: QueryType) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for QueryType {
    type Output = QueryType;

    fn bitor(self, rhs: Self) -> Self::Output {
        QueryType(self.0 | rhs.0)
    }
}

impl BitOrAssign for QueryType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for QueryType {
    type Output = QueryType;

    fn bitand(self, rhs: Self) -> Self::Output {
        QueryType(self.0 & rhs.0)
    }
}

impl Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unknown() {
            return write!(f, "UNKNOWN");
        }

        let names = [
            (Self::READ, "READ"),
            (Self::WRITE, "WRITE"),
            (Self::MASTER_READ, "MASTER_READ"),
            (Self::SESSION_WRITE, "SESSION_WRITE"),
            (Self::USERVAR_READ, "USERVAR_READ"),
            (Self::SYSVAR_READ, "SYSVAR_READ"),
            (Self::GSYSVAR_READ, "GSYSVAR_READ"),
            (Self::GSYSVAR_WRITE, "GSYSVAR_WRITE"),
            (Self::SHOW_TABLES, "SHOW_TABLES"),
            (Self::CREATE_TMP_TABLE, "CREATE_TMP_TABLE"),
            (Self::READ_TMP_TABLE, "READ_TMP_TABLE"),
            (Self::BEGIN_TRX, "BEGIN_TRX"),
            (Self::COMMIT, "COMMIT"),
            (Self::ROLLBACK, "ROLLBACK"),
            (Self::ENABLE_AUTOCOMMIT, "ENABLE_AUTOCOMMIT"),
            (Self::DISABLE_AUTOCOMMIT, "DISABLE_AUTOCOMMIT"),
            (Self::PREPARE_STMT, "PREPARE_STMT"),
            (Self::PREPARE_NAMED_STMT, "PREPARE_NAMED_STMT"),
            (Self::EXEC_STMT, "EXEC_STMT"),
        ];

        let mut first = true;
        for (flag, name) in names {
            if self.is(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Statement classifier, provided by the embedding proxy.
pub trait Classifier: Send + Sync {
    /// Classify a statement into a query-type bitmask.
    /// [`QueryType::UNKNOWN`] when the statement can't be parsed.
    fn classify(&self, stmt: &Statement) -> QueryType;

    /// Table names the statement references, as `table` or
    /// `db.table`, in statement order.
    fn table_names(&self, stmt: &Statement) -> Vec<String>;

    /// Name of the table a `CREATE [TEMPORARY] TABLE` creates.
    fn created_table_name(&self, stmt: &Statement) -> Option<String>;

    /// Statement changes connection-scoped server state and must
    /// be replayed on every backend.
    fn is_session_command(&self, stmt: &Statement) -> bool;

    /// Statement opens a transaction.
    fn is_begin(&self, stmt: &Statement) -> bool;

    /// Statement is a `DROP TABLE`.
    fn is_drop_table(&self, stmt: &Statement) -> bool;
}
