//! Session transaction and autocommit state tracking.

use crate::classifier::QueryType;

/// Commit-mode state machine for one session.
///
/// Autocommit starts on with no transaction open. Disabling
/// autocommit or an explicit `BEGIN` opens a transaction; the primary
/// then gets every statement until the transaction closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionState {
    autocommit: bool,
    trx_active: bool,
}

impl Default for TransactionState {
    fn default() -> Self {
        Self {
            autocommit: true,
            trx_active: false,
        }
    }
}

impl TransactionState {
    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    pub fn active(&self) -> bool {
        self.trx_active
    }

    /// Apply one statement's effect on the commit mode.
    ///
    /// Transition order matters: autocommit changes are evaluated
    /// around the explicit `BEGIN`/`COMMIT`/`ROLLBACK` checks.
    pub fn update(&mut self, qtype: QueryType) {
        if self.autocommit && qtype.is(QueryType::DISABLE_AUTOCOMMIT) {
            self.autocommit = false;

            if !self.trx_active {
                self.trx_active = true;
            }
        } else if !self.trx_active && qtype.is(QueryType::BEGIN_TRX) {
            self.trx_active = true;
        }

        // Explicit COMMIT and ROLLBACK, implicit COMMIT.
        if self.autocommit
            && self.trx_active
            && (qtype.is(QueryType::COMMIT) || qtype.is(QueryType::ROLLBACK))
        {
            self.trx_active = false;
        } else if !self.autocommit && qtype.is(QueryType::ENABLE_AUTOCOMMIT) {
            self.autocommit = true;
            self.trx_active = false;
        }
    }
}
