//! Routing-target resolution.
//!
//! Pure function from (query type, transaction state, hints) to a
//! target bitfield. Side-effect free and total; hints are additive
//! qualifiers on everything except the forced-master cases.

use std::fmt::Display;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use tracing::{debug, warn};

use crate::classifier::QueryType;
use crate::net::Hint;

/// Where a statement may be routed. Combinable, e.g.
/// `SLAVE | RLAG_BOUNDED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteTarget(u8);

impl RouteTarget {
    pub const UNDEFINED: RouteTarget = RouteTarget(0);
    pub const MASTER: RouteTarget = RouteTarget(1);
    pub const SLAVE: RouteTarget = RouteTarget(1 << 1);
    pub const NAMED_SERVER: RouteTarget = RouteTarget(1 << 2);
    pub const ALL: RouteTarget = RouteTarget(1 << 3);
    /// Replica must satisfy a replication-lag bound.
    pub const RLAG_BOUNDED: RouteTarget = RouteTarget(1 << 4);
    pub const ANY: RouteTarget = RouteTarget(1 | 1 << 1 | 1 << 2);

    pub fn is(&self, target: RouteTarget) -> bool {
        self.0 & target.0 == target.0 && target.0 != 0
    }

    pub fn intersects(&self, target: RouteTarget) -> bool {
        self.0 & target.0 != 0
    }

    pub fn is_undefined(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for RouteTarget {
    type Output = RouteTarget;

    fn bitor(self, rhs: Self) -> Self::Output {
        RouteTarget(self.0 | rhs.0)
    }
}

impl BitOrAssign for RouteTarget {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for RouteTarget {
    type Output = RouteTarget;

    fn bitand(self, rhs: Self) -> Self::Output {
        RouteTarget(self.0 & rhs.0)
    }
}

impl Display for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_undefined() {
            return write!(f, "UNDEFINED");
        }
        let names = [
            (RouteTarget::MASTER, "MASTER"),
            (RouteTarget::SLAVE, "SLAVE"),
            (RouteTarget::NAMED_SERVER, "NAMED_SERVER"),
            (RouteTarget::ALL, "ALL"),
            (RouteTarget::RLAG_BOUNDED, "RLAG_BOUNDED"),
        ];
        let mut first = true;
        for (target, name) in names {
            if self.is(target) {
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

/// Examine the query type, transaction state and routing hints and
/// find the target for query routing.
///
/// `sysvars_to_master` reflects the `use_sql_variables_in = master`
/// configuration: variable reads then force the primary and variable
/// writes are not fanned out.
pub fn resolve(
    qtype: QueryType,
    trx_active: bool,
    sysvars_to_master: bool,
    hints: &[Hint],
) -> RouteTarget {
    let mut target = RouteTarget::UNDEFINED;

    // Session-state writes are not affected by hints.
    if qtype.is(QueryType::SESSION_WRITE)
        || qtype.is(QueryType::PREPARE_STMT)
        || qtype.is(QueryType::PREPARE_NAMED_STMT)
        || (!sysvars_to_master && qtype.is(QueryType::GSYSVAR_WRITE))
        || qtype.is(QueryType::ENABLE_AUTOCOMMIT)
        || qtype.is(QueryType::DISABLE_AUTOCOMMIT)
    {
        if qtype.is(QueryType::READ) {
            // Fanned-out SELECT results can't be reconciled into
            // one reply; pin the read part to the primary.
            warn!(
                "statement mixes a SELECT with SQL variable modifications and \
                 can't be routed to all backends; split it into two statements"
            );
            target = RouteTarget::MASTER;
        }
        target |= RouteTarget::ALL;
    } else if !trx_active
        && !qtype.is(QueryType::WRITE)
        && (qtype.is(QueryType::READ)
            || qtype.is(QueryType::SHOW_TABLES)
            || qtype.is(QueryType::USERVAR_READ)
            || qtype.is(QueryType::SYSVAR_READ)
            || qtype.is(QueryType::EXEC_STMT)
            || qtype.is(QueryType::GSYSVAR_READ))
    {
        // Expected target before hints are applied.
        if !qtype.is(QueryType::MASTER_READ)
            && (qtype.is(QueryType::READ)
                || qtype.is(QueryType::SHOW_TABLES)
                || (!sysvars_to_master
                    && (qtype.is(QueryType::USERVAR_READ)
                        || qtype.is(QueryType::SYSVAR_READ)
                        || qtype.is(QueryType::GSYSVAR_READ))))
        {
            target = RouteTarget::SLAVE;
        } else if qtype.is(QueryType::MASTER_READ)
            || qtype.is(QueryType::EXEC_STMT)
            || (sysvars_to_master
                && (qtype.is(QueryType::USERVAR_READ) || qtype.is(QueryType::SYSVAR_READ)))
        {
            target = RouteTarget::MASTER;
        }

        for hint in hints {
            match hint {
                Hint::Master => {
                    debug!("hint: route to master");
                    target = RouteTarget::MASTER;
                    break;
                }
                Hint::Slave => {
                    debug!("hint: route to slave");
                    target = RouteTarget::SLAVE;
                }
                Hint::NamedServer(name) => {
                    // Fallback stays whatever the target already was
                    // in case the name can't be resolved.
                    debug!(server = name.as_str(), "hint: route to named server");
                    target |= RouteTarget::NAMED_SERVER;
                }
                Hint::MaxReplicationLag(lag) => {
                    debug!(max_lag = lag, "hint: max replication lag");
                    target |= RouteTarget::RLAG_BOUNDED;
                }
            }
        }

        // If nothing matches then choose the master.
        if !target.intersects(RouteTarget::ALL | RouteTarget::SLAVE | RouteTarget::MASTER) {
            target = RouteTarget::MASTER;
        }
    } else {
        // Open transaction, a write, or anything else: hints don't
        // affect routing.
        target = RouteTarget::MASTER;
    }

    target
}
