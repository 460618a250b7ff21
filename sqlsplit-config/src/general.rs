//! General settings for the routing core.

use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Error;
use super::router::{PolicyKind, UseSqlVariablesIn};

/// Root of the configuration file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: General,
}

impl Config {
    /// Load configuration from disk or use defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let config = read_to_string(path)?;
        Ok(toml::from_str(&config)?)
    }
}

/// Settings that apply to every session handled by the router.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct General {
    /// Routing policy.
    ///
    /// _Default:_ `read_write_split`
    #[serde(default)]
    pub policy: PolicyKind,

    /// Where statements touching SQL variables are routed.
    ///
    /// _Default:_ `master`
    #[serde(default)]
    pub use_sql_variables_in: UseSqlVariablesIn,

    /// Maximum number of replica connections a session fans
    /// session commands out to. Doubles as the tolerated number
    /// of dispatch failures before a fan-out is declared failed.
    ///
    /// _Default:_ `255`
    #[serde(default = "General::max_slave_connections")]
    pub max_slave_connections: usize,

    /// Default maximum acceptable replication lag, in seconds,
    /// for a replica to serve reads. `None` disables the check.
    ///
    /// _Default:_ unset
    #[serde(default)]
    pub max_replication_lag: Option<u64>,

    /// How many times a statement hitting a write conflict
    /// (deadlock, lock wait) is retried before the error is
    /// returned to the client.
    ///
    /// _Default:_ `3`
    #[serde(default = "General::max_write_conflict_retries")]
    pub max_write_conflict_retries: u32,

    /// Pin reads to the statement's hash node instead of load
    /// balancing them, guaranteeing reads see the node's own writes.
    ///
    /// _Default:_ `false`
    #[serde(default)]
    pub safe_reads: bool,
}

impl General {
    fn max_slave_connections() -> usize {
        255
    }

    fn max_write_conflict_retries() -> u32 {
        3
    }
}

impl Default for General {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            use_sql_variables_in: UseSqlVariablesIn::default(),
            max_slave_connections: Self::max_slave_connections(),
            max_replication_lag: None,
            max_write_conflict_retries: Self::max_write_conflict_retries(),
            safe_reads: false,
        }
    }
}
