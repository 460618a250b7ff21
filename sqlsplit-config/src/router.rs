//! Router policy settings.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of a backend server in the topology.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Ord, PartialOrd, Eq, Hash, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Primary database that serves writes (and reads) (default).
    #[default]
    Primary,
    /// Replica that can only serve reads.
    Replica,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Replica => write!(f, "replica"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "replica" => Ok(Self::Replica),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Which routing policy the statement router runs.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Split reads to replicas and writes to the primary (default).
    #[default]
    ReadWriteSplit,
    /// Multi-writer cluster; avoid write conflicts by pinning
    /// statements to nodes selected by table-name hash.
    ConflictAvoiding,
    /// Route by schema name to the matching shard.
    SchemaSharded,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "readwritesplit" => Ok(Self::ReadWriteSplit),
            "conflictavoiding" => Ok(Self::ConflictAvoiding),
            "schemasharded" => Ok(Self::SchemaSharded),
            _ => Err(format!("Invalid router policy: {}", s)),
        }
    }
}

/// Where statements reading or writing SQL variables are routed.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum UseSqlVariablesIn {
    /// Variable reads and writes go to the primary only (default).
    #[default]
    Master,
    /// Variable writes fan out to all backends; reads may use replicas.
    All,
}

impl UseSqlVariablesIn {
    /// Variables are pinned to the primary.
    pub fn master_only(&self) -> bool {
        matches!(self, Self::Master)
    }
}
