//! Backend topology registry.
//!
//! Read-mostly, shared between sessions; the only shared resource
//! the routing core touches.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Role;

use super::{BackendConnection, Error};

/// One server known to the topology.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    pub name: String,
    pub role: Role,
    /// Node is a full cluster member and may take traffic.
    pub joined: bool,
}

/// Server-health and membership registry.
pub trait Topology: Send + Sync + Debug {
    /// Current members, in registration order.
    fn backends(&self) -> Vec<BackendDescriptor>;

    /// Establish a connection to the named member. Each call yields
    /// a connection owned by the calling session alone.
    fn connect(&self, name: &str) -> Result<Arc<dyn BackendConnection>, Error>;
}

type Factory = Box<dyn Fn() -> Arc<dyn BackendConnection> + Send + Sync>;

struct Entry {
    descriptor: BackendDescriptor,
    factory: Factory,
}

impl Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.descriptor.fmt(f)
    }
}

/// In-process topology over per-member connection factories.
///
/// Embedders running a real cluster implement [`Topology`] against
/// their own discovery; this one serves tests and single-process
/// deployments. Membership changes arrive through [`Self::add`],
/// [`Self::set_joined`] and [`Self::remove`], the way a monitor
/// would report them.
#[derive(Debug, Default)]
pub struct StaticTopology {
    entries: RwLock<Vec<Entry>>,
}

impl StaticTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member and the factory that opens connections
    /// to it.
    pub fn add(
        &self,
        name: &str,
        role: Role,
        factory: impl Fn() -> Arc<dyn BackendConnection> + Send + Sync + 'static,
    ) {
        let descriptor = BackendDescriptor {
            name: name.to_owned(),
            role,
            joined: true,
        };
        self.entries.write().push(Entry {
            descriptor,
            factory: Box::new(factory),
        });
    }

    /// Record a membership change for a known member.
    pub fn set_joined(&self, name: &str, joined: bool) {
        for entry in self.entries.write().iter_mut() {
            if entry.descriptor.name == name {
                entry.descriptor.joined = joined;
            }
        }
    }

    /// Drop a member, e.g. when the monitor declares it gone.
    pub fn remove(&self, name: &str) {
        self.entries
            .write()
            .retain(|entry| entry.descriptor.name != name);
    }
}

impl Topology for StaticTopology {
    fn backends(&self) -> Vec<BackendDescriptor> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    fn connect(&self, name: &str) -> Result<Arc<dyn BackendConnection>, Error> {
        let entries = self.entries.read();
        let entry = entries
            .iter()
            .find(|entry| entry.descriptor.name == name)
            .ok_or_else(|| Error::UnknownBackend(name.to_owned()))?;

        if !entry.descriptor.joined {
            return Err(Error::ConnectFailed(name.to_owned()));
        }

        let conn = (entry.factory)();
        if !conn.is_healthy() {
            return Err(Error::ConnectFailed(name.to_owned()));
        }
        Ok(conn)
    }
}
