//! Backend connections and topology.

pub mod connection;
pub mod error;
pub mod reference;
pub mod topology;

pub use connection::{BackendConnection, ChannelConnection};
pub use error::Error;
pub use reference::{BackendRef, RefState};
pub use topology::{BackendDescriptor, StaticTopology, Topology};
