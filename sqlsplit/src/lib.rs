//! sqlsplit: statement-level query router for a SQL database proxy.
//!
//! One client connection, many backend connections. The router decides
//! per statement which backend(s) receive it, replicates session state
//! changes to all of them in order, and reassembles replies.

pub mod backend;
pub mod classifier;
pub mod config;
pub mod frontend;
pub mod logger;
pub mod net;
pub mod stats;

pub use frontend::router::Router;
pub use frontend::Session;
