//! Client-facing state and the statement router.

pub mod registry;
pub mod router;
pub mod sescmd;
pub mod session;
pub mod tmp_table;
pub mod transaction;

pub use registry::SessionRegistry;
pub use session::{Session, SessionState};
