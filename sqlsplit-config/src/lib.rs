// Submodules
pub mod error;
pub mod general;
pub mod router;

pub use error::Error;
pub use general::{Config, General};
pub use router::{PolicyKind, Role, UseSqlVariablesIn};
