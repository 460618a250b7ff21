//! Router errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Backend(#[from] crate::backend::Error),

    #[error("no backend satisfies routing target")]
    NoEligibleBackend,

    #[error("session has no master node")]
    NoMaster,

    #[error("all backends are unreachable")]
    TopologyExhausted,

    #[error("session is closed")]
    SessionClosed,
}
