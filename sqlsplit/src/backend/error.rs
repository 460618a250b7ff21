//! Backend errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no backend \"{0}\" in topology")]
    UnknownBackend(String),

    #[error("backend \"{0}\" refused connection")]
    ConnectFailed(String),

    #[error("write to backend \"{0}\" rejected")]
    WriteFailed(String),
}
