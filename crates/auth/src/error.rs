use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing api key")]
    MissingKey,
    #[error("invalid api key")]
    InvalidKey,
}
