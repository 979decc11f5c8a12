//! Crate-wide error type.
//!
//! Every failure is surfaced to the caller of the operation that triggered it;
//! the engine never retries or swallows one.
use thiserror::Error;

use crate::{
    auth::AuthError,
    config::ConfigError,
    frame::FrameError,
    protocol::{CodecError, ProtocolError, TransportError},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no active connection")]
    NotOpen,

    #[error("connection '{0}' is already open")]
    AlreadyOpen(String),

    #[error("transport error {status}: {body}")]
    Transport { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] TransportError),

    #[error(transparent)]
    Protocol(ProtocolError),

    #[error("codec error: {0}")]
    Codec(CodecError),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("expected {expected}, server sent {actual}")]
    UnexpectedResponse {
        expected: &'static str,
        actual: &'static str,
    },
}

impl From<CodecError> for Error {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::Remote(e) => Error::Protocol(e),
            other => Error::Codec(other),
        }
    }
}

impl Error {
    /// State errors are raised before any network call.
    pub fn is_state(&self) -> bool {
        matches!(self, Error::NotOpen | Error::AlreadyOpen(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
