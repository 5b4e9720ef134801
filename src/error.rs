// Allow module inception for error types - this is a common Rust pattern
#![allow(clippy::module_name_repetitions)]

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Load error: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote error: endpoint returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Write error: {0}")]
    Write(String),
}

pub type BatchResult<T> = Result<T, BatchError>;
