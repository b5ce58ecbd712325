// src/error.rs
//
// Failure taxonomy shared by every operation in the library.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or blank required input. Nothing was touched.
    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Mailbox lacks host, user or password; no connection was attempted.
    #[error("Missing mailbox credentials: {0}")]
    MissingCredentials(String),

    /// Provider credential or other configuration missing before any network call.
    #[error("{0}")]
    Configuration(String),

    #[error("IMAP failure: {0}")]
    Connection(String),

    #[error("{provider} error: {detail}")]
    Provider { provider: String, detail: String },

    #[error("Classification failed: {0}")]
    ResponseParse(String),

    #[error("Store failure at {path}: {detail}")]
    Store { path: String, detail: String },
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound { kind, id: id.into() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn connection(err: impl std::fmt::Display) -> Self {
        Error::Connection(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
