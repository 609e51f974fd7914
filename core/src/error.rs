//! Error types for the REST layer.
//!
//! # Design
//! Errors are split by who sees them. `TransportError` and `StoreError`
//! belong to the injected collaborators. `RestError` covers orchestration
//! problems and never leaves `RestClient::response`; it is logged there.
//! `Failure` is what the caller's failure callback receives: either a
//! well-formed response that reported `success: false`, or a transport error.

use thiserror::Error;

use crate::http::HttpResponse;

/// Errors raised by a `Transport`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The peer could not be reached or the connection dropped.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The transport treats this status as an error (e.g. 5xx).
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The transport cannot send this kind of request.
    #[error("unsupported request: {0}")]
    Unsupported(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Errors raised by a `KeyValueStore`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("value could not be serialized: {0}")]
    Serialize(String),
}

/// Orchestration errors inside the executor.
#[derive(Debug, Error)]
pub enum RestError {
    /// `response` was called before `get`/`post`/`update`/`delete`/`login`.
    #[error("no request prepared")]
    NotPrepared,

    #[error("token state unavailable: lock poisoned")]
    TokenState,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A login response carried no string `token` field.
    #[error("login response has no token")]
    MissingToken,
}

/// Outcome handed to the caller's failure callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Structured response with a falsy `success` field. Never retried.
    Business(HttpResponse),
    /// Transport-level error. Retried per the call's attempt budget.
    Transport(TransportError),
}

impl Failure {
    /// `code` field of a business-failure payload, when it is a string.
    pub fn code(&self) -> Option<String> {
        match self {
            Failure::Business(response) => response
                .json()
                .ok()?
                .get("code")?
                .as_str()
                .map(str::to_string),
            Failure::Transport(_) => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Failure::Transport(_))
    }
}
