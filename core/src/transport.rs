//! The network capability the executor depends on.
//!
//! # Design
//! The host owns the HTTP stack. `send` returns once the outcome of one
//! attempt is known, so the executor never has two attempts in flight for
//! the same call. Whether a non-2xx status is a response or a
//! `TransportError::Status` is the transport's decision.

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}
