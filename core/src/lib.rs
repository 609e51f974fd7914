//! REST request building and execution core.
//!
//! # Overview
//! Turns a declarative `CallDescription` into an `HttpRequest`, attaches the
//! session's auth token, hands the request to an injected `Transport`, and
//! classifies the result as success, business failure (`success: false`) or
//! transport failure, retrying the last kind per the caller's budget.
//!
//! # Design
//! - The host owns I/O: `Transport` sends, `KeyValueStore` persists.
//! - `TokenManager` is the single piece of state shared between clients.
//! - `RestClient::response` never returns an error; failures reach the
//!   caller through callbacks and everything else is logged with `tracing`.

pub mod body;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod store;
pub mod token;
pub mod transport;

pub use body::{Body, FilePart};
pub use client::{Attempts, Outcome, RestClient, Terminal};
pub use config::ClientConfig;
pub use error::{Failure, RestError, StoreError, TransportError};
pub use http::{FormField, FormValue, Headers, HttpMethod, HttpRequest, HttpResponse, QueryParams, RequestBody};
pub use model::{CallDescription, ContentType, Route};
pub use store::{KeyValueStore, MemoryStore, Scope};
pub use token::TokenManager;
pub use transport::Transport;
