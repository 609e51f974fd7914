//! Request executor: builds, authenticates, sends, classifies and retries.
//!
//! # Design
//! A call goes through `prepare` (one of `get`/`post`/`update`/`delete`/
//! `login`/`logout`) and then `response`. Each attempt clones the prepared
//! request, attaches the auth token as a `token` query parameter when the
//! call requires auth, and hands it to the transport.
//!
//! The outcome of an attempt is one of:
//! - a response whose JSON has no `success` field, a truthy one, or is not
//!   JSON at all: success. The completion hook (login/logout bookkeeping)
//!   runs first, then the caller's success callback.
//! - a JSON response with a falsy `success`: business failure. The failure
//!   callback gets the raw response. Never retried.
//! - a transport error: the failure callback gets the error, then the
//!   attempt budget decides whether to send again. Retries fire immediately.
//!
//! `response` never returns an error. Orchestration problems are logged and
//! reported only through the returned `Outcome`.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::body::Body;
use crate::config::ClientConfig;
use crate::error::{Failure, RestError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, QueryParams};
use crate::model::{self, CallDescription};
use crate::store::{self, KeyValueStore, Scope};
use crate::token::{TokenManager, TOKEN_KEY};
use crate::transport::Transport;

/// Store key the logged-in user is persisted under.
pub const USER_KEY: &str = "user";

/// Query parameter carrying the auth token.
pub const TOKEN_PARAM: &str = "token";

/// Retry budget for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attempts {
    /// Send once.
    #[default]
    None,
    /// Send up to `n` more times after a transport failure.
    Limited(u32),
    /// Keep sending until something other than a transport failure happens.
    Unbounded,
}

impl Attempts {
    /// Budget left after one retry, or `None` when no retry is allowed.
    fn next(self) -> Option<Attempts> {
        match self {
            Attempts::None | Attempts::Limited(0) => None,
            Attempts::Limited(n) => Some(Attempts::Limited(n - 1)),
            Attempts::Unbounded => Some(Attempts::Unbounded),
        }
    }
}

impl From<i32> for Attempts {
    /// `-1` is unbounded, positive values are limited, anything else is none.
    fn from(value: i32) -> Self {
        match value {
            -1 => Attempts::Unbounded,
            n if n > 0 => Attempts::Limited(n.unsigned_abs()),
            _ => Attempts::None,
        }
    }
}

/// How a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Succeeded,
    BusinessFailure,
    TransportFailure,
    /// An orchestration error stopped the call; nothing was reported to the
    /// caller's callbacks after it.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub state: Terminal,
    /// Number of times the transport was invoked.
    pub attempts: u32,
}

/// Bookkeeping run on success before the caller's callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Login { remember: bool },
    Logout,
}

/// REST executor bound to a transport, a store and token state.
pub struct RestClient {
    config: ClientConfig,
    base: String,
    url: String,
    auth: bool,
    prepared: Option<HttpRequest>,
    completion: Option<Completion>,
    tokens: TokenManager,
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
}

impl RestClient {
    /// Client with default configuration and the process-wide token state.
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::from_config(ClientConfig::default(), transport, store)
    }

    pub fn from_config(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let base = config.base_url.trim_end_matches('/').to_string();
        Self {
            url: base.clone(),
            base,
            config,
            auth: false,
            prepared: None,
            completion: None,
            tokens: TokenManager::global(),
            store,
            transport,
        }
    }

    /// Use `tokens` instead of the process-wide token state.
    pub fn with_tokens(mut self, tokens: TokenManager) -> Self {
        self.tokens = tokens;
        self
    }

    /// Change the base URL. Takes effect at the next route selection.
    pub fn set_base(&mut self, base: &str) {
        self.base = base.trim_end_matches('/').to_string();
    }

    pub fn base(&mut self, base: &str) -> &mut Self {
        self.set_base(base);
        self
    }

    /// Select the endpoint subsequent calls are built against.
    pub fn set_route(&mut self, route: &str) {
        let route = route.trim_start_matches('/');
        self.url = if route.is_empty() {
            self.base.clone()
        } else {
            format!("{}/{route}", self.base)
        };
    }

    pub fn route(&mut self, route: &str) -> &mut Self {
        self.set_route(route);
        self
    }

    /// URL of the selected route.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn get(&mut self, description: CallDescription) -> &mut Self {
        self.prepare(HttpMethod::Get, description, None)
    }

    pub fn post(&mut self, description: CallDescription) -> &mut Self {
        self.prepare(HttpMethod::Post, description, None)
    }

    pub fn update(&mut self, description: CallDescription) -> &mut Self {
        self.prepare(HttpMethod::Put, description, None)
    }

    pub fn delete(&mut self, description: CallDescription) -> &mut Self {
        self.prepare(HttpMethod::Delete, description, None)
    }

    /// POST `body` to the login route. On success the returned `user` and
    /// `token` are persisted in the durable scope when `remember` is set,
    /// the session scope otherwise, and the token becomes current.
    pub fn login(&mut self, body: impl Into<Body>, remember: bool) -> &mut Self {
        let route = self.config.login_route.clone();
        self.set_route(&route);
        let description = CallDescription::new()
            .body(body)
            .query("remember", remember);
        self.prepare(
            HttpMethod::Post,
            description,
            Some(Completion::Login { remember }),
        )
    }

    /// POST to the logout route. On success the token is cleared and the
    /// persisted `user` and `token` are removed from both scopes.
    pub fn logout(&mut self) -> &mut Self {
        let route = self.config.logout_route.clone();
        self.set_route(&route);
        self.prepare(HttpMethod::Post, CallDescription::new(), Some(Completion::Logout))
    }

    /// The request the next `response` call will send, before token injection.
    pub fn prepared(&self) -> Option<&HttpRequest> {
        self.prepared.as_ref()
    }

    pub fn token(&self) -> Option<String> {
        self.tokens.current()
    }

    pub fn set_token(&mut self, token: Option<String>) -> Result<(), RestError> {
        self.auth = token.is_some();
        self.tokens.set(token)
    }

    pub fn clear_token(&mut self) -> Result<(), RestError> {
        self.set_token(None)
    }

    /// Whether the next attempt will try to attach a token.
    pub fn auth(&self) -> bool {
        self.auth
    }

    fn prepare(
        &mut self,
        method: HttpMethod,
        description: CallDescription,
        completion: Option<Completion>,
    ) -> &mut Self {
        let request = model::build(method, &self.url, description, self.config.max_form_depth);
        self.auth = request.auth;
        self.prepared = Some(request);
        self.completion = completion;
        self
    }

    /// Send the prepared request and dispatch its outcome.
    ///
    /// `on_failure` runs for every failed attempt, including ones that are
    /// retried.
    pub fn response(
        &mut self,
        mut on_success: impl FnMut(&HttpResponse),
        mut on_failure: impl FnMut(&Failure),
        attempts: impl Into<Attempts>,
    ) -> Outcome {
        match self.run(&mut on_success, &mut on_failure, attempts.into()) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "request aborted");
                Outcome {
                    state: Terminal::Aborted,
                    attempts: 0,
                }
            }
        }
    }

    fn run(
        &mut self,
        on_success: &mut dyn FnMut(&HttpResponse),
        on_failure: &mut dyn FnMut(&Failure),
        attempts: Attempts,
    ) -> Result<Outcome, RestError> {
        let prepared = self.prepared.clone().ok_or(RestError::NotPrepared)?;
        let mut remaining = attempts;
        let mut sent = 0;

        loop {
            let mut request = prepared.clone();
            if self.auth {
                self.authenticate(&mut request);
            }

            sent += 1;
            debug!(method = request.method.as_str(), url = %request.url, attempt = sent, "sending request");

            match self.transport.send(&request) {
                Ok(response) => {
                    let state = self.dispatch(response, on_success, on_failure);
                    return Ok(Outcome {
                        state,
                        attempts: sent,
                    });
                }
                Err(err) => {
                    error!(url = %request.url, attempt = sent, error = %err, "transport failure");
                    on_failure(&Failure::Transport(err));
                    match remaining.next() {
                        Some(next) => remaining = next,
                        None => {
                            return Ok(Outcome {
                                state: Terminal::TransportFailure,
                                attempts: sent,
                            })
                        }
                    }
                }
            }
        }
    }

    fn authenticate(&self, request: &mut HttpRequest) {
        if let Some(token) = self.tokens.resolve(self.store.as_ref()) {
            request
                .query
                .get_or_insert_with(QueryParams::new)
                .set(TOKEN_PARAM, token);
        }
    }

    fn dispatch(
        &mut self,
        response: HttpResponse,
        on_success: &mut dyn FnMut(&HttpResponse),
        on_failure: &mut dyn FnMut(&Failure),
    ) -> Terminal {
        if let Ok(value) = response.json() {
            if is_business_failure(&value) {
                let code = value.get("code").and_then(Value::as_str).unwrap_or_default();
                warn!(status = response.status, code, "business failure");
                on_failure(&Failure::Business(response));
                return Terminal::BusinessFailure;
            }
        }

        if let Err(err) = self.complete(&response) {
            error!(error = %err, "completion hook failed");
            return Terminal::Aborted;
        }
        on_success(&response);
        Terminal::Succeeded
    }

    fn complete(&mut self, response: &HttpResponse) -> Result<(), RestError> {
        match self.completion {
            Some(Completion::Login { remember }) => self.persist_login(response, remember),
            Some(Completion::Logout) => self.forget_login(),
            None => Ok(()),
        }
    }

    fn persist_login(&mut self, response: &HttpResponse, remember: bool) -> Result<(), RestError> {
        let value = response.json().map_err(|_| RestError::MissingToken)?;
        let token = value
            .get("token")
            .and_then(Value::as_str)
            .ok_or(RestError::MissingToken)?
            .to_string();
        let user = value.get("user").cloned().unwrap_or(Value::Null);
        let scope = if remember { Scope::Durable } else { Scope::Session };

        store::set_value(self.store.as_ref(), USER_KEY, &user, scope)?;
        store::set_value(self.store.as_ref(), TOKEN_KEY, &Value::String(token.clone()), scope)?;
        self.set_token(Some(token))
    }

    fn forget_login(&mut self) -> Result<(), RestError> {
        self.clear_token()?;
        for scope in [Scope::Durable, Scope::Session] {
            self.store.remove(USER_KEY, scope)?;
            self.store.remove(TOKEN_KEY, scope)?;
        }
        Ok(())
    }
}

/// `success` is present, not null, and not loosely equal to `true`.
fn is_business_failure(value: &Value) -> bool {
    match value.get("success") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => !flag,
        Some(Value::Number(n)) => n.as_f64() != Some(1.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok() != Some(1.0),
        Some(_) => true,
    }
}
