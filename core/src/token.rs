//! Auth token state shared by every client in a process.
//!
//! # Design
//! `TokenManager` is a clonable handle to one `Option<String>`. All clones
//! observe the same value, so a token stored by a login on one client is
//! visible to the next call built on any other client. `global()` hands out
//! the process-wide instance; `new()` creates an isolated one.
//!
//! When no token is held, `resolve` re-hydrates it from the store: durable
//! scope first, then session scope. Store and lock failures degrade to
//! "no token" and are logged, never returned.

use std::sync::{Arc, OnceLock, RwLock};

use tracing::{debug, warn};

use crate::error::RestError;
use crate::store::{KeyValueStore, Scope};

/// Store key the token is persisted under.
pub const TOKEN_KEY: &str = "token";

static GLOBAL: OnceLock<TokenManager> = OnceLock::new();

#[derive(Debug, Clone, Default)]
pub struct TokenManager {
    token: Arc<RwLock<Option<String>>>,
}

impl TokenManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide token state.
    pub fn global() -> Self {
        GLOBAL.get_or_init(TokenManager::new).clone()
    }

    pub fn current(&self) -> Option<String> {
        match self.token.read() {
            Ok(token) => token.clone(),
            Err(_) => {
                warn!("token lock poisoned; treating as signed out");
                None
            }
        }
    }

    /// Store `token`, or clear the state when `None`.
    pub fn set(&self, token: Option<String>) -> Result<(), RestError> {
        let mut slot = self.token.write().map_err(|_| RestError::TokenState)?;
        *slot = token;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), RestError> {
        self.set(None)
    }

    /// In-memory token, falling back to the durable and then session scope.
    pub fn resolve(&self, store: &dyn KeyValueStore) -> Option<String> {
        if let Some(token) = self.current() {
            return Some(token);
        }
        let stored = match lookup(store) {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "token lookup failed");
                return None;
            }
        };
        let token = stored?;
        debug!("token restored from store");
        if let Err(err) = self.set(Some(token.clone())) {
            warn!(error = %err, "restored token not cached");
        }
        Some(token)
    }
}

fn lookup(store: &dyn KeyValueStore) -> Result<Option<String>, RestError> {
    if let Some(token) = store.get(TOKEN_KEY, Scope::Durable)? {
        return Ok(Some(token));
    }
    Ok(store.get(TOKEN_KEY, Scope::Session)?)
}
