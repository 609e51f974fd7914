//! Two-scope key-value storage for session data.
//!
//! # Design
//! The store is an injected capability. Values are text; `set_value` turns
//! any other JSON value into JSON text before it is written. `MemoryStore`
//! keeps both scopes in process memory and is what tests and embedders
//! without a persistent backend use.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::error::StoreError;

/// Named partition of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Survives restarts.
    Durable,
    /// Lives as long as the current session.
    Session,
}

/// Scoped text storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str, scope: Scope) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str, scope: Scope) -> Result<(), StoreError>;
    fn remove(&self, key: &str, scope: Scope) -> Result<(), StoreError>;
    fn clear(&self, scope: Scope) -> Result<(), StoreError>;
    /// All keys in `scope`.
    fn keys(&self, scope: Scope) -> Result<Vec<String>, StoreError>;

    fn len(&self, scope: Scope) -> Result<usize, StoreError> {
        Ok(self.keys(scope)?.len())
    }
}

/// Store `value` under `key`: strings verbatim, anything else as JSON text.
pub fn set_value(
    store: &dyn KeyValueStore,
    key: &str,
    value: &Value,
    scope: Scope,
) -> Result<(), StoreError> {
    match value {
        Value::String(text) => store.set(key, text, scope),
        other => {
            let text = serde_json::to_string(other).map_err(|e| StoreError::Serialize(e.to_string()))?;
            store.set(key, &text, scope)
        }
    }
}

/// In-memory store with one map per scope.
#[derive(Debug, Default)]
pub struct MemoryStore {
    durable: RwLock<BTreeMap<String, String>>,
    session: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope(&self, scope: Scope) -> &RwLock<BTreeMap<String, String>> {
        match scope {
            Scope::Durable => &self.durable,
            Scope::Session => &self.session,
        }
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str, scope: Scope) -> Result<Option<String>, StoreError> {
        Ok(self.scope(scope).read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str, scope: Scope) -> Result<(), StoreError> {
        self.scope(scope)
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str, scope: Scope) -> Result<(), StoreError> {
        self.scope(scope).write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn clear(&self, scope: Scope) -> Result<(), StoreError> {
        self.scope(scope).write().map_err(poisoned)?.clear();
        Ok(())
    }

    fn keys(&self, scope: Scope) -> Result<Vec<String>, StoreError> {
        Ok(self.scope(scope).read().map_err(poisoned)?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scopes_are_independent() {
        let store = MemoryStore::new();
        store.set("token", "durable", Scope::Durable).unwrap();
        store.set("token", "session", Scope::Session).unwrap();
        assert_eq!(store.get("token", Scope::Durable).unwrap().as_deref(), Some("durable"));
        assert_eq!(store.get("token", Scope::Session).unwrap().as_deref(), Some("session"));

        store.clear(Scope::Session).unwrap();
        assert_eq!(store.get("token", Scope::Session).unwrap(), None);
        assert_eq!(store.len(Scope::Durable).unwrap(), 1);
    }

    #[test]
    fn remove_and_enumerate() {
        let store = MemoryStore::new();
        store.set("b", "2", Scope::Durable).unwrap();
        store.set("a", "1", Scope::Durable).unwrap();
        assert_eq!(store.keys(Scope::Durable).unwrap(), vec!["a", "b"]);
        store.remove("a", Scope::Durable).unwrap();
        assert_eq!(store.keys(Scope::Durable).unwrap(), vec!["b"]);
    }

    #[test]
    fn set_value_keeps_text_and_serializes_the_rest() {
        let store = MemoryStore::new();
        set_value(&store, "token", &json!("abc"), Scope::Session).unwrap();
        set_value(&store, "user", &json!({"name": "ada"}), Scope::Session).unwrap();
        assert_eq!(store.get("token", Scope::Session).unwrap().as_deref(), Some("abc"));
        assert_eq!(
            store.get("user", Scope::Session).unwrap().as_deref(),
            Some(r#"{"name":"ada"}"#)
        );
    }
}
