//! Session-scoped token storage.
//!
//! The token lifecycle treats session state as an external mapping of
//! scope name to field/value pairs, owned by whatever session mechanism
//! the host runs. Both sides of a submission check come in through
//! traits, so the manager never reads ambient request state and tests
//! run without a live request. [`MemoryStore`] is a process-local store
//! suitable for embedding and tests.

use std::collections::HashMap;

use dashmap::DashMap;

/// Session-scoped field/value storage.
///
/// Implementations are keyed by the current caller's session identity;
/// two sessions never observe each other's scopes.
pub trait TokenStore {
    /// Creates `namespace` with an empty mapping when absent. An
    /// existing mapping is left untouched.
    fn ensure(&self, namespace: &str);

    /// Reads one field; `None` when the field or the scope is absent.
    fn get(&self, namespace: &str, field: &str) -> Option<String>;

    /// Writes one field, replacing any prior value.
    fn put(&self, namespace: &str, field: &str, value: String);

    /// Deletes one field, reporting whether a value was present.
    fn remove(&self, namespace: &str, field: &str) -> bool;
}

/// In-memory [`TokenStore`] on a concurrent map.
///
/// An operation on one scope holds that scope's shard lock for its whole
/// duration, so read-modify-write sequences on a single scope do not
/// interleave.
#[derive(Debug, Default)]
pub struct MemoryStore {
    scopes: DashMap<String, HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryStore {
    fn ensure(&self, namespace: &str) {
        self.scopes.entry(namespace.to_string()).or_default();
    }

    fn get(&self, namespace: &str, field: &str) -> Option<String> {
        self.scopes
            .get(namespace)
            .and_then(|scope| scope.get(field).cloned())
    }

    fn put(&self, namespace: &str, field: &str, value: String) {
        self.scopes
            .entry(namespace.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    fn remove(&self, namespace: &str, field: &str) -> bool {
        self.scopes
            .get_mut(namespace)
            .map_or(false, |mut scope| scope.remove(field).is_some())
    }
}

/// Read access to the submitted form of the current request.
pub trait FormSource {
    /// The submitted value of `name`, when the form carried one.
    fn field(&self, name: &str) -> Option<String>;
}

/// Owned field/value pairs implementing [`FormSource`].
#[derive(Debug, Default, Clone)]
pub struct FormFields {
    fields: HashMap<String, String>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one submitted field, replacing any prior value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl FormSource for FormFields {
    fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }
}
