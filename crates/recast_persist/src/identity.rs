//! Identity-keyed old → counterpart map for one session.

use indexmap::IndexMap;
use recast_core::{IdentityKey, Value};

struct Entry {
    old: Value,
    new: Value,
}

/// Maps an original ("old") value to its freshly materialized counterpart.
///
/// Keys are identities, not equality: two equal but distinct objects get
/// separate entries. The old value is retained so its id stays meaningful for
/// the lifetime of the session.
#[derive(Default)]
pub struct IdentityRegistry {
    entries: IndexMap<IdentityKey, Entry>,
}

impl IdentityRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counterpart of `old`
    #[must_use]
    pub fn get(&self, old: &Value) -> Option<Value> {
        self.entries.get(&old.identity_key()).map(|e| e.new.clone())
    }

    /// Record `new` as the counterpart of `old`, returning the previous one
    pub fn put(&mut self, old: Value, new: Value) -> Option<Value> {
        self.entries
            .insert(old.identity_key(), Entry { old, new })
            .map(|e| e.new)
    }

    /// Forget the counterpart of `old`
    pub fn remove(&mut self, old: &Value) -> Option<Value> {
        self.entries.shift_remove(&old.identity_key()).map(|e| e.new)
    }

    /// Whether `old` has a counterpart
    #[must_use]
    pub fn contains(&self, old: &Value) -> bool {
        self.entries.contains_key(&old.identity_key())
    }

    /// Originals with a counterpart, in insertion order
    pub fn originals(&self) -> impl Iterator<Item = &Value> {
        self.entries.values().map(|e| &e.old)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries exist
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_core::types;

    fn object() -> Value {
        Value::object(types::class_for_name("Object").unwrap(), ())
    }

    #[test]
    fn test_identity_not_equality() {
        let mut registry = IdentityRegistry::new();
        let a = object();
        let b = object();
        registry.put(a.clone(), Value::Int(1));
        assert!(registry.get(&a).is_some());
        assert!(registry.get(&b).is_none());
    }

    #[test]
    fn test_put_replaces_and_remove() {
        let mut registry = IdentityRegistry::new();
        let a = object();
        registry.put(a.clone(), Value::Int(1));
        let previous = registry.put(a.clone(), Value::Int(2));
        assert!(previous.unwrap().same(&Value::Int(1)));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&a).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut registry = IdentityRegistry::new();
        registry.put(object(), Value::Null);
        registry.clear();
        assert!(registry.is_empty());
    }
}
