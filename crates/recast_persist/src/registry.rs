//! Delegate registry: type → persistence delegate, process-wide.
//!
//! Lookup precedence is fixed: exact registration, then list, collection,
//! map, array, proxy, the type's own hint, and finally the default delegate.

use crate::array::ArrayPersistenceDelegate;
use crate::collection::{
    CollectionPersistenceDelegate, MappingPersistenceDelegate, SequencePersistenceDelegate,
};
use crate::constant::ConstantPersistenceDelegate;
use crate::delegate::{DefaultPersistenceDelegate, PersistenceDelegate};
use crate::proxy::ProxyPersistenceDelegate;
use crate::value::ValuePersistenceDelegate;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use recast_core::{ClassInfo, PersistenceHint, builtins, types};
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of persistence delegates
pub struct DelegateRegistry {
    exact: IndexMap<String, Arc<dyn PersistenceDelegate>>,
    named: IndexMap<String, Arc<dyn PersistenceDelegate>>,
    sequence: Arc<dyn PersistenceDelegate>,
    collection: Arc<dyn PersistenceDelegate>,
    mapping: Arc<dyn PersistenceDelegate>,
    array: Arc<dyn PersistenceDelegate>,
    proxy: Arc<dyn PersistenceDelegate>,
    value: Arc<dyn PersistenceDelegate>,
    constant: Arc<dyn PersistenceDelegate>,
    fallback: Arc<dyn PersistenceDelegate>,
}

impl DelegateRegistry {
    /// Create a registry holding only the built-in strategies
    #[must_use]
    pub fn new() -> Self {
        Self {
            exact: IndexMap::new(),
            named: IndexMap::new(),
            sequence: Arc::new(SequencePersistenceDelegate::new()),
            collection: Arc::new(CollectionPersistenceDelegate::new()),
            mapping: Arc::new(MappingPersistenceDelegate::new()),
            array: Arc::new(ArrayPersistenceDelegate),
            proxy: Arc::new(ProxyPersistenceDelegate),
            value: Arc::new(ValuePersistenceDelegate),
            constant: Arc::new(ConstantPersistenceDelegate),
            fallback: Arc::new(DefaultPersistenceDelegate::new()),
        }
    }

    /// Register a delegate for exactly `type_name`; replaces any earlier one
    pub fn register(&mut self, type_name: impl Into<String>, delegate: Arc<dyn PersistenceDelegate>) {
        self.exact.insert(type_name.into(), delegate);
    }

    /// Register a delegate under a hint key (`PersistenceHint::Named`)
    pub fn register_named(&mut self, key: impl Into<String>, delegate: Arc<dyn PersistenceDelegate>) {
        self.named.insert(key.into(), delegate);
    }

    /// Remove an exact registration
    pub fn unregister(&mut self, type_name: &str) -> Option<Arc<dyn PersistenceDelegate>> {
        self.exact.shift_remove(type_name)
    }

    /// Names with an exact registration
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.exact.keys().cloned().collect()
    }

    /// Delegate for `class`
    #[must_use]
    pub fn lookup(&self, class: &ClassInfo) -> Arc<dyn PersistenceDelegate> {
        if let Some(delegate) = self.exact.get(class.name()) {
            return Arc::clone(delegate);
        }
        let implements = |name: &str| {
            types::class_for_name(name).is_some_and(|interface| interface.is_assignable_from(class))
        };
        if !class.is_interface() {
            if implements(builtins::LIST) {
                return Arc::clone(&self.sequence);
            }
            if implements(builtins::COLLECTION) {
                return Arc::clone(&self.collection);
            }
            if implements(builtins::MAP) {
                return Arc::clone(&self.mapping);
            }
        }
        if class.is_array() {
            return Arc::clone(&self.array);
        }
        if class.is_proxy() {
            return Arc::clone(&self.proxy);
        }
        match class.hint() {
            Some(PersistenceHint::Value) => Arc::clone(&self.value),
            Some(PersistenceHint::Constants) => Arc::clone(&self.constant),
            Some(PersistenceHint::Named(key)) => self
                .named
                .get(key)
                .map_or_else(|| Arc::clone(&self.fallback), Arc::clone),
            None => Arc::clone(&self.fallback),
        }
    }
}

impl Default for DelegateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: Lazy<RwLock<DelegateRegistry>> = Lazy::new(|| RwLock::new(DelegateRegistry::new()));

/// Register a delegate for exactly `type_name` in the global registry
pub fn register(type_name: impl Into<String>, delegate: Arc<dyn PersistenceDelegate>) {
    let name = type_name.into();
    tracing::debug!(type_name = %name, delegate = delegate.name(), "registered delegate");
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, delegate);
}

/// Register a named delegate in the global registry
pub fn register_named(key: impl Into<String>, delegate: Arc<dyn PersistenceDelegate>) {
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register_named(key, delegate);
}

/// Remove an exact registration from the global registry
pub fn unregister(type_name: &str) -> Option<Arc<dyn PersistenceDelegate>> {
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .unregister(type_name)
}

/// Delegate for `class` from the global registry
#[must_use]
pub fn lookup(class: &ClassInfo) -> Arc<dyn PersistenceDelegate> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .lookup(class)
}
