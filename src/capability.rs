//! Type-tagged capability registry.
//!
//! A capability is an optional, typed facet an object exposes beyond its
//! base contract. Lookups are keyed by `TypeId` and resolved with a safe
//! downcast, so a caller asking for a type the registry never saw simply
//! gets `None`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

/// Registry of typed capability instances, at most one per type.
#[derive(Default)]
pub struct Capabilities {
    entries: HashMap<TypeId, Rc<dyn Any>>,
}

impl Capabilities {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a capability, replacing any previous instance of the same
    /// type.
    pub fn register<T: Any>(&mut self, capability: T) {
        self.entries.insert(TypeId::of::<T>(), Rc::new(capability));
    }

    /// Looks up the capability registered for `T`, if any.
    pub fn get<T: Any>(&self) -> Option<Rc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
    }

    /// Type-erased lookup used by [`FlatSource`](crate::source::FlatSource)
    /// implementations.
    pub fn get_raw(&self, ty: TypeId) -> Option<Rc<dyn Any>> {
        self.entries.get(&ty).map(Rc::clone)
    }

    /// Returns true if no capability is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("len", &self.entries.len())
            .finish()
    }
}
