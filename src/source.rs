//! Flat key-value configuration sources.
//!
//! A [`FlatSource`] is the minimal mutable property store: no hierarchy, no
//! expression engine, just keys mapped to values. [`MapSource`] is the
//! in-memory implementation; [`EventedSource`](crate::wrapper::EventedSource)
//! decorates any source with mutation events.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use crate::capability::Capabilities;
use crate::error::ConfigResult;
use crate::value::ConfigValue;

/// A flat, string-keyed property store.
///
/// Multi-valued keys are represented as [`ConfigValue::Array`]. Mutations
/// report failure through `ConfigResult` so decorators can suppress their
/// after-effects when the underlying store rejects an operation.
pub trait FlatSource {
    /// Gets the value stored at the key, or `None` when undefined.
    fn get_property(&self, key: &str) -> Option<ConfigValue>;

    /// Adds a value at the key. An existing value grows into an array.
    fn add_property(&mut self, key: &str, value: ConfigValue) -> ConfigResult<()>;

    /// Sets the value at the key, replacing any existing value.
    fn set_property(&mut self, key: &str, value: ConfigValue) -> ConfigResult<()>;

    /// Removes the key and its value.
    fn clear_property(&mut self, key: &str) -> ConfigResult<()>;

    /// Removes every property from the source.
    fn clear(&mut self) -> ConfigResult<()>;

    /// Returns true if the key is defined.
    fn contains_key(&self, key: &str) -> bool;

    /// Returns all defined keys.
    fn keys(&self) -> Vec<String>;

    /// Returns all defined keys starting with the prefix.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.keys()
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect()
    }

    /// Returns true if no key is defined.
    fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Number of defined keys.
    fn size(&self) -> usize {
        self.keys().len()
    }

    /// Number of values stored at the key: 0 for undefined, the array
    /// length for multi-valued keys, 1 otherwise.
    fn value_count(&self, key: &str) -> usize {
        match self.get_property(key) {
            None => 0,
            Some(ConfigValue::Array(items)) => items.len(),
            Some(_) => 1,
        }
    }

    /// Looks up a capability by type. Sources without capabilities return
    /// `None` for everything.
    fn capability(&self, _type_id: TypeId) -> Option<Rc<dyn Any>> {
        None
    }
}

/// Typed capability lookup over any [`FlatSource`].
pub trait FlatSourceExt: FlatSource {
    /// Looks up a typed capability of this source.
    fn get_capability<T: Any>(&self) -> Option<Rc<T>> {
        self.capability(TypeId::of::<T>())
            .and_then(|any| any.downcast::<T>().ok())
    }
}

impl<S: FlatSource + ?Sized> FlatSourceExt for S {}

/// An in-memory flat source backed by a hash map.
#[derive(Default)]
pub struct MapSource {
    properties: HashMap<String, ConfigValue>,
    /// Insertion order of keys, so listings stay deterministic.
    order: Vec<String>,
    capabilities: Capabilities,
}

impl MapSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed capability on this source.
    pub fn register_capability<T: Any>(&mut self, capability: T) {
        self.capabilities.register(capability);
    }
}

impl FlatSource for MapSource {
    fn get_property(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn add_property(&mut self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        match self.properties.remove(key) {
            None => {
                self.order.push(key.to_string());
                self.properties.insert(key.to_string(), value);
            }
            Some(ConfigValue::Array(mut items)) => {
                items.push(value);
                self.properties
                    .insert(key.to_string(), ConfigValue::Array(items));
            }
            Some(existing) => {
                self.properties
                    .insert(key.to_string(), ConfigValue::Array(vec![existing, value]));
            }
        }
        Ok(())
    }

    fn set_property(&mut self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        if !self.properties.contains_key(key) {
            self.order.push(key.to_string());
        }
        self.properties.insert(key.to_string(), value);
        Ok(())
    }

    fn clear_property(&mut self, key: &str) -> ConfigResult<()> {
        if self.properties.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
        Ok(())
    }

    fn clear(&mut self) -> ConfigResult<()> {
        self.properties.clear();
        self.order.clear();
        Ok(())
    }

    fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.order.clone()
    }

    fn capability(&self, type_id: TypeId) -> Option<Rc<dyn Any>> {
        self.capabilities.get_raw(type_id)
    }
}
