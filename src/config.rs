//! Root hierarchical configuration.
//!
//! A [`Canopy`] owns exactly one node tree and one expression engine and
//! exposes every read and write through key paths. The handle is a cheap
//! clone over shared state so that sub-views created by
//! [`Canopy::configuration_at`] keep resolving against the live tree as it
//! mutates.
//!
//! All operations are synchronous on the caller's thread and the type
//! performs no internal locking; the handle is deliberately single-threaded
//! (`Rc`-based). Callers sharing a configuration across threads must supply
//! external synchronization around an owned instance.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::access;
use crate::capability::Capabilities;
use crate::engine::{DotExpressionEngine, ExpressionEngine, QueryResult};
use crate::error::{ConfigError, ConfigResult};
use crate::node::{NodeId, NodeTree};
use crate::subview::SubView;
use crate::value::ConfigValue;

/// Global settings of a root configuration, inherited by sub-views until
/// they override a setting locally. The key delimiter itself belongs to the
/// expression engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Delimiter used to split string values into lists.
    pub list_delimiter: char,
    /// When true, string values are stored verbatim instead of being split.
    pub delimiter_parsing_disabled: bool,
    /// When true, reading an undefined key is an error instead of `None`.
    pub throw_on_missing: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            list_delimiter: ',',
            delimiter_parsing_disabled: false,
            throw_on_missing: false,
        }
    }
}

pub(crate) struct CanopyState {
    pub(crate) tree: NodeTree,
    pub(crate) engine: Rc<dyn ExpressionEngine>,
    pub(crate) settings: Settings,
    /// Bumped on every structural mutation and engine replacement; sub-views
    /// compare it against their last synced value to decide when to
    /// re-resolve their path.
    pub(crate) revision: u64,
    pub(crate) capabilities: Capabilities,
}

/// The root hierarchical configuration.
///
/// # Example
/// ```
/// use canopy::{Canopy, ConfigValue};
///
/// let config = Canopy::new();
/// config.add_property("database.host", ConfigValue::from("localhost")).unwrap();
/// config.add_property("database.port", ConfigValue::from(5432i64)).unwrap();
///
/// assert_eq!(
///     config.get_string("database.host").unwrap(),
///     Some("localhost".to_string())
/// );
///
/// let db = config.configuration_at("database").unwrap();
/// assert_eq!(db.get_i64("port").unwrap(), Some(5432));
/// ```
#[derive(Clone)]
pub struct Canopy {
    pub(crate) state: Rc<RefCell<CanopyState>>,
}

impl Default for Canopy {
    fn default() -> Self {
        Self::new()
    }
}

impl Canopy {
    /// Creates an empty configuration with the default engine and settings.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(CanopyState {
                tree: NodeTree::new("config"),
                engine: Rc::new(DotExpressionEngine::new()),
                settings: Settings::default(),
                revision: 0,
                capabilities: Capabilities::new(),
            })),
        }
    }

    /// Returns true if both handles refer to the same underlying
    /// configuration.
    pub fn ptr_eq(a: &Canopy, b: &Canopy) -> bool {
        Rc::ptr_eq(&a.state, &b.state)
    }

    /// Runs a structural mutation and bumps the revision counter. The bump
    /// happens on the error path too: a failed operation may already have
    /// touched the tree, and sub-views must re-resolve against whatever it
    /// left behind.
    fn mutate<R>(&self, op: impl FnOnce(&mut CanopyState) -> ConfigResult<R>) -> ConfigResult<R> {
        let mut state = self.state.borrow_mut();
        let result = op(&mut state);
        state.revision += 1;
        result
    }

    /// Gets the property stored at the key: `None` when undefined (or an
    /// error under `throw_on_missing`), the single value, or an array when
    /// the key matches several values.
    pub fn get(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        let state = self.state.borrow();
        let values = access::read_values(&state.tree, state.engine.as_ref(), state.tree.root(), key)?;
        access::finish_read(values, key, state.settings.throw_on_missing)
    }

    /// Gets the first value at the key coerced to a string.
    pub fn get_string(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self
            .first_value(key)?
            .map(|value| value.coerce_to_string()))
    }

    /// Gets the first value at the key coerced to an i64.
    pub fn get_i64(&self, key: &str) -> ConfigResult<Option<i64>> {
        self.coerced(key, "i64", ConfigValue::coerce_to_i64)
    }

    /// Gets the first value at the key coerced to an f64.
    pub fn get_f64(&self, key: &str) -> ConfigResult<Option<f64>> {
        self.coerced(key, "f64", ConfigValue::coerce_to_f64)
    }

    /// Gets the first value at the key coerced to a bool.
    pub fn get_bool(&self, key: &str) -> ConfigResult<Option<bool>> {
        self.coerced(key, "bool", ConfigValue::coerce_to_bool)
    }

    /// Gets every value the key resolves to, in document order.
    pub fn get_list(&self, key: &str) -> ConfigResult<Vec<ConfigValue>> {
        let state = self.state.borrow();
        let values = access::read_values(&state.tree, state.engine.as_ref(), state.tree.root(), key)?;
        if values.is_empty() && state.settings.throw_on_missing {
            return Err(ConfigError::key_not_found(key));
        }
        Ok(values)
    }

    fn first_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        let state = self.state.borrow();
        let mut values =
            access::read_values(&state.tree, state.engine.as_ref(), state.tree.root(), key)?;
        if values.is_empty() {
            if state.settings.throw_on_missing {
                return Err(ConfigError::key_not_found(key));
            }
            return Ok(None);
        }
        Ok(Some(values.remove(0)))
    }

    fn coerced<T>(
        &self,
        key: &str,
        target: &str,
        convert: impl Fn(&ConfigValue) -> Option<T>,
    ) -> ConfigResult<Option<T>> {
        match self.first_value(key)? {
            None => Ok(None),
            Some(value) => convert(&value)
                .map(Some)
                .ok_or_else(|| ConfigError::type_conversion(value.type_name(), target)),
        }
    }

    /// Sets the property at the key, replacing existing occurrences. A key
    /// of `""` addresses the root node itself.
    pub fn set_property(&self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        self.mutate(|state| {
            let root = state.tree.root();
            let engine = Rc::clone(&state.engine);
            let settings = state.settings;
            access::set(&mut state.tree, engine.as_ref(), root, key, value, &settings)
        })
    }

    /// Adds a property at the key, appending to existing occurrences.
    pub fn add_property(&self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        self.mutate(|state| {
            let root = state.tree.root();
            let engine = Rc::clone(&state.engine);
            let settings = state.settings;
            access::add(&mut state.tree, engine.as_ref(), root, key, value, &settings)
        })
    }

    /// Clears the values stored at the key, keeping node structure intact.
    pub fn clear_property(&self, key: &str) -> ConfigResult<()> {
        self.mutate(|state| {
            let root = state.tree.root();
            let engine = Rc::clone(&state.engine);
            access::clear_values(&mut state.tree, engine.as_ref(), root, key)
        })
    }

    /// Removes the entire subtrees the key resolves to.
    pub fn clear_tree(&self, key: &str) -> ConfigResult<()> {
        self.mutate(|state| {
            let root = state.tree.root();
            let engine = Rc::clone(&state.engine);
            access::remove_tree(&mut state.tree, engine.as_ref(), root, key)
        })
    }

    /// Removes every property from the configuration.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.tree.clear_all();
        state.revision += 1;
    }

    /// Returns all defined keys in document order.
    pub fn keys(&self) -> Vec<String> {
        let state = self.state.borrow();
        access::collect_keys(&state.tree, state.engine.as_ref(), state.tree.root())
    }

    /// Returns all defined keys at or below the given prefix, reported as
    /// full keys.
    pub fn keys_with_prefix(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let state = self.state.borrow();
        access::keys_with_prefix(&state.tree, state.engine.as_ref(), state.tree.root(), prefix)
    }

    /// Returns true if the key resolves to at least one defined value.
    pub fn contains_key(&self, key: &str) -> ConfigResult<bool> {
        let state = self.state.borrow();
        access::contains(&state.tree, state.engine.as_ref(), state.tree.root(), key)
    }

    /// Number of defined keys.
    pub fn size(&self) -> usize {
        self.keys().len()
    }

    /// Number of values the key resolves to.
    pub fn value_count(&self, key: &str) -> ConfigResult<usize> {
        let state = self.state.borrow();
        access::value_count(&state.tree, state.engine.as_ref(), state.tree.root(), key)
    }

    /// Returns true if no key is defined.
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Resolves a key that must select exactly one node.
    pub(crate) fn node_id(&self, key: &str) -> ConfigResult<NodeId> {
        let state = self.state.borrow();
        let results = access::query(&state.tree, state.engine.as_ref(), state.tree.root(), key)?;
        let nodes: Vec<NodeId> = results
            .iter()
            .filter_map(QueryResult::as_node)
            .collect();
        match (nodes.len(), results.len()) {
            (1, 1) => Ok(nodes[0]),
            (_, count) => Err(ConfigError::not_unique(key, count)),
        }
    }

    /// Creates a live sub-view rooted at the node the key selects. The key
    /// must select exactly one node.
    pub fn configuration_at(&self, key: &str) -> ConfigResult<SubView> {
        let node = self.node_id(key)?;
        SubView::new(self, node)
    }

    /// Returns whether reads of undefined keys raise an error.
    pub fn is_throw_exception_on_missing(&self) -> bool {
        self.state.borrow().settings.throw_on_missing
    }

    /// Controls whether reads of undefined keys raise an error.
    pub fn set_throw_exception_on_missing(&self, throw: bool) {
        self.state.borrow_mut().settings.throw_on_missing = throw;
    }

    /// Returns whether list splitting of string values is disabled.
    pub fn is_delimiter_parsing_disabled(&self) -> bool {
        self.state.borrow().settings.delimiter_parsing_disabled
    }

    /// Controls list splitting of string values.
    pub fn set_delimiter_parsing_disabled(&self, disabled: bool) {
        self.state.borrow_mut().settings.delimiter_parsing_disabled = disabled;
    }

    /// Returns the list delimiter character.
    pub fn list_delimiter(&self) -> char {
        self.state.borrow().settings.list_delimiter
    }

    /// Sets the list delimiter character.
    pub fn set_list_delimiter(&self, delimiter: char) {
        self.state.borrow_mut().settings.list_delimiter = delimiter;
    }

    /// Returns the active expression engine.
    pub fn expression_engine(&self) -> Rc<dyn ExpressionEngine> {
        Rc::clone(&self.state.borrow().engine)
    }

    /// Replaces the expression engine. Attached sub-views re-resolve their
    /// paths against the new engine on their next operation and detach if
    /// the new engine cannot evaluate them.
    pub fn set_expression_engine(&self, engine: Rc<dyn ExpressionEngine>) {
        let mut state = self.state.borrow_mut();
        state.engine = engine;
        state.revision += 1;
    }

    /// Registers a typed capability on this configuration.
    pub fn register_capability<T: Any>(&self, capability: T) {
        self.state.borrow_mut().capabilities.register(capability);
    }

    /// Looks up a typed capability of this configuration.
    pub fn get_capability<T: Any>(&self) -> Option<Rc<T>> {
        self.state.borrow().capabilities.get::<T>()
    }
}

impl std::fmt::Debug for Canopy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Canopy")
            .field("keys", &self.size())
            .field("revision", &state.revision)
            .finish()
    }
}
