//! Live sub-views over a root configuration.
//!
//! A [`SubView`] is rooted at one node of its parent [`Canopy`] and resolves
//! all keys relative to that node. It stays live: mutations made through the
//! parent (or any other sub-view) are visible on the next access. After a
//! structural change the view re-resolves its key and adopts whatever single
//! node it now selects. When the key stops selecting exactly one node, the
//! view detaches permanently and keeps serving reads from a frozen snapshot
//! of the subtree as it last existed.
//!
//! Sub-views inherit the parent's settings and expression engine until a
//! setting is overridden locally; clearing an override restores inheritance.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::access;
use crate::config::{Canopy, CanopyState, Settings};
use crate::engine::{DotExpressionEngine, ExpressionEngine, QueryResult};
use crate::error::{ConfigError, ConfigResult};
use crate::handler::TreeHandler;
use crate::node::{NodeId, NodeTree};
use crate::value::ConfigValue;

/// Why a view left the attached state. Decides which engine gets frozen
/// alongside the snapshot.
#[derive(Clone, Copy)]
enum DetachCause {
    /// The view's key stopped selecting exactly one node.
    Structural,
    /// The active engine failed to evaluate the view's key.
    Engine,
}

enum Attachment {
    Attached {
        node: NodeId,
        /// Canonical key of `node` in the parent tree, derived once at
        /// construction. Re-resolution always replays this key, so the
        /// view's fate depends on parent mutations alone.
        key: String,
        /// Parent revision this view last re-resolved against.
        synced: u64,
    },
    Detached {
        engine: Rc<dyn ExpressionEngine>,
    },
}

struct ViewState {
    /// While attached: the subtree as of the last successful sync, kept
    /// current so detachment always freezes the latest known state. Once
    /// detached: the frozen snapshot all operations run against.
    snapshot: NodeTree,
    attachment: Attachment,
}

/// Per-setting overrides; `None` means the parent's live value applies.
#[derive(Default)]
struct Overrides {
    throw_on_missing: Option<bool>,
    delimiter_parsing_disabled: Option<bool>,
    list_delimiter: Option<char>,
    engine: Option<Rc<dyn ExpressionEngine>>,
}

enum Resolution {
    Rebound(NodeId),
    Detach(DetachCause),
}

/// A configuration view rooted at one node of a parent [`Canopy`].
///
/// Obtained from [`Canopy::configuration_at`]. Offers the same property API
/// as the root; keys are relative to the view's node. Once detached a view
/// never re-attaches: reads keep answering from the frozen snapshot and
/// writes mutate only that snapshot.
pub struct SubView {
    parent: Canopy,
    state: RefCell<ViewState>,
    overrides: RefCell<Overrides>,
}

impl SubView {
    /// Creates a view rooted at `node`, which must be part of the parent's
    /// tree. The node's canonical key is derived here and cached for the
    /// life of the view.
    pub(crate) fn new(parent: &Canopy, node: NodeId) -> ConfigResult<Self> {
        let (snapshot, key, synced) = {
            let state = parent.state.borrow();
            if !state.tree.is_attached(node) {
                return Err(ConfigError::invalid_argument(
                    "node is not part of the configuration tree",
                ));
            }
            let handler = TreeHandler::new(&state.tree);
            let key = state.engine.node_key(&handler, node)?;
            (state.tree.clone_subtree(node), key, state.revision)
        };
        Ok(Self {
            parent: parent.clone(),
            state: RefCell::new(ViewState {
                snapshot,
                attachment: Attachment::Attached { node, key, synced },
            }),
            overrides: RefCell::new(Overrides::default()),
        })
    }

    /// The root configuration this view was created from.
    pub fn parent(&self) -> &Canopy {
        &self.parent
    }

    /// Returns the canonical key of the view's node in the parent tree, or
    /// `None` once the view has detached.
    pub fn attached_key(&self) -> Option<String> {
        self.sync();
        match &self.state.borrow().attachment {
            Attachment::Attached { key, .. } => Some(key.clone()),
            Attachment::Detached { .. } => None,
        }
    }

    /// Returns true while the view still tracks its node in the parent tree.
    pub fn is_attached(&self) -> bool {
        self.sync();
        matches!(
            self.state.borrow().attachment,
            Attachment::Attached { .. }
        )
    }

    fn override_engine(&self) -> Option<Rc<dyn ExpressionEngine>> {
        self.overrides.borrow().engine.as_ref().map(Rc::clone)
    }

    fn effective_settings(&self, inherited: Settings) -> Settings {
        let overrides = self.overrides.borrow();
        Settings {
            list_delimiter: overrides
                .list_delimiter
                .unwrap_or(inherited.list_delimiter),
            delimiter_parsing_disabled: overrides
                .delimiter_parsing_disabled
                .unwrap_or(inherited.delimiter_parsing_disabled),
            throw_on_missing: overrides
                .throw_on_missing
                .unwrap_or(inherited.throw_on_missing),
        }
    }

    /// Replays the cached key against the parent tree if it changed since
    /// the last sync, adopting whatever single node the key now selects.
    /// A failed resolution detaches the view for good.
    fn sync(&self) {
        let step = {
            let parent = self.parent.state.borrow();
            let view = self.state.borrow();
            match &view.attachment {
                Attachment::Detached { .. } => None,
                Attachment::Attached { key, synced, .. } => {
                    if *synced == parent.revision {
                        None
                    } else {
                        Some((self.resolve(&parent, key), parent.revision))
                    }
                }
            }
        };
        let Some((resolution, revision)) = step else {
            return;
        };
        match resolution {
            Resolution::Rebound(node) => {
                let parent = self.parent.state.borrow();
                let mut view = self.state.borrow_mut();
                view.snapshot = parent.tree.clone_subtree(node);
                if let Attachment::Attached {
                    node: current,
                    synced,
                    ..
                } = &mut view.attachment
                {
                    *current = node;
                    *synced = revision;
                }
            }
            Resolution::Detach(cause) => {
                let engine = self.frozen_engine(cause);
                let mut view = self.state.borrow_mut();
                view.attachment = Attachment::Detached { engine };
            }
        }
    }

    /// Checks the cached key still selects exactly one node in the parent
    /// tree.
    fn resolve(&self, parent: &CanopyState, key: &str) -> Resolution {
        let engine = self
            .override_engine()
            .unwrap_or_else(|| Rc::clone(&parent.engine));
        let handler = TreeHandler::new(&parent.tree);
        match engine.query(&handler, parent.tree.root(), key) {
            Err(_) => Resolution::Detach(DetachCause::Engine),
            Ok(results) => {
                let nodes: Vec<NodeId> =
                    results.iter().filter_map(QueryResult::as_node).collect();
                // zero matches and ambiguous matches both detach
                if nodes.len() == 1 && results.len() == 1 {
                    Resolution::Rebound(nodes[0])
                } else {
                    Resolution::Detach(DetachCause::Structural)
                }
            }
        }
    }

    /// Picks the engine frozen into the detached state: a local override if
    /// present, otherwise the parent's current engine, unless that engine is
    /// the one that failed.
    fn frozen_engine(&self, cause: DetachCause) -> Rc<dyn ExpressionEngine> {
        if let Some(engine) = self.override_engine() {
            return engine;
        }
        match cause {
            DetachCause::Structural => Rc::clone(&self.parent.state.borrow().engine),
            DetachCause::Engine => Rc::new(DotExpressionEngine::new()),
        }
    }

    /// Runs a read against the live parent tree (rooted at the view's node)
    /// or, once detached, against the frozen snapshot.
    fn read<R>(
        &self,
        op: impl FnOnce(&NodeTree, &dyn ExpressionEngine, NodeId, &Settings) -> ConfigResult<R>,
    ) -> ConfigResult<R> {
        self.sync();
        let parent = self.parent.state.borrow();
        let settings = self.effective_settings(parent.settings);
        let view = self.state.borrow();
        match &view.attachment {
            Attachment::Attached { node, .. } => {
                let engine = self
                    .override_engine()
                    .unwrap_or_else(|| Rc::clone(&parent.engine));
                op(&parent.tree, engine.as_ref(), *node, &settings)
            }
            Attachment::Detached { engine } => {
                let engine = self.override_engine().unwrap_or_else(|| Rc::clone(engine));
                op(&view.snapshot, engine.as_ref(), view.snapshot.root(), &settings)
            }
        }
    }

    /// Runs a mutation. While attached this writes through to the parent
    /// tree and bumps its revision; once detached it only changes the
    /// snapshot.
    fn write<R>(
        &self,
        op: impl FnOnce(&mut NodeTree, &dyn ExpressionEngine, NodeId, &Settings) -> ConfigResult<R>,
    ) -> ConfigResult<R> {
        self.sync();
        let attached_node = match &self.state.borrow().attachment {
            Attachment::Attached { node, .. } => Some(*node),
            Attachment::Detached { .. } => None,
        };
        if let Some(node) = attached_node {
            let mut parent = self.parent.state.borrow_mut();
            let settings = self.effective_settings(parent.settings);
            let engine = self
                .override_engine()
                .unwrap_or_else(|| Rc::clone(&parent.engine));
            // bump even on error: a failed operation may have touched the
            // tree and other views must re-resolve
            let result = op(&mut parent.tree, engine.as_ref(), node, &settings);
            parent.revision += 1;
            result
        } else {
            let settings = self.effective_settings(self.parent.state.borrow().settings);
            let mut view = self.state.borrow_mut();
            let engine = self.override_engine().unwrap_or_else(|| {
                match &view.attachment {
                    Attachment::Detached { engine } => Rc::clone(engine),
                    Attachment::Attached { .. } => Rc::new(DotExpressionEngine::new()),
                }
            });
            let root = view.snapshot.root();
            op(&mut view.snapshot, engine.as_ref(), root, &settings)
        }
    }

    /// Gets the property stored at the key, relative to the view's node.
    pub fn get(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        self.read(|tree, engine, root, settings| {
            let values = access::read_values(tree, engine, root, key)?;
            access::finish_read(values, key, settings.throw_on_missing)
        })
    }

    /// Gets the first value at the key coerced to a string.
    pub fn get_string(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self.first_value(key)?.map(|value| value.coerce_to_string()))
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
        self.read(|tree, engine, root, settings| {
            let values = access::read_values(tree, engine, root, key)?;
            if values.is_empty() && settings.throw_on_missing {
                return Err(ConfigError::key_not_found(key));
            }
            Ok(values)
        })
    }

    fn first_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        self.read(|tree, engine, root, settings| {
            let mut values = access::read_values(tree, engine, root, key)?;
            if values.is_empty() {
                if settings.throw_on_missing {
                    return Err(ConfigError::key_not_found(key));
                }
                return Ok(None);
            }
            Ok(Some(values.remove(0)))
        })
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

    /// Sets the property at the key, replacing existing occurrences.
    pub fn set_property(&self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        self.write(|tree, engine, root, settings| {
            access::set(tree, engine, root, key, value, settings)
        })
    }

    /// Adds a property at the key, appending to existing occurrences.
    pub fn add_property(&self, key: &str, value: ConfigValue) -> ConfigResult<()> {
        self.write(|tree, engine, root, settings| {
            access::add(tree, engine, root, key, value, settings)
        })
    }

    /// Clears the values stored at the key, keeping node structure intact.
    pub fn clear_property(&self, key: &str) -> ConfigResult<()> {
        self.write(|tree, engine, root, _settings| {
            access::clear_values(tree, engine, root, key)
        })
    }

    /// Removes the entire subtrees the key resolves to. Removing the view's
    /// own subtree through the parent detaches the view on its next access.
    pub fn clear_tree(&self, key: &str) -> ConfigResult<()> {
        self.write(|tree, engine, root, _settings| {
            access::remove_tree(tree, engine, root, key)
        })
    }

    /// Removes every property below the view's node. The node itself stays
    /// in place, so the view remains attached.
    pub fn clear(&self) {
        // infallible, so the write cannot leave the revision unbumped
        let _ = self.write(|tree, _engine, root, _settings| {
            tree.clear_node(root);
            Ok(())
        });
    }

    /// Returns all defined keys below the view's node, relative to it.
    pub fn keys(&self) -> Vec<String> {
        self.read(|tree, engine, root, _settings| {
            Ok(access::collect_keys(tree, engine, root))
        })
        .unwrap_or_default()
    }

    /// Returns all defined keys at or below the given prefix, reported as
    /// full keys relative to the view's node.
    pub fn keys_with_prefix(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        self.read(|tree, engine, root, _settings| {
            access::keys_with_prefix(tree, engine, root, prefix)
        })
    }

    /// Returns true if the key resolves to at least one defined value.
    pub fn contains_key(&self, key: &str) -> ConfigResult<bool> {
        self.read(|tree, engine, root, _settings| access::contains(tree, engine, root, key))
    }

    /// Number of defined keys below the view's node.
    pub fn size(&self) -> usize {
        self.keys().len()
    }

    /// Number of values the key resolves to.
    pub fn value_count(&self, key: &str) -> ConfigResult<usize> {
        self.read(|tree, engine, root, _settings| access::value_count(tree, engine, root, key))
    }

    /// Returns true if no key is defined below the view's node.
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Creates a further sub-view below this one. The new view hangs off the
    /// root configuration directly, not off this view. Detached views cannot
    /// spawn sub-views.
    pub fn configuration_at(&self, key: &str) -> ConfigResult<SubView> {
        self.sync();
        let target = {
            let view = self.state.borrow();
            let node = match &view.attachment {
                Attachment::Attached { node, .. } => *node,
                Attachment::Detached { .. } => {
                    return Err(ConfigError::invalid_argument(
                        "cannot create a sub-view of a detached view",
                    ));
                }
            };
            let parent = self.parent.state.borrow();
            let engine = self
                .override_engine()
                .unwrap_or_else(|| Rc::clone(&parent.engine));
            let results = access::query(&parent.tree, engine.as_ref(), node, key)?;
            let nodes: Vec<NodeId> = results.iter().filter_map(QueryResult::as_node).collect();
            match (nodes.len(), results.len()) {
                (1, 1) => nodes[0],
                (_, count) => return Err(ConfigError::not_unique(key, count)),
            }
        };
        SubView::new(&self.parent, target)
    }

    /// Returns whether reads of undefined keys raise an error, from the
    /// local override or the parent's live setting.
    pub fn is_throw_exception_on_missing(&self) -> bool {
        self.overrides
            .borrow()
            .throw_on_missing
            .unwrap_or_else(|| self.parent.is_throw_exception_on_missing())
    }

    /// Overrides the missing-key behavior for this view only.
    pub fn set_throw_exception_on_missing(&self, throw: bool) {
        self.overrides.borrow_mut().throw_on_missing = Some(throw);
    }

    /// Returns whether list splitting of string values is disabled.
    pub fn is_delimiter_parsing_disabled(&self) -> bool {
        self.overrides
            .borrow()
            .delimiter_parsing_disabled
            .unwrap_or_else(|| self.parent.is_delimiter_parsing_disabled())
    }

    /// Overrides list splitting for this view only.
    pub fn set_delimiter_parsing_disabled(&self, disabled: bool) {
        self.overrides.borrow_mut().delimiter_parsing_disabled = Some(disabled);
    }

    /// Returns the list delimiter character.
    pub fn list_delimiter(&self) -> char {
        self.overrides
            .borrow()
            .list_delimiter
            .unwrap_or_else(|| self.parent.list_delimiter())
    }

    /// Overrides the list delimiter for this view only.
    pub fn set_list_delimiter(&self, delimiter: char) {
        self.overrides.borrow_mut().list_delimiter = Some(delimiter);
    }

    /// Returns the engine in effect for this view: the local override, the
    /// parent's live engine, or the frozen engine once detached.
    pub fn expression_engine(&self) -> Rc<dyn ExpressionEngine> {
        if let Some(engine) = self.override_engine() {
            return engine;
        }
        match &self.state.borrow().attachment {
            Attachment::Attached { .. } => self.parent.expression_engine(),
            Attachment::Detached { engine } => Rc::clone(engine),
        }
    }

    /// Overrides the engine for this view; `None` restores inheritance from
    /// the parent.
    pub fn set_expression_engine(&self, engine: Option<Rc<dyn ExpressionEngine>>) {
        self.overrides.borrow_mut().engine = engine;
    }

    /// Sub-views never expose capabilities; those belong to the root
    /// configuration.
    pub fn get_capability<T: Any>(&self) -> Option<Rc<T>> {
        None
    }
}

impl std::fmt::Debug for SubView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let attached = matches!(
            self.state.borrow().attachment,
            Attachment::Attached { .. }
        );
        f.debug_struct("SubView")
            .field("attached", &attached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NodeHandler;

    fn sample() -> Canopy {
        let config = Canopy::new();
        config
            .add_property("tables.table(-1).name", ConfigValue::from("documents"))
            .unwrap();
        config
            .add_property("tables.table(0).fields.field(-1).name", ConfigValue::from("docid"))
            .unwrap();
        config
            .add_property("tables.table(-1).name", ConfigValue::from("users"))
            .unwrap();
        config
            .add_property("tables.table(1).fields.field(-1).name", ConfigValue::from("uid"))
            .unwrap();
        config
    }

    #[test]
    fn test_view_resolves_keys_relative_to_node() {
        let config = sample();
        let table = config.configuration_at("tables.table(0)").unwrap();
        assert_eq!(
            table.get_string("name").unwrap(),
            Some("documents".to_string())
        );
        assert_eq!(
            table.get_string("fields.field(0).name").unwrap(),
            Some("docid".to_string())
        );
        assert!(table.get_string("tables").unwrap().is_none());
    }

    #[test]
    fn test_view_sees_parent_mutations() {
        let config = sample();
        let table = config.configuration_at("tables.table(1)").unwrap();
        config
            .set_property("tables.table(1).name", ConfigValue::from("accounts"))
            .unwrap();
        assert_eq!(
            table.get_string("name").unwrap(),
            Some("accounts".to_string())
        );
    }

    #[test]
    fn test_parent_sees_view_mutations() {
        let config = sample();
        let table = config.configuration_at("tables.table(0)").unwrap();
        table
            .set_property("name", ConfigValue::from("archive"))
            .unwrap();
        assert_eq!(
            config.get_string("tables.table(0).name").unwrap(),
            Some("archive".to_string())
        );
    }

    #[test]
    fn test_attached_key_reports_canonical_key() {
        let config = sample();
        let table = config.configuration_at("tables.table(1)").unwrap();
        assert_eq!(table.attached_key(), Some("tables.table(1)".to_string()));
    }

    #[test]
    fn test_clear_tree_on_parent_detaches_view() {
        let config = sample();
        let table = config.configuration_at("tables.table(1)").unwrap();
        assert_eq!(table.get_string("name").unwrap(), Some("users".to_string()));

        config.clear_tree("tables.table(1)").unwrap();
        assert!(!table.is_attached());
        assert_eq!(table.attached_key(), None);
        // frozen snapshot still answers
        assert_eq!(table.get_string("name").unwrap(), Some("users".to_string()));
    }

    #[test]
    fn test_detached_view_ignores_later_parent_changes() {
        let config = sample();
        let table = config.configuration_at("tables.table(0)").unwrap();
        config.clear_tree("tables").unwrap();
        assert!(!table.is_attached());

        config
            .add_property("tables.table(0).name", ConfigValue::from("replacement"))
            .unwrap();
        assert_eq!(
            table.get_string("name").unwrap(),
            Some("documents".to_string())
        );
    }

    #[test]
    fn test_view_rebinds_when_key_selects_a_renumbered_sibling() {
        let config = sample();
        let table = config.configuration_at("tables.table(0)").unwrap();
        // once this subtree is gone, the surviving sibling slides into
        // index 0 and the cached key picks it up
        config.clear_tree("tables.table(0)").unwrap();
        assert!(table.is_attached());
        assert_eq!(table.get_string("name").unwrap(), Some("users".to_string()));
    }

    #[test]
    fn test_reresolution_does_not_depend_on_earlier_key_reads() {
        let config = sample();
        let observed = config.configuration_at("tables.table(0)").unwrap();
        let untouched = config.configuration_at("tables.table(0)").unwrap();
        // query the key on one view only before mutating the parent
        assert_eq!(
            observed.attached_key(),
            Some("tables.table(0)".to_string())
        );

        config.clear_tree("tables.table(0)").unwrap();
        assert_eq!(observed.is_attached(), untouched.is_attached());
        assert_eq!(
            observed.get_string("name").unwrap(),
            untouched.get_string("name").unwrap()
        );
        assert_eq!(
            observed.get_string("name").unwrap(),
            Some("users".to_string())
        );
    }

    #[test]
    fn test_detached_view_writes_touch_only_snapshot() {
        let config = sample();
        let table = config.configuration_at("tables.table(1)").unwrap();
        config.clear_tree("tables.table(1)").unwrap();
        assert!(!table.is_attached());

        table
            .set_property("name", ConfigValue::from("offline"))
            .unwrap();
        assert_eq!(
            table.get_string("name").unwrap(),
            Some("offline".to_string())
        );
        assert!(!config.contains_key("tables.table(1).name").unwrap());
    }

    #[test]
    fn test_view_clearing_own_subtree_via_parent_key_detaches() {
        let config = sample();
        let table = config.configuration_at("tables.table(1)").unwrap();
        config.clear_tree("tables").unwrap();
        assert!(!table.is_attached());
    }

    #[test]
    fn test_clear_keeps_view_attached() {
        let config = sample();
        let table = config.configuration_at("tables.table(0)").unwrap();
        table.clear();
        assert!(table.is_attached());
        assert!(table.is_empty());
        // the node itself survived, only its contents went away
        assert!(config.configuration_at("tables.table(0)").is_ok());
        assert!(!config.contains_key("tables.table(0).name").unwrap());
    }

    struct FailingEngine;

    impl ExpressionEngine for FailingEngine {
        fn query(
            &self,
            _handler: &dyn NodeHandler,
            _root: NodeId,
            key: &str,
        ) -> ConfigResult<Vec<QueryResult>> {
            Err(ConfigError::engine(format!("cannot evaluate '{key}'")))
        }

        fn node_key(&self, _handler: &dyn NodeHandler, _node: NodeId) -> ConfigResult<String> {
            Err(ConfigError::engine("cannot derive keys"))
        }

        fn join(&self, prefix: &str, key: &str) -> String {
            format!("{prefix}.{key}")
        }

        fn prepare_add(
            &self,
            _handler: &dyn NodeHandler,
            _root: NodeId,
            key: &str,
        ) -> ConfigResult<crate::engine::AddData> {
            Err(ConfigError::engine(format!("cannot add '{key}'")))
        }
    }

    #[test]
    fn test_parent_engine_swap_detaches_view() {
        let config = sample();
        let table = config.configuration_at("tables.table(1)").unwrap();
        assert_eq!(table.attached_key(), Some("tables.table(1)".to_string()));

        config.set_expression_engine(Rc::new(FailingEngine));
        assert!(!table.is_attached());
        // snapshot reads use a default engine, not the failing one
        assert_eq!(table.get_string("name").unwrap(), Some("users".to_string()));
    }

    #[test]
    fn test_stale_index_detaches_on_reresolution() {
        let config = sample();
        let table = config.configuration_at("tables.table(1)").unwrap();
        assert_eq!(table.attached_key(), Some("tables.table(1)".to_string()));

        // removing the first table renumbers the siblings, so the stored
        // key no longer selects the original node
        config.clear_tree("tables.table(0)").unwrap();
        let _ = table.get_string("name");

        // key tables.table(1) now matches nothing
        assert!(!table.is_attached());
    }

    #[test]
    fn test_settings_inherit_until_overridden() {
        let config = sample();
        let table = config.configuration_at("tables.table(0)").unwrap();
        assert!(!table.is_throw_exception_on_missing());

        config.set_throw_exception_on_missing(true);
        assert!(table.is_throw_exception_on_missing());
        assert!(table.get_string("no.such.key").is_err());

        table.set_throw_exception_on_missing(false);
        assert!(!table.is_throw_exception_on_missing());
        assert_eq!(table.get_string("no.such.key").unwrap(), None);
        // parent keeps its own setting
        assert!(config.is_throw_exception_on_missing());
    }

    #[test]
    fn test_list_delimiter_override() {
        let config = sample();
        let table = config.configuration_at("tables.table(0)").unwrap();
        table.set_list_delimiter(';');
        table
            .add_property("columns", ConfigValue::from("a;b;c"))
            .unwrap();
        assert_eq!(table.value_count("columns").unwrap(), 3);
        assert_eq!(config.list_delimiter(), ',');
    }

    #[test]
    fn test_engine_override_and_reset() {
        let config = sample();
        let table = config.configuration_at("tables.table(0)").unwrap();
        let slash = Rc::new(DotExpressionEngine::with_delimiter('/'));
        table.set_expression_engine(Some(slash));
        assert_eq!(
            table.get_string("fields/field(0)/name").unwrap(),
            Some("docid".to_string())
        );

        table.set_expression_engine(None);
        assert_eq!(
            table.get_string("fields.field(0).name").unwrap(),
            Some("docid".to_string())
        );
    }

    #[test]
    fn test_nested_views_hang_off_the_root() {
        let config = sample();
        let table = config.configuration_at("tables.table(0)").unwrap();
        let fields = table.configuration_at("fields").unwrap();
        assert!(Canopy::ptr_eq(fields.parent(), &config));
        assert_eq!(
            fields.get_string("field(0).name").unwrap(),
            Some("docid".to_string())
        );
    }

    #[test]
    fn test_detached_view_cannot_spawn_sub_views() {
        let config = sample();
        let table = config.configuration_at("tables.table(0)").unwrap();
        config.clear_tree("tables").unwrap();
        let err = table.configuration_at("fields").unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_view_keys_are_relative() {
        let config = sample();
        let table = config.configuration_at("tables.table(1)").unwrap();
        let keys = table.keys();
        assert!(keys.contains(&"name".to_string()));
        assert!(keys.contains(&"fields.field.name".to_string()));
        assert!(!keys.iter().any(|k| k.starts_with("tables")));
    }

    #[test]
    fn test_view_capabilities_are_always_absent() {
        struct Marker;

        let config = sample();
        config.register_capability(Marker);
        let table = config.configuration_at("tables.table(0)").unwrap();
        assert!(table.get_capability::<Marker>().is_none());
        assert!(config.get_capability::<Marker>().is_some());
    }
}
