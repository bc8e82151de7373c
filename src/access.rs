//! Shared key-based access routines over a node tree.
//!
//! The root configuration applies these against its own tree; an attached
//! sub-view applies them against the parent tree rooted at its sub node; a
//! detached sub-view applies them against its private frozen snapshot.
//! Keeping one implementation guarantees that a sub-view operation on a
//! local key behaves exactly like the equivalent composed-key operation on
//! the root configuration.

use std::collections::HashSet;

use crate::config::Settings;
use crate::engine::{ExpressionEngine, QueryResult};
use crate::error::ConfigResult;
use crate::handler::{NodeHandler, TreeHandler};
use crate::node::{NodeId, NodeTree};
use crate::value::{split_list, ConfigValue};

/// Evaluates a key against the subtree rooted at `root`.
pub(crate) fn query(
    tree: &NodeTree,
    engine: &dyn ExpressionEngine,
    root: NodeId,
    key: &str,
) -> ConfigResult<Vec<QueryResult>> {
    let handler = TreeHandler::new(tree);
    engine.query(&handler, root, key)
}

/// Returns all values stored at the key, nodes first in document order,
/// then attribute matches.
pub(crate) fn read_values(
    tree: &NodeTree,
    engine: &dyn ExpressionEngine,
    root: NodeId,
    key: &str,
) -> ConfigResult<Vec<ConfigValue>> {
    let mut values = Vec::new();
    for result in query(tree, engine, root, key)? {
        match result {
            QueryResult::Node(node) => {
                if let Some(value) = tree.value(node) {
                    values.push(value.clone());
                }
            }
            QueryResult::Attribute { node, name } => {
                if let Some(value) = tree.attribute(node, &name) {
                    values.push(value.clone());
                }
            }
        }
    }
    Ok(values)
}

/// Folds a list of read values into the property result: `None` (or a
/// missing-key error when `throw_on_missing` is set) for no values, the
/// single value, or an array of all values.
pub(crate) fn finish_read(
    values: Vec<ConfigValue>,
    key: &str,
    throw_on_missing: bool,
) -> ConfigResult<Option<ConfigValue>> {
    match values.len() {
        0 if throw_on_missing => Err(crate::error::ConfigError::key_not_found(key)),
        0 => Ok(None),
        1 => Ok(values.into_iter().next()),
        _ => Ok(Some(ConfigValue::Array(values))),
    }
}

/// Returns true if the key resolves to at least one defined value.
pub(crate) fn contains(
    tree: &NodeTree,
    engine: &dyn ExpressionEngine,
    root: NodeId,
    key: &str,
) -> ConfigResult<bool> {
    Ok(!read_values(tree, engine, root, key)?.is_empty())
}

/// Number of defined values the key resolves to.
pub(crate) fn value_count(
    tree: &NodeTree,
    engine: &dyn ExpressionEngine,
    root: NodeId,
    key: &str,
) -> ConfigResult<usize> {
    Ok(read_values(tree, engine, root, key)?.len())
}

/// Splits a value into the individual values to store, honouring the list
/// delimiter settings. Arrays always flatten; strings split only when
/// delimiter parsing is enabled.
fn expand_value(value: ConfigValue, settings: &Settings) -> Vec<ConfigValue> {
    match value {
        ConfigValue::Array(items) => items
            .into_iter()
            .flat_map(|item| expand_value(item, settings))
            .collect(),
        ConfigValue::String(s) if !settings.delimiter_parsing_disabled => {
            split_list(&s, settings.list_delimiter)
                .into_iter()
                .map(ConfigValue::String)
                .collect()
        }
        other => vec![other],
    }
}

fn materialize(tree: &mut NodeTree, data: crate::engine::AddData, value: ConfigValue) {
    let mut parent = data.parent;
    for name in data.path_nodes {
        parent = tree.add_child(parent, name);
    }
    if data.attribute {
        tree.set_attribute(parent, data.new_name, value);
    } else {
        let node = tree.add_child(parent, data.new_name);
        tree.set_value(node, Some(value));
    }
}

/// Adds a property at the key; multi-valued inputs create sibling nodes.
pub(crate) fn add(
    tree: &mut NodeTree,
    engine: &dyn ExpressionEngine,
    root: NodeId,
    key: &str,
    value: ConfigValue,
    settings: &Settings,
) -> ConfigResult<()> {
    for piece in expand_value(value, settings) {
        let data = {
            let handler = TreeHandler::new(tree);
            engine.prepare_add(&handler, root, key)?
        };
        materialize(tree, data, piece);
    }
    Ok(())
}

/// Sets the property at the key: existing occurrences are reassigned
/// pairwise, extra values are appended, surplus occurrences are cleared.
/// A key with no occurrences behaves like an add.
pub(crate) fn set(
    tree: &mut NodeTree,
    engine: &dyn ExpressionEngine,
    root: NodeId,
    key: &str,
    value: ConfigValue,
    settings: &Settings,
) -> ConfigResult<()> {
    let values = expand_value(value, settings);
    let existing = query(tree, engine, root, key)?;

    // surplus values go through the add path; reject an unaddable key
    // up front so a failure cannot leave the tree partially reassigned
    if values.len() > existing.len() {
        let handler = TreeHandler::new(tree);
        engine.prepare_add(&handler, root, key)?;
    }

    let mut values = values.into_iter();
    for result in &existing {
        match values.next() {
            Some(next) => assign(tree, result, Some(next)),
            None => assign(tree, result, None),
        }
    }
    for remaining in values {
        add(tree, engine, root, key, remaining, settings)?;
    }
    Ok(())
}

fn assign(tree: &mut NodeTree, target: &QueryResult, value: Option<ConfigValue>) {
    match target {
        QueryResult::Node(node) => tree.set_value(*node, value),
        QueryResult::Attribute { node, name } => match value {
            Some(value) => tree.set_attribute(*node, name.clone(), value),
            None => {
                tree.remove_attribute(*node, name);
            }
        },
    }
}

/// Clears the values stored at the key, keeping node structure intact.
pub(crate) fn clear_values(
    tree: &mut NodeTree,
    engine: &dyn ExpressionEngine,
    root: NodeId,
    key: &str,
) -> ConfigResult<()> {
    for result in query(tree, engine, root, key)? {
        assign(tree, &result, None);
    }
    Ok(())
}

/// Removes the entire subtrees (or attributes) the key resolves to.
pub(crate) fn remove_tree(
    tree: &mut NodeTree,
    engine: &dyn ExpressionEngine,
    root: NodeId,
    key: &str,
) -> ConfigResult<()> {
    for result in query(tree, engine, root, key)? {
        match result {
            QueryResult::Node(node) => tree.remove(node),
            QueryResult::Attribute { node, name } => {
                tree.remove_attribute(node, &name);
            }
        }
    }
    Ok(())
}

/// Collects the defined keys below `root`, relative to `root`, in document
/// order and without duplicates. Same-named sibling nodes contribute one
/// key (no indices), mirroring how key listings are consumed.
pub(crate) fn collect_keys(
    tree: &NodeTree,
    engine: &dyn ExpressionEngine,
    root: NodeId,
) -> Vec<String> {
    let handler = TreeHandler::new(tree);
    let mut keys = Vec::new();
    let mut seen = HashSet::new();
    visit_keys(&handler, engine, root, "", &mut keys, &mut seen);
    keys
}

fn visit_keys(
    handler: &dyn NodeHandler,
    engine: &dyn ExpressionEngine,
    node: NodeId,
    prefix: &str,
    keys: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    for attr in handler.attribute_names(node) {
        let key = engine.join(prefix, &format!("[@{}]", attr));
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }
    for child in handler.children(node) {
        let key = engine.join(prefix, handler.name(child));
        if handler.value(child).is_some() && seen.insert(key.clone()) {
            keys.push(key.clone());
        }
        visit_keys(handler, engine, child, &key, keys, seen);
    }
}

/// Collects defined keys at or below the nodes selected by `prefix`,
/// reported as full keys starting with `prefix`.
pub(crate) fn keys_with_prefix(
    tree: &NodeTree,
    engine: &dyn ExpressionEngine,
    root: NodeId,
    prefix: &str,
) -> ConfigResult<Vec<String>> {
    let mut keys = Vec::new();
    let mut seen = HashSet::new();
    for result in query(tree, engine, root, prefix)? {
        match result {
            QueryResult::Node(node) => {
                if tree.value(node).is_some() && seen.insert(prefix.to_string()) {
                    keys.push(prefix.to_string());
                }
                for relative in collect_keys(tree, engine, node) {
                    let key = engine.join(prefix, &relative);
                    if seen.insert(key.clone()) {
                        keys.push(key);
                    }
                }
            }
            QueryResult::Attribute { .. } => {
                if seen.insert(prefix.to_string()) {
                    keys.push(prefix.to_string());
                }
            }
        }
    }
    Ok(keys)
}
