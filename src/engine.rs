//! Key-path expression engine.
//!
//! An [`ExpressionEngine`] translates key-path strings into node queries and
//! back. The default implementation, [`DotExpressionEngine`], understands
//! dot-separated segments (`tables.table.name`), zero-based indexed
//! repetition (`table(1)`, with `(-1)` meaning "append new" in add
//! operations), and a trailing attribute selector (`table(0)[@type]`).
//!
//! The engine attached to a root configuration is replaceable at runtime;
//! sub-views re-resolve their paths against whatever engine is current.

use crate::error::{ConfigError, ConfigResult};
use crate::handler::NodeHandler;
use crate::node::NodeId;

/// A single match produced by a key query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// The key selected a node.
    Node(NodeId),
    /// The key selected an attribute of a node.
    Attribute { node: NodeId, name: String },
}

impl QueryResult {
    /// Returns the selected node id if this result is a node match.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            QueryResult::Node(id) => Some(*id),
            QueryResult::Attribute { .. } => None,
        }
    }
}

/// Instructions for materialising a new property produced by
/// [`ExpressionEngine::prepare_add`]. The caller creates `path_nodes` as a
/// chain below `parent` and then attaches the `new_name` node or attribute
/// at the end of that chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddData {
    /// Deepest already-existing node the new path hangs off.
    pub parent: NodeId,
    /// Names of intermediate nodes that must be created, outermost first.
    pub path_nodes: Vec<String>,
    /// Name of the node or attribute to create at the end of the path.
    pub new_name: String,
    /// True if `new_name` designates an attribute rather than a child node.
    pub attribute: bool,
}

/// Translates key-path strings into node queries and back.
pub trait ExpressionEngine {
    /// Evaluates a key against the subtree rooted at `root` and returns all
    /// matches. An empty key selects `root` itself. A syntactically invalid
    /// key is an error; a valid key that matches nothing yields an empty
    /// result.
    fn query(
        &self,
        handler: &dyn NodeHandler,
        root: NodeId,
        key: &str,
    ) -> ConfigResult<Vec<QueryResult>>;

    /// Derives the unique key path from the handler's root to `node`. A
    /// segment carries an index exactly when the node has siblings of the
    /// same name. The root itself maps to the empty key.
    fn node_key(&self, handler: &dyn NodeHandler, node: NodeId) -> ConfigResult<String>;

    /// Composes two keys. Either side may be empty; attribute keys attach
    /// without a delimiter.
    fn join(&self, prefix: &str, key: &str) -> String;

    /// Determines where a new property for `key` has to be created below
    /// `root`.
    fn prepare_add(
        &self,
        handler: &dyn NodeHandler,
        root: NodeId,
        key: &str,
    ) -> ConfigResult<AddData>;
}

/// Parsed component of a key path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyPart {
    /// A named node segment with an optional index.
    Node { name: String, index: Option<i64> },
    /// A trailing attribute selector.
    Attribute(String),
}

/// The default key-path syntax: dot-separated segments, `name(i)` indexing
/// and `[@name]` attributes.
#[derive(Debug, Clone)]
pub struct DotExpressionEngine {
    delimiter: char,
}

impl Default for DotExpressionEngine {
    fn default() -> Self {
        Self { delimiter: '.' }
    }
}

impl DotExpressionEngine {
    /// Creates an engine with the standard `.` delimiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with a custom segment delimiter.
    pub fn with_delimiter(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Returns the segment delimiter of this engine.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    fn parse_key(&self, key: &str) -> ConfigResult<Vec<KeyPart>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let segments: Vec<&str> = key.split(self.delimiter).collect();
        let mut parts = Vec::new();
        for (pos, segment) in segments.iter().enumerate() {
            let last = pos + 1 == segments.len();
            if segment.is_empty() {
                return Err(ConfigError::key_parse(key, "empty key segment"));
            }
            let (node_part, attr_part) = match segment.find("[@") {
                Some(idx) => (&segment[..idx], Some(&segment[idx..])),
                None => (&segment[..], None),
            };
            if !node_part.is_empty() {
                parts.push(self.parse_node_part(key, node_part)?);
            }
            if let Some(attr) = attr_part {
                if !last {
                    return Err(ConfigError::key_parse(
                        key,
                        "attribute selector must be the final segment",
                    ));
                }
                let name = attr
                    .strip_prefix("[@")
                    .and_then(|rest| rest.strip_suffix(']'))
                    .ok_or_else(|| {
                        ConfigError::key_parse(key, "malformed attribute selector")
                    })?;
                if name.is_empty() {
                    return Err(ConfigError::key_parse(key, "empty attribute name"));
                }
                parts.push(KeyPart::Attribute(name.to_string()));
            }
        }
        Ok(parts)
    }

    fn parse_node_part(&self, key: &str, part: &str) -> ConfigResult<KeyPart> {
        match part.find('(') {
            None => Ok(KeyPart::Node {
                name: part.to_string(),
                index: None,
            }),
            Some(idx) => {
                let name = &part[..idx];
                let index_str = part[idx + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| ConfigError::key_parse(key, "unterminated index"))?;
                if name.is_empty() {
                    return Err(ConfigError::key_parse(key, "index without a node name"));
                }
                let index: i64 = index_str
                    .parse()
                    .map_err(|_| ConfigError::key_parse(key, "index is not a number"))?;
                if index < -1 {
                    return Err(ConfigError::key_parse(key, "index out of range"));
                }
                Ok(KeyPart::Node {
                    name: name.to_string(),
                    index: Some(index),
                })
            }
        }
    }

    /// Position of `node` among its same-named siblings, paired with the
    /// total count of those siblings.
    fn sibling_position(
        &self,
        handler: &dyn NodeHandler,
        node: NodeId,
    ) -> ConfigResult<(usize, usize)> {
        let parent = handler
            .parent(node)
            .ok_or_else(|| ConfigError::engine("node has no parent"))?;
        let siblings = handler.children_named(parent, handler.name(node));
        let position = siblings
            .iter()
            .position(|sibling| *sibling == node)
            .ok_or_else(|| ConfigError::engine("node is not a child of its parent"))?;
        Ok((position, siblings.len()))
    }
}

impl ExpressionEngine for DotExpressionEngine {
    fn query(
        &self,
        handler: &dyn NodeHandler,
        root: NodeId,
        key: &str,
    ) -> ConfigResult<Vec<QueryResult>> {
        let parts = self.parse_key(key)?;
        let mut nodes = vec![root];
        for part in &parts {
            match part {
                KeyPart::Attribute(name) => {
                    // the parser guarantees this is the final part
                    let mut results = Vec::new();
                    for node in nodes {
                        if handler.attribute(node, name).is_some() {
                            results.push(QueryResult::Attribute {
                                node,
                                name: name.clone(),
                            });
                        }
                    }
                    return Ok(results);
                }
                KeyPart::Node { name, index } => {
                    let mut next = Vec::new();
                    for node in &nodes {
                        let matches = handler.children_named(*node, name);
                        match index {
                            None => next.extend(matches),
                            Some(i) if *i >= 0 => {
                                if let Some(selected) = matches.get(*i as usize) {
                                    next.push(*selected);
                                }
                            }
                            // (-1) designates "append new"; it never matches
                            Some(_) => {}
                        }
                    }
                    nodes = next;
                    if nodes.is_empty() {
                        return Ok(Vec::new());
                    }
                }
            }
        }
        Ok(nodes.into_iter().map(QueryResult::Node).collect())
    }

    fn node_key(&self, handler: &dyn NodeHandler, node: NodeId) -> ConfigResult<String> {
        let root = handler.root();
        let mut segments = Vec::new();
        let mut current = node;
        while current != root {
            let (position, count) = self.sibling_position(handler, current)?;
            if count > 1 {
                segments.push(format!("{}({})", handler.name(current), position));
            } else {
                segments.push(handler.name(current).to_string());
            }
            current = handler
                .parent(current)
                .ok_or_else(|| ConfigError::engine("node is not reachable from the root"))?;
        }
        segments.reverse();
        Ok(segments.join(&self.delimiter.to_string()))
    }

    fn join(&self, prefix: &str, key: &str) -> String {
        if prefix.is_empty() {
            key.to_string()
        } else if key.is_empty() {
            prefix.to_string()
        } else if key.starts_with("[@") {
            format!("{}{}", prefix, key)
        } else {
            format!("{}{}{}", prefix, self.delimiter, key)
        }
    }

    fn prepare_add(
        &self,
        handler: &dyn NodeHandler,
        root: NodeId,
        key: &str,
    ) -> ConfigResult<AddData> {
        let mut parts = self.parse_key(key)?;

        // the final part names the node or attribute to create
        let (new_name, attribute) = match parts.pop() {
            Some(KeyPart::Attribute(name)) => (name, true),
            Some(KeyPart::Node { name, index }) => {
                if matches!(index, Some(i) if i >= 0) {
                    return Err(ConfigError::key_parse(
                        key,
                        "cannot add at an indexed position",
                    ));
                }
                (name, false)
            }
            None => {
                return Err(ConfigError::key_parse(key, "cannot add at the empty key"));
            }
        };

        // walk the remaining location parts as far as existing nodes allow;
        // an explicit (-1) or a missing segment starts the new path
        let mut parent = root;
        let mut path_nodes = Vec::new();
        let mut walking = true;
        for part in parts {
            let KeyPart::Node { name, index } = part else {
                return Err(ConfigError::key_parse(
                    key,
                    "attribute selector must be the final segment",
                ));
            };
            if walking {
                match index {
                    Some(-1) => walking = false,
                    Some(i) => match handler.children_named(parent, &name).get(i as usize) {
                        Some(child) => {
                            parent = *child;
                            continue;
                        }
                        None => {
                            return Err(ConfigError::key_parse(
                                key,
                                "indexed segment does not exist",
                            ));
                        }
                    },
                    None => {
                        // descend into the last existing child of that name
                        if let Some(child) = handler.children_named(parent, &name).last() {
                            parent = *child;
                            continue;
                        }
                        walking = false;
                    }
                }
                path_nodes.push(name);
            } else {
                if matches!(index, Some(i) if i >= 0) {
                    return Err(ConfigError::key_parse(
                        key,
                        "indexed segment inside a new path",
                    ));
                }
                path_nodes.push(name);
            }
        }

        Ok(AddData {
            parent,
            path_nodes,
            new_name,
            attribute,
        })
    }
}
