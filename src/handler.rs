//! Type-erased node structure access.
//!
//! The expression engine and the key-based access routines never touch a
//! [`NodeTree`](crate::node::NodeTree) directly; they go through the
//! [`NodeHandler`] trait so the same query logic works against any concrete
//! node representation (the live tree of a root configuration or the frozen
//! snapshot of a detached sub-view).

use crate::node::{NodeId, NodeTree};
use crate::value::ConfigValue;

/// Generic structural accessor over a tree of configuration nodes.
pub trait NodeHandler {
    /// Returns the root node of the structure.
    fn root(&self) -> NodeId;

    /// Returns the name of a node.
    fn name(&self, node: NodeId) -> &str;

    /// Returns the value of a node, if any.
    fn value(&self, node: NodeId) -> Option<&ConfigValue>;

    /// Returns the parent of a node (None for the root).
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Returns the ordered children of a node.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Returns the children of a node with the given name, in order.
    fn children_named(&self, node: NodeId, name: &str) -> Vec<NodeId>;

    /// Returns the value of the named attribute, if present.
    fn attribute(&self, node: NodeId, name: &str) -> Option<&ConfigValue>;

    /// Returns the attribute names of a node.
    fn attribute_names(&self, node: NodeId) -> Vec<String>;
}

/// [`NodeHandler`] implementation over an arena-backed [`NodeTree`].
pub struct TreeHandler<'a> {
    tree: &'a NodeTree,
}

impl<'a> TreeHandler<'a> {
    /// Creates a handler borrowing the given tree.
    pub fn new(tree: &'a NodeTree) -> Self {
        Self { tree }
    }
}

impl NodeHandler for TreeHandler<'_> {
    fn root(&self) -> NodeId {
        self.tree.root()
    }

    fn name(&self, node: NodeId) -> &str {
        self.tree.name(node)
    }

    fn value(&self, node: NodeId) -> Option<&ConfigValue> {
        self.tree.value(node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.parent(node)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree.children(node).to_vec()
    }

    fn children_named(&self, node: NodeId, name: &str) -> Vec<NodeId> {
        self.tree.children_named(node, name)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&ConfigValue> {
        self.tree.attribute(node, name)
    }

    fn attribute_names(&self, node: NodeId) -> Vec<String> {
        self.tree.attribute_names(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_handler_mirrors_tree() {
        let mut tree = NodeTree::new("config");
        let child = tree.add_child(tree.root(), "db");
        tree.set_value(child, Some(ConfigValue::from("postgres")));
        tree.set_attribute(child, "version", ConfigValue::from(15i64));

        let handler = TreeHandler::new(&tree);
        assert_eq!(handler.root(), tree.root());
        assert_eq!(handler.name(child), "db");
        assert_eq!(handler.value(child), Some(&ConfigValue::from("postgres")));
        assert_eq!(handler.parent(child), Some(tree.root()));
        assert_eq!(handler.children(tree.root()), vec![child]);
        assert_eq!(handler.children_named(tree.root(), "db"), vec![child]);
        assert_eq!(handler.children_named(tree.root(), "other"), Vec::new());
        assert_eq!(
            handler.attribute(child, "version"),
            Some(&ConfigValue::from(15i64))
        );
        assert_eq!(handler.attribute_names(child), vec!["version".to_string()]);
    }
}
