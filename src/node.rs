//! Arena-backed configuration node tree.
//!
//! Nodes live in a slot vector owned by a single [`NodeTree`]; parents and
//! children reference each other through [`NodeId`] indices, never through
//! owning pointers, so removing a subtree can never be blocked by a cycle.
//! Slots are vacated on removal and **never reused**, which means a stale
//! `NodeId` held by an out-of-date sub-view can only point at a vacated slot,
//! never at an unrelated newer node.

use crate::value::ConfigValue;

/// Identifier of a node inside a [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    value: Option<ConfigValue>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<(String, ConfigValue)>,
}

impl NodeData {
    fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            value: None,
            parent,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

/// Ownership structure of hierarchical configuration data.
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Option<NodeData>>,
    root: NodeId,
}

impl NodeTree {
    /// Creates a tree consisting of a single root node with the given name.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Some(NodeData::new(root_name, None))],
            root: NodeId(0),
        }
    }

    /// Returns the id of the root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns true if the id refers to a live node of this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).map_or(false, Option::is_some)
    }

    /// Returns true if the node is live and reachable from the root by
    /// following parent references.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.data(current).parent {
                Some(parent) if self.contains(parent) => current = parent,
                _ => return false,
            }
        }
    }

    fn data(&self, id: NodeId) -> &NodeData {
        self.nodes[id.0]
            .as_ref()
            .expect("node id refers to a vacated slot")
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.nodes[id.0]
            .as_mut()
            .expect("node id refers to a vacated slot")
    }

    /// Returns the name of a node.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn name(&self, id: NodeId) -> &str {
        &self.data(id).name
    }

    /// Returns the value stored at a node, if any.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn value(&self, id: NodeId) -> Option<&ConfigValue> {
        self.data(id).value.as_ref()
    }

    /// Sets or clears the value stored at a node.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn set_value(&mut self, id: NodeId, value: Option<ConfigValue>) {
        self.data_mut(id).value = value;
    }

    /// Returns the parent of a node (None for the root).
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    /// Returns the ordered children of a node.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    /// Returns the children of a node carrying the given name, in order.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.data(id)
            .children
            .iter()
            .copied()
            .filter(|child| self.data(*child).name == name)
            .collect()
    }

    /// Appends a new child node and returns its id.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(NodeData::new(name, Some(parent))));
        self.data_mut(parent).children.push(id);
        id
    }

    /// Returns the value of the named attribute, if present.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&ConfigValue> {
        self.data(id)
            .attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value)
    }

    /// Sets an attribute, replacing any existing value of the same name.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn set_attribute(&mut self, id: NodeId, name: impl Into<String>, value: ConfigValue) {
        let name = name.into();
        let data = self.data_mut(id);
        if let Some(entry) = data.attributes.iter_mut().find(|(attr, _)| *attr == name) {
            entry.1 = value;
        } else {
            data.attributes.push((name, value));
        }
    }

    /// Removes an attribute; returns true if it existed.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let data = self.data_mut(id);
        let before = data.attributes.len();
        data.attributes.retain(|(attr, _)| attr != name);
        data.attributes.len() != before
    }

    /// Returns the attribute names of a node, in insertion order.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn attribute_names(&self, id: NodeId) -> Vec<String> {
        self.data(id)
            .attributes
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Removes a node and its entire subtree from the tree. Removing the
    /// root clears its value, attributes and children but keeps the node.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            self.clear_all();
            return;
        }
        if let Some(parent) = self.data(id).parent {
            self.data_mut(parent).children.retain(|child| *child != id);
        }
        self.vacate(id);
    }

    fn vacate(&mut self, id: NodeId) {
        let children = self.data(id).children.clone();
        for child in children {
            self.vacate(child);
        }
        self.nodes[id.0] = None;
    }

    /// Vacates the children of a node and resets its value and attributes,
    /// keeping the node itself in place.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn clear_node(&mut self, id: NodeId) {
        let children = self.data(id).children.clone();
        for child in children {
            self.vacate(child);
        }
        let data = self.data_mut(id);
        data.children.clear();
        data.value = None;
        data.attributes.clear();
    }

    /// Vacates everything below the root and resets the root's own value and
    /// attributes. Slot indices of removed nodes stay unused afterwards.
    pub fn clear_all(&mut self) {
        self.clear_node(self.root);
    }

    /// Creates an independent tree whose root is a deep copy of the given
    /// node. Used to capture frozen snapshots for detached sub-views.
    ///
    /// # Panics
    /// Panics if the id refers to a node that has been removed.
    pub fn clone_subtree(&self, id: NodeId) -> NodeTree {
        let mut snapshot = NodeTree::new(self.data(id).name.clone());
        let source = self.data(id);
        {
            let target_root = snapshot.root;
            let target = snapshot.data_mut(target_root);
            target.value = source.value.clone();
            target.attributes = source.attributes.clone();
        }
        let target_root = snapshot.root;
        for child in &source.children {
            self.copy_into(*child, &mut snapshot, target_root);
        }
        snapshot
    }

    fn copy_into(&self, id: NodeId, target: &mut NodeTree, target_parent: NodeId) {
        let source = self.data(id);
        let copied = target.add_child(target_parent, source.name.clone());
        {
            let data = target.data_mut(copied);
            data.value = source.value.clone();
            data.attributes = source.attributes.clone();
        }
        for child in &source.children {
            self.copy_into(*child, target, copied);
        }
    }
}
