// ABOUTME: Decoded device tree node structure
// ABOUTME: Property and child maps with path lookup and depth-first traversal

use crate::value::PropertyValue;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// A decoded device tree node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node name including unit address
    pub name: String,
    /// Decoded properties by name
    pub properties: BTreeMap<String, PropertyValue>,
    /// Child nodes by name
    pub children: BTreeMap<String, Node>,
}

impl Node {
    /// Create an empty node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// Set a property, replacing any previous value
    pub fn set_property(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.properties.insert(name.into(), value);
    }

    /// Add a child node; a sibling with the same name is replaced
    pub fn add_child(&mut self, child: Node) {
        self.children.insert(child.name.clone(), child);
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    /// Find a node by path (e.g., "/cpus/cpu@0")
    pub fn find_node(&self, path: &str) -> Option<&Node> {
        let path = path.strip_prefix('/').unwrap_or(path);
        if path.is_empty() {
            return Some(self);
        }
        path.split('/')
            .try_fold(self, |node, part| node.find_child_by_part(part))
    }

    /// Exact child name first, then a unique-ish match ignoring the unit address
    fn find_child_by_part(&self, part: &str) -> Option<&Node> {
        if let Some(child) = self.child(part) {
            return Some(child);
        }
        self.children
            .values()
            .find(|child| child.name.split_once('@').is_some_and(|(base, _)| base == part))
    }

    /// First integer of a numeric property as a cell
    pub fn prop_u32(&self, name: &str) -> Option<u32> {
        self.property(name)?
            .first_int()
            .and_then(|v| u32::try_from(v.raw()).ok())
    }

    /// First string of a string-list property
    pub fn prop_string(&self, name: &str) -> Option<&str> {
        self.property(name)?
            .as_strings()?
            .first()
            .map(String::as_str)
    }

    /// Get iterator over all nodes (depth-first traversal)
    pub fn iter_nodes(&self) -> NodeIterator<'_> {
        NodeIterator { stack: vec![self] }
    }
}

/// Iterator for depth-first traversal of decoded nodes
pub struct NodeIterator<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for NodeIterator<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reverse so the first child is visited next
        self.stack.extend(node.children.values().rev());
        Some(node)
    }
}

/// A node serializes as one map holding its properties and then its children
impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.properties.len() + self.children.len()))?;
        for (name, value) in &self.properties {
            map.serialize_entry(name, value)?;
        }
        for (name, child) in &self.children {
            map.serialize_entry(name, child)?;
        }
        map.end()
    }
}
