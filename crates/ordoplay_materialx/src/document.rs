// SPDX-License-Identifier: MIT OR Apache-2.0
//! Document arena owning every element of the tree.
//!
//! The document enforces sibling name uniqueness, mints fresh names on
//! demand and keeps a document-wide index from referenced node names to the
//! ports that name them. Removal never repairs references held elsewhere;
//! see [`Document::find_dangling_connections`].

use crate::config::GraphConfig;
use crate::element::{Element, ElementId, ElementKind, NODE_ATTRIBUTE, NODE_DEF_ATTRIBUTE, NODE_NAME_ATTRIBUTE};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A document holding nodes, graphs, definitions and implementations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    root: ElementId,
    elements: IndexMap<ElementId, Element>,
    /// Ports by the node name they reference
    #[serde(skip)]
    port_index: HashMap<String, IndexSet<ElementId>>,
    #[serde(default)]
    config: GraphConfig,
}

impl Document {
    /// Create a new empty document
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, GraphConfig::default())
    }

    /// Create a new empty document with the given configuration
    pub fn with_config(name: impl Into<String>, config: GraphConfig) -> Self {
        let root = Element::new(ElementKind::Document, ElementKind::Document.tag(), name, None);
        let id = root.id();
        let mut elements = IndexMap::new();
        elements.insert(id, root);
        Self {
            root: id,
            elements,
            port_index: HashMap::new(),
            config,
        }
    }

    /// Document root element
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Active configuration
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Replace the configuration
    pub fn set_config(&mut self, config: GraphConfig) {
        self.config = config;
    }

    /// Get an element by ID
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    pub(crate) fn require(&self, id: ElementId) -> Result<&Element, DocumentError> {
        self.element(id).ok_or(DocumentError::ElementNotFound(id))
    }

    /// Check whether an element is live
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Number of live elements, root included
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Element name
    pub fn name(&self, id: ElementId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    /// Element kind
    pub fn kind(&self, id: ElementId) -> Option<ElementKind> {
        self.element(id).map(Element::kind)
    }

    /// Element category
    pub fn category(&self, id: ElementId) -> Option<&str> {
        self.element(id).map(Element::category)
    }

    /// Owning parent
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.element(id).and_then(Element::parent)
    }

    /// Children in document order
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.element(id).map(Element::children).unwrap_or(&[])
    }

    /// Children of a single kind in document order
    pub fn children_of_kind(&self, id: ElementId, kind: ElementKind) -> Vec<ElementId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.kind(*child) == Some(kind))
            .collect()
    }

    /// Find a child by name
    pub fn child(&self, parent: ElementId, name: &str) -> Option<ElementId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|child| self.name(*child) == Some(name))
    }

    /// Find a child by name, restricted to one kind
    pub fn child_of_kind(&self, parent: ElementId, name: &str, kind: ElementKind) -> Option<ElementId> {
        self.child(parent, name).filter(|child| self.kind(*child) == Some(kind))
    }

    /// Position of a child among its siblings
    pub fn child_index(&self, parent: ElementId, child: ElementId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    /// Move a child to a new position among its siblings
    pub fn set_child_index(&mut self, parent: ElementId, child: ElementId, index: usize) -> Result<(), DocumentError> {
        let current = self
            .child_index(parent, child)
            .ok_or(DocumentError::ElementNotFound(child))?;
        let children = self
            .element_mut(parent)
            .ok_or(DocumentError::ElementNotFound(parent))?
            .children_mut();
        let moved = children.remove(current);
        children.insert(index.min(children.len()), moved);
        Ok(())
    }

    /// Return `base` if no child of `parent` uses it, otherwise the first free
    /// name formed by incrementing its numeric suffix (`base2`, `base3`, ...).
    pub fn create_valid_child_name(&self, parent: ElementId, base: &str) -> String {
        if self.child(parent, base).is_none() {
            return base.to_string();
        }
        let stem = base.trim_end_matches(|c: char| c.is_ascii_digit());
        let suffix = &base[stem.len()..];
        // A suffix too large to increment starts a fresh one after the full name
        let (stem, mut counter) = if suffix.is_empty() {
            (stem, 2)
        } else {
            match suffix.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
                Some(next) => (stem, next),
                None => (base, 2),
            }
        };
        loop {
            let candidate = format!("{stem}{counter}");
            if self.child(parent, &candidate).is_none() {
                return candidate;
            }
            counter = counter.saturating_add(1);
        }
    }

    /// Add a child element. An empty name mints one from the category.
    pub fn add_child(
        &mut self,
        parent: ElementId,
        kind: ElementKind,
        category: &str,
        name: &str,
    ) -> Result<ElementId, DocumentError> {
        let parent_kind = self.require(parent)?.kind();
        if !parent_kind.can_own(kind) {
            return Err(DocumentError::InvalidChild {
                parent: parent_kind,
                child: kind,
            });
        }
        let name = if name.is_empty() {
            self.create_valid_child_name(parent, &format!("{category}1"))
        } else if self.child(parent, name).is_some() {
            return Err(DocumentError::DuplicateName {
                parent,
                name: name.to_string(),
            });
        } else {
            name.to_string()
        };

        let element = Element::new(kind, category, name, Some(parent));
        let id = element.id();
        self.elements.insert(id, element);
        if let Some(parent) = self.element_mut(parent) {
            parent.children_mut().push(id);
        }
        Ok(id)
    }

    /// Remove a named child and its subtree.
    ///
    /// Ports elsewhere that reference the removed element by name are left
    /// dangling.
    pub fn remove_child(&mut self, parent: ElementId, name: &str) -> Option<Element> {
        let child = self.child(parent, name)?;
        self.remove_element(child)
    }

    /// Remove an element and its subtree. The root cannot be removed.
    pub fn remove_element(&mut self, id: ElementId) -> Option<Element> {
        if id == self.root || !self.contains(id) {
            return None;
        }
        if let Some(parent) = self.parent(id).and_then(|p| self.element_mut(p)) {
            parent.children_mut().retain(|c| *c != id);
        }
        let mut removed = None;
        for descendant in self.descendants(id) {
            if let Some(element) = self.elements.swap_remove(&descendant) {
                if let Some(node_name) = element.attribute(NODE_NAME_ATTRIBUTE) {
                    self.unindex_port(node_name, descendant);
                }
                if descendant == id {
                    removed = Some(element);
                }
            }
        }
        removed
    }

    /// Element followed by all its descendants in document order
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// Get an attribute value
    pub fn attribute(&self, id: ElementId, key: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(key))
    }

    /// Set an attribute value
    pub fn set_attribute(&mut self, id: ElementId, key: &str, value: &str) -> Result<(), DocumentError> {
        let previous = self
            .element_mut(id)
            .ok_or(DocumentError::ElementNotFound(id))?
            .insert_attribute(key, value);
        if key == NODE_NAME_ATTRIBUTE {
            if let Some(previous) = previous {
                self.unindex_port(&previous, id);
            }
            self.index_port(value, id);
        }
        Ok(())
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attribute(&mut self, id: ElementId, key: &str) -> Option<String> {
        let previous = self.element_mut(id)?.take_attribute(key)?;
        if key == NODE_NAME_ATTRIBUTE {
            self.unindex_port(&previous, id);
        }
        Some(previous)
    }

    /// Replace the attributes and children of `dest` with a deep copy of
    /// those of `src`. The name and category of `dest` are kept.
    pub fn copy_content_from(&mut self, dest: ElementId, src: ElementId) -> Result<(), DocumentError> {
        self.require(src)?;
        if dest == src {
            return Ok(());
        }
        for child in self.require(dest)?.children().to_vec() {
            self.remove_element(child);
        }
        let keys: Vec<String> = self.require(dest)?.attributes().map(|(k, _)| k.to_string()).collect();
        for key in keys {
            self.remove_attribute(dest, &key);
        }

        let mut pending = vec![(src, dest)];
        while let Some((from, to)) = pending.pop() {
            let source = self.require(from)?.clone();
            for (key, value) in source.attributes() {
                self.set_attribute(to, key, value)?;
            }
            for &child in source.children() {
                let original = self.require(child)?;
                let (kind, category, name) = (
                    original.kind(),
                    original.category().to_string(),
                    original.name().to_string(),
                );
                let copy = self.add_child(to, kind, &category, &name)?;
                pending.push((child, copy));
            }
        }
        Ok(())
    }

    /// Node definitions declaring a node category, in document order
    pub fn matching_node_defs(&self, category: &str) -> Vec<ElementId> {
        self.children_of_kind(self.root, ElementKind::NodeDef)
            .into_iter()
            .filter(|def| self.attribute(*def, NODE_ATTRIBUTE) == Some(category))
            .collect()
    }

    /// Implementations and node graphs implementing a node definition, in
    /// document order
    pub fn matching_implementations(&self, node_def_name: &str) -> Vec<ElementId> {
        self.children(self.root)
            .iter()
            .copied()
            .filter(|id| {
                matches!(
                    self.kind(*id),
                    Some(ElementKind::Implementation | ElementKind::NodeGraph)
                ) && self.attribute(*id, NODE_DEF_ATTRIBUTE) == Some(node_def_name)
            })
            .collect()
    }

    /// Ports whose connection names `node_name`, whether or not it resolves
    pub fn ports_referencing(&self, node_name: &str) -> Vec<ElementId> {
        self.port_index
            .get(node_name)
            .map(|ports| ports.iter().copied().collect())
            .unwrap_or_default()
    }

    fn index_port(&mut self, node_name: &str, port: ElementId) {
        if !node_name.is_empty() {
            self.port_index.entry(node_name.to_string()).or_default().insert(port);
        }
    }

    fn unindex_port(&mut self, node_name: &str, port: ElementId) {
        if let Some(ports) = self.port_index.get_mut(node_name) {
            ports.shift_remove(&port);
            if ports.is_empty() {
                self.port_index.remove(node_name);
            }
        }
    }

    fn rebuild_index(&mut self) {
        self.port_index.clear();
        for id in self.descendants(self.root) {
            let node_name = self.attribute(id, NODE_NAME_ATTRIBUTE).map(str::to_string);
            if let Some(node_name) = node_name {
                self.index_port(&node_name, id);
            }
        }
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        let mut document: Self = ron::from_str(s)?;
        document.rebuild_index();
        Ok(document)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when mutating the document tree
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Element not found
    #[error("Element not found: {0:?}")]
    ElementNotFound(ElementId),

    /// A sibling already uses the name
    #[error("Duplicate child name '{name}'")]
    DuplicateName {
        /// Parent the child was added to
        parent: ElementId,
        /// Conflicting name
        name: String,
    },

    /// The parent kind cannot own the child kind
    #[error("{parent:?} cannot own {child:?}")]
    InvalidChild {
        /// Kind of the parent
        parent: ElementKind,
        /// Kind of the rejected child
        child: ElementKind,
    },
}
