// SPDX-License-Identifier: MIT OR Apache-2.0
//! Elements of the attributed document tree.
//!
//! Every node, graph, definition and port in a [`Document`](crate::Document)
//! is an [`Element`] stored in the document arena and addressed by an
//! [`ElementId`]. Parent and connection links are non-owning lookups.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Semantic type of a node or port.
pub const TYPE_ATTRIBUTE: &str = "type";
/// Literal value string of a value element.
pub const VALUE_ATTRIBUTE: &str = "value";
/// Name of the upstream node a port is connected to.
pub const NODE_NAME_ATTRIBUTE: &str = "nodename";
/// Name of the enclosing graph parameter a port is bound to.
pub const INTERFACE_NAME_ATTRIBUTE: &str = "interfacename";
/// Output of a multi-output upstream node a port reads from.
pub const OUTPUT_ATTRIBUTE: &str = "output";
/// Node category declared by a node definition.
pub const NODE_ATTRIBUTE: &str = "node";
/// Node definition implemented by an implementation or node graph.
pub const NODE_DEF_ATTRIBUTE: &str = "nodedef";
/// Target an implementation is valid for.
pub const TARGET_ATTRIBUTE: &str = "target";
/// Source file of a code implementation.
pub const FILE_ATTRIBUTE: &str = "file";
/// Function name of a code implementation.
pub const FUNCTION_ATTRIBUTE: &str = "function";

/// Unique identifier for an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub Uuid);

impl ElementId {
    /// Create a new random element ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

/// Element kind, used for dispatch and ownership rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Document root
    Document,
    /// Node instance
    Node,
    /// Graph of nodes with boundary ports
    NodeGraph,
    /// Node signature declaration
    NodeDef,
    /// Code implementation of a node definition
    Implementation,
    /// Input port
    Input,
    /// Output port
    Output,
    /// Uniform parameter
    Parameter,
}

impl ElementKind {
    /// Category tag used for kinds that carry no user category
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Document => "materialx",
            Self::Node => "node",
            Self::NodeGraph => "nodegraph",
            Self::NodeDef => "nodedef",
            Self::Implementation => "implementation",
            Self::Input => "input",
            Self::Output => "output",
            Self::Parameter => "parameter",
        }
    }

    /// Whether elements of this kind take part in connections as nodes
    pub fn is_node_like(&self) -> bool {
        matches!(self, Self::Node | Self::NodeGraph)
    }

    /// Whether elements of this kind can carry a connection
    pub fn is_port(&self) -> bool {
        matches!(self, Self::Input | Self::Output)
    }

    /// Whether elements of this kind hold a typed value
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Input | Self::Output | Self::Parameter)
    }

    /// Check if an element of this kind may own a child of another kind
    pub fn can_own(&self, child: ElementKind) -> bool {
        match self {
            Self::Document => matches!(
                child,
                Self::Node | Self::NodeGraph | Self::NodeDef | Self::Implementation | Self::Output
            ),
            Self::NodeGraph => matches!(
                child,
                Self::Node | Self::NodeGraph | Self::Input | Self::Output | Self::Parameter
            ),
            Self::Node | Self::NodeDef => child.is_value(),
            Self::Implementation => matches!(child, Self::Input | Self::Parameter),
            Self::Input | Self::Output | Self::Parameter => false,
        }
    }
}

/// An element of the document tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    id: ElementId,
    kind: ElementKind,
    name: String,
    /// Node category for nodes, kind tag otherwise
    category: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    attributes: IndexMap<String, String>,
}

impl Element {
    pub(crate) fn new(
        kind: ElementKind,
        category: impl Into<String>,
        name: impl Into<String>,
        parent: Option<ElementId>,
    ) -> Self {
        Self {
            id: ElementId::new(),
            kind,
            name: name.into(),
            category: category.into(),
            parent,
            children: Vec::new(),
            attributes: IndexMap::new(),
        }
    }

    /// Element ID
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Element kind
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Name, unique among siblings
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Category tag
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Owning parent, `None` for the document root
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Children in document order
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Get an attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Check whether an attribute is present
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// All attributes in insertion order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<ElementId> {
        &mut self.children
    }

    pub(crate) fn insert_attribute(&mut self, key: &str, value: &str) -> Option<String> {
        self.attributes.insert(key.to_string(), value.to_string())
    }

    pub(crate) fn take_attribute(&mut self, key: &str) -> Option<String> {
        self.attributes.shift_remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_rules() {
        assert!(ElementKind::Document.can_own(ElementKind::NodeDef));
        assert!(ElementKind::NodeGraph.can_own(ElementKind::Node));
        assert!(ElementKind::Node.can_own(ElementKind::Input));
        assert!(!ElementKind::Node.can_own(ElementKind::Node));
        assert!(!ElementKind::Input.can_own(ElementKind::Input));
        assert!(!ElementKind::Implementation.can_own(ElementKind::Output));
    }

    #[test]
    fn test_kind_classes() {
        assert!(ElementKind::NodeGraph.is_node_like());
        assert!(!ElementKind::NodeDef.is_node_like());
        assert!(ElementKind::Output.is_port());
        assert!(!ElementKind::Parameter.is_port());
        assert!(ElementKind::Parameter.is_value());
    }

    #[test]
    fn test_attributes_keep_order() {
        let mut element = Element::new(ElementKind::Input, "input", "in1", None);
        element.insert_attribute(TYPE_ATTRIBUTE, "float");
        element.insert_attribute(VALUE_ATTRIBUTE, "0.5");
        assert_eq!(element.attribute(VALUE_ATTRIBUTE), Some("0.5"));
        let keys: Vec<_> = element.attributes().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![TYPE_ATTRIBUTE, VALUE_ATTRIBUTE]);
        assert_eq!(element.take_attribute(TYPE_ATTRIBUTE).as_deref(), Some("float"));
        assert!(!element.has_attribute(TYPE_ATTRIBUTE));
    }
}
