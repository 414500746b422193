// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions and their implementations.
//!
//! A node carries no reference to its definition. Both the definition and
//! the implementation for a target are found by an ordered search over the
//! document, and the first match in document order wins.

use crate::document::{Document, DocumentError};
use crate::element::{
    ElementId, ElementKind, FILE_ATTRIBUTE, FUNCTION_ATTRIBUTE, NODE_ATTRIBUTE, NODE_DEF_ATTRIBUTE,
    TARGET_ATTRIBUTE, TYPE_ATTRIBUTE,
};
use tracing::trace;

/// Resolved implementation of a node for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Implementation {
    /// Opaque code reference
    Code(ElementId),
    /// Node graph implementing the definition structurally
    Graph(ElementId),
}

impl Implementation {
    /// Element holding the implementation
    pub fn element(&self) -> ElementId {
        match self {
            Self::Code(id) | Self::Graph(id) => *id,
        }
    }

    /// The implementing graph, if this is a structural implementation
    pub fn as_graph(&self) -> Option<ElementId> {
        match self {
            Self::Graph(id) => Some(*id),
            Self::Code(_) => None,
        }
    }
}

impl Document {
    /// Declare a node definition for `node_category` producing `output_type`
    pub fn add_node_def(
        &mut self,
        name: &str,
        node_category: &str,
        output_type: &str,
    ) -> Result<ElementId, DocumentError> {
        let root = self.root();
        let def = self.add_child(root, ElementKind::NodeDef, ElementKind::NodeDef.tag(), name)?;
        self.set_attribute(def, NODE_ATTRIBUTE, node_category)?;
        self.set_attribute(def, TYPE_ATTRIBUTE, output_type)?;
        Ok(def)
    }

    /// All node definitions in document order
    pub fn node_defs(&self) -> Vec<ElementId> {
        self.children_of_kind(self.root(), ElementKind::NodeDef)
    }

    /// Add a code implementation of a node definition for a target
    pub fn add_implementation(
        &mut self,
        name: &str,
        node_def: &str,
        target: &str,
    ) -> Result<ElementId, DocumentError> {
        let root = self.root();
        let implementation = self.add_child(
            root,
            ElementKind::Implementation,
            ElementKind::Implementation.tag(),
            name,
        )?;
        self.set_attribute(implementation, NODE_DEF_ATTRIBUTE, node_def)?;
        if !target.is_empty() {
            self.set_attribute(implementation, TARGET_ATTRIBUTE, target)?;
        }
        Ok(implementation)
    }

    /// Point a code implementation at its source
    pub fn set_implementation_source(
        &mut self,
        implementation: ElementId,
        file: &str,
        function: &str,
    ) -> Result<(), DocumentError> {
        self.set_attribute(implementation, FILE_ATTRIBUTE, file)?;
        self.set_attribute(implementation, FUNCTION_ATTRIBUTE, function)
    }

    /// Mark an implementation or node graph as implementing a node definition
    pub fn set_node_def_name(&mut self, element: ElementId, node_def: &str) -> Result<(), DocumentError> {
        self.set_attribute(element, NODE_DEF_ATTRIBUTE, node_def)
    }

    /// Set the target of an implementation or node graph
    pub fn set_target(&mut self, element: ElementId, target: &str) -> Result<(), DocumentError> {
        self.set_attribute(element, TARGET_ATTRIBUTE, target)
    }

    /// Target of an implementation, empty when unset
    pub fn target(&self, element: ElementId) -> &str {
        self.attribute(element, TARGET_ATTRIBUTE).unwrap_or_default()
    }

    /// Find the node definition a node refers to.
    ///
    /// Candidates share the node's category; the first one whose output type
    /// equals the node's type is returned. Inputs whose declared type differs
    /// from the node's are traced but do not reject the candidate.
    pub fn referenced_node_def(&self, node: ElementId) -> Option<ElementId> {
        let category = self.category(node)?;
        let node_type = self.value_type(node);
        let def = self
            .matching_node_defs(category)
            .into_iter()
            .find(|def| self.value_type(*def) == node_type)?;

        for input in self.inputs(node) {
            let Some(input_name) = self.name(input) else {
                continue;
            };
            if let Some(declared) = self.input(def, input_name) {
                if self.value_type(declared) != self.value_type(input) {
                    trace!(
                        "Input '{}' of node '{}' has type {:?}, definition '{}' declares {:?}",
                        input_name,
                        self.name(node).unwrap_or_default(),
                        self.value_type(input),
                        self.name(def).unwrap_or_default(),
                        self.value_type(declared),
                    );
                }
            }
        }

        Some(def)
    }

    /// Find the implementation of a node for a target.
    ///
    /// Returns the first implementation of the node's definition, in
    /// document order, whose target equals `target`.
    pub fn implementation(&self, node: ElementId, target: &str) -> Option<Implementation> {
        let def = self.referenced_node_def(node)?;
        let def_name = self.name(def)?;
        self.matching_implementations(def_name)
            .into_iter()
            .find(|candidate| self.target(*candidate) == target)
            .and_then(|candidate| match self.kind(candidate)? {
                ElementKind::NodeGraph => Some(Implementation::Graph(candidate)),
                ElementKind::Implementation => Some(Implementation::Code(candidate)),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_node(doc: &mut Document, category: &str, node_type: &str) -> ElementId {
        let root = doc.root();
        let graph = doc.add_child(root, ElementKind::NodeGraph, "nodegraph", "graph").unwrap();
        let node = doc.add_child(graph, ElementKind::Node, category, "n1").unwrap();
        doc.set_value_type(node, node_type).unwrap();
        node
    }

    #[test]
    fn test_node_def_matches_category_and_type() {
        let mut doc = Document::new("doc");
        doc.add_node_def("ND_add_float", "add", "float").unwrap();
        let color = doc.add_node_def("ND_add_color3", "add", "color3").unwrap();
        doc.add_node_def("ND_multiply_color3", "multiply", "color3").unwrap();
        let node = graph_with_node(&mut doc, "add", "color3");
        assert_eq!(doc.referenced_node_def(node), Some(color));
    }

    #[test]
    fn test_node_def_first_match_wins() {
        let mut doc = Document::new("doc");
        let first = doc.add_node_def("ND_mix_a", "mix", "float").unwrap();
        doc.add_node_def("ND_mix_b", "mix", "float").unwrap();
        let node = graph_with_node(&mut doc, "mix", "float");
        assert_eq!(doc.referenced_node_def(node), Some(first));
    }

    #[test]
    fn test_node_def_tolerates_input_type_mismatch() {
        let mut doc = Document::new("doc");
        let def = doc.add_node_def("ND_add_float", "add", "float").unwrap();
        doc.add_input(def, "in1", "float").unwrap();
        let node = graph_with_node(&mut doc, "add", "float");
        doc.add_input(node, "in1", "vector3").unwrap();
        assert_eq!(doc.referenced_node_def(node), Some(def));
    }

    #[test]
    fn test_node_def_missing() {
        let mut doc = Document::new("doc");
        doc.add_node_def("ND_add_float", "add", "float").unwrap();
        let node = graph_with_node(&mut doc, "add", "color4");
        assert_eq!(doc.referenced_node_def(node), None);
        assert_eq!(doc.implementation(node, "glsl"), None);
    }

    #[test]
    fn test_implementation_selects_target() {
        let mut doc = Document::new("doc");
        doc.add_node_def("ND_add_float", "add", "float").unwrap();
        let osl = doc.add_implementation("IM_add_float_osl", "ND_add_float", "osl").unwrap();
        let glsl = doc.add_implementation("IM_add_float_glsl", "ND_add_float", "glsl").unwrap();
        doc.set_implementation_source(glsl, "mx_add.glsl", "mx_add_float").unwrap();
        let node = graph_with_node(&mut doc, "add", "float");

        assert_eq!(doc.implementation(node, "glsl"), Some(Implementation::Code(glsl)));
        assert_eq!(doc.implementation(node, "osl"), Some(Implementation::Code(osl)));
        assert_eq!(doc.implementation(node, "mdl"), None);
    }

    #[test]
    fn test_graph_implementation() {
        let mut doc = Document::new("doc");
        let root = doc.root();
        doc.add_node_def("ND_tint_color3", "tint", "color3").unwrap();
        let impl_graph = doc.add_child(root, ElementKind::NodeGraph, "nodegraph", "NG_tint").unwrap();
        doc.set_node_def_name(impl_graph, "ND_tint_color3").unwrap();
        doc.set_target(impl_graph, "glsl").unwrap();
        let node = graph_with_node(&mut doc, "tint", "color3");

        let found = doc.implementation(node, "glsl").unwrap();
        assert_eq!(found, Implementation::Graph(impl_graph));
        assert_eq!(found.as_graph(), Some(impl_graph));
        assert_eq!(found.element(), impl_graph);
    }

    #[test]
    fn test_untargeted_implementation_matches_empty_target() {
        let mut doc = Document::new("doc");
        doc.add_node_def("ND_add_float", "add", "float").unwrap();
        let generic = doc.add_implementation("IM_add_float", "ND_add_float", "").unwrap();
        let node = graph_with_node(&mut doc, "add", "float");
        assert_eq!(doc.implementation(node, ""), Some(Implementation::Code(generic)));
        assert_eq!(doc.implementation(node, "glsl"), None);
    }
}
