// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port and value element operations.
//!
//! Inputs, outputs and parameters are value elements: they carry a semantic
//! type string and optionally a literal value. Inputs and outputs may also
//! name an upstream node, and any value element may be bound to a boundary
//! parameter of an enclosing graph through its interface name.

use crate::document::{Document, DocumentError};
use crate::element::{
    ElementId, ElementKind, INTERFACE_NAME_ATTRIBUTE, NODE_NAME_ATTRIBUTE, TYPE_ATTRIBUTE,
    VALUE_ATTRIBUTE,
};

impl Document {
    fn add_value_element(
        &mut self,
        owner: ElementId,
        kind: ElementKind,
        name: &str,
        value_type: &str,
    ) -> Result<ElementId, DocumentError> {
        let id = self.add_child(owner, kind, kind.tag(), name)?;
        if !value_type.is_empty() {
            self.set_attribute(id, TYPE_ATTRIBUTE, value_type)?;
        }
        Ok(id)
    }

    /// Add an input port
    pub fn add_input(&mut self, owner: ElementId, name: &str, value_type: &str) -> Result<ElementId, DocumentError> {
        self.add_value_element(owner, ElementKind::Input, name, value_type)
    }

    /// Add an output port
    pub fn add_output(&mut self, owner: ElementId, name: &str, value_type: &str) -> Result<ElementId, DocumentError> {
        self.add_value_element(owner, ElementKind::Output, name, value_type)
    }

    /// Add a uniform parameter
    pub fn add_parameter(&mut self, owner: ElementId, name: &str, value_type: &str) -> Result<ElementId, DocumentError> {
        self.add_value_element(owner, ElementKind::Parameter, name, value_type)
    }

    /// Get an input by name
    pub fn input(&self, owner: ElementId, name: &str) -> Option<ElementId> {
        self.child_of_kind(owner, name, ElementKind::Input)
    }

    /// Get an output by name
    pub fn output(&self, owner: ElementId, name: &str) -> Option<ElementId> {
        self.child_of_kind(owner, name, ElementKind::Output)
    }

    /// Get a parameter by name
    pub fn parameter(&self, owner: ElementId, name: &str) -> Option<ElementId> {
        self.child_of_kind(owner, name, ElementKind::Parameter)
    }

    /// Inputs in document order
    pub fn inputs(&self, owner: ElementId) -> Vec<ElementId> {
        self.children_of_kind(owner, ElementKind::Input)
    }

    /// Outputs in document order
    pub fn outputs(&self, owner: ElementId) -> Vec<ElementId> {
        self.children_of_kind(owner, ElementKind::Output)
    }

    /// Inputs, outputs and parameters in document order
    pub fn value_elements(&self, owner: ElementId) -> Vec<ElementId> {
        self.children(owner)
            .iter()
            .copied()
            .filter(|child| self.kind(*child).is_some_and(|k| k.is_value()))
            .collect()
    }

    /// Find a value element of any kind by name
    pub fn value_element(&self, owner: ElementId, name: &str) -> Option<ElementId> {
        self.child(owner, name)
            .filter(|child| self.kind(*child).is_some_and(|k| k.is_value()))
    }

    /// Remove an input by name
    pub fn remove_input(&mut self, owner: ElementId, name: &str) -> bool {
        self.input(owner, name)
            .and_then(|input| self.remove_element(input))
            .is_some()
    }

    /// Remove an output by name
    pub fn remove_output(&mut self, owner: ElementId, name: &str) -> bool {
        self.output(owner, name)
            .and_then(|output| self.remove_element(output))
            .is_some()
    }

    /// Semantic type of a node or value element
    pub fn value_type(&self, id: ElementId) -> Option<&str> {
        self.attribute(id, TYPE_ATTRIBUTE)
    }

    /// Set the semantic type of a node or value element
    pub fn set_value_type(&mut self, id: ElementId, value_type: &str) -> Result<(), DocumentError> {
        self.set_attribute(id, TYPE_ATTRIBUTE, value_type)
    }

    /// Literal value string
    pub fn value(&self, id: ElementId) -> Option<&str> {
        self.attribute(id, VALUE_ATTRIBUTE)
    }

    /// Check whether a literal value is present
    pub fn has_value(&self, id: ElementId) -> bool {
        self.value(id).is_some()
    }

    /// Set the literal value string
    pub fn set_value(&mut self, id: ElementId, value: &str) -> Result<(), DocumentError> {
        self.set_attribute(id, VALUE_ATTRIBUTE, value)
    }

    /// Name of the upstream node this port references
    pub fn port_node_name(&self, port: ElementId) -> Option<&str> {
        self.attribute(port, NODE_NAME_ATTRIBUTE).filter(|name| !name.is_empty())
    }

    /// Set the upstream node name. An empty name clears the connection.
    pub fn set_port_node_name(&mut self, port: ElementId, node_name: &str) -> Result<(), DocumentError> {
        if node_name.is_empty() {
            self.require(port)?;
            self.remove_attribute(port, NODE_NAME_ATTRIBUTE);
            Ok(())
        } else {
            self.set_attribute(port, NODE_NAME_ATTRIBUTE, node_name)
        }
    }

    /// Name of the enclosing graph parameter this element is bound to
    pub fn interface_name(&self, id: ElementId) -> Option<&str> {
        self.attribute(id, INTERFACE_NAME_ATTRIBUTE).filter(|name| !name.is_empty())
    }

    /// Bind this element to a boundary parameter of the enclosing graph
    pub fn set_interface_name(&mut self, id: ElementId, interface_name: &str) -> Result<(), DocumentError> {
        self.set_attribute(id, INTERFACE_NAME_ATTRIBUTE, interface_name)
    }

    /// Remove the interface binding
    pub fn clear_interface_name(&mut self, id: ElementId) -> Result<(), DocumentError> {
        self.require(id)?;
        self.remove_attribute(id, INTERFACE_NAME_ATTRIBUTE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_fixture() -> (Document, ElementId) {
        let mut doc = Document::new("doc");
        let root = doc.root();
        let graph = doc.add_child(root, ElementKind::NodeGraph, "nodegraph", "graph").unwrap();
        let node = doc.add_child(graph, ElementKind::Node, "add", "add1").unwrap();
        (doc, node)
    }

    #[test]
    fn test_add_ports() {
        let (mut doc, node) = node_fixture();
        let in1 = doc.add_input(node, "in1", "float").unwrap();
        let out = doc.add_output(node, "out", "float").unwrap();
        let param = doc.add_parameter(node, "channels", "string").unwrap();

        assert_eq!(doc.inputs(node), vec![in1]);
        assert_eq!(doc.outputs(node), vec![out]);
        assert_eq!(doc.parameter(node, "channels"), Some(param));
        assert_eq!(doc.value_elements(node), vec![in1, out, param]);
        assert_eq!(doc.value_type(in1), Some("float"));
        assert!(doc.input(node, "out").is_none());
    }

    #[test]
    fn test_values() {
        let (mut doc, node) = node_fixture();
        let in1 = doc.add_input(node, "in1", "float").unwrap();
        assert!(!doc.has_value(in1));
        doc.set_value(in1, "0.25").unwrap();
        assert_eq!(doc.value(in1), Some("0.25"));
    }

    #[test]
    fn test_node_name_clear() {
        let (mut doc, node) = node_fixture();
        let in1 = doc.add_input(node, "in1", "float").unwrap();
        doc.set_port_node_name(in1, "constant1").unwrap();
        assert_eq!(doc.port_node_name(in1), Some("constant1"));
        doc.set_port_node_name(in1, "").unwrap();
        assert_eq!(doc.port_node_name(in1), None);
        assert!(doc.ports_referencing("constant1").is_empty());
    }

    #[test]
    fn test_interface_binding() {
        let (mut doc, node) = node_fixture();
        let in1 = doc.add_input(node, "in1", "float").unwrap();
        doc.set_interface_name(in1, "amount").unwrap();
        assert_eq!(doc.interface_name(in1), Some("amount"));
        doc.clear_interface_name(in1).unwrap();
        assert_eq!(doc.interface_name(in1), None);
    }

    #[test]
    fn test_remove_ports() {
        let (mut doc, node) = node_fixture();
        doc.add_input(node, "in1", "float").unwrap();
        doc.add_output(node, "out", "float").unwrap();
        assert!(doc.remove_input(node, "in1"));
        assert!(!doc.remove_input(node, "in1"));
        assert!(!doc.remove_input(node, "out"));
        assert!(doc.remove_output(node, "out"));
        assert!(doc.value_elements(node).is_empty());
    }
}
