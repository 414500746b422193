// SPDX-License-Identifier: MIT OR Apache-2.0
//! Name-resolved connections and dependency edges.
//!
//! Connections are stored as node names on ports and resolved on every
//! query, so nothing here caches element IDs across mutations.

use crate::document::{Document, DocumentError};
use crate::element::{ElementId, ElementKind, OUTPUT_ATTRIBUTE};
use serde::{Deserialize, Serialize};

/// A resolved dependency between a downstream element and its upstream node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Element consuming the value
    pub downstream: ElementId,
    /// Port carrying the connection
    pub connecting_port: ElementId,
    /// Node producing the value
    pub upstream: ElementId,
}

impl Edge {
    /// Create a new edge
    pub fn new(downstream: ElementId, connecting_port: ElementId, upstream: ElementId) -> Self {
        Self {
            downstream,
            connecting_port,
            upstream,
        }
    }
}

impl Document {
    /// First scope searched when resolving a port's connection: the graph
    /// owning the port's node, or the graph itself for boundary outputs.
    fn connection_scope(&self, port: ElementId) -> Option<ElementId> {
        let owner = self.parent(port)?;
        match (self.kind(port)?, self.kind(owner)?) {
            (ElementKind::Output, ElementKind::NodeGraph | ElementKind::Document) => Some(owner),
            _ => self.parent(owner),
        }
    }

    /// Resolve the node a port is connected to, searching the enclosing
    /// graph first and then each ancestor scope.
    pub fn port_connected_node(&self, port: ElementId) -> Option<ElementId> {
        let node_name = self.port_node_name(port)?;
        let mut scope = self.connection_scope(port);
        while let Some(current) = scope {
            let found = self
                .child(current, node_name)
                .filter(|id| self.kind(*id).is_some_and(|k| k.is_node_like()));
            if found.is_some() {
                return found;
            }
            scope = self.parent(current);
        }
        None
    }

    /// Connect a port to a node, or disconnect it with `None`
    pub fn connect_port(&mut self, port: ElementId, upstream: Option<ElementId>) -> Result<(), DocumentError> {
        let node_name = match upstream {
            Some(node) => self.require(node)?.name().to_string(),
            None => String::new(),
        };
        self.set_port_node_name(port, &node_name)
    }

    /// Connect an input of `node` to `upstream`, creating the input with the
    /// upstream type if it does not exist yet.
    pub fn set_connected_node(
        &mut self,
        node: ElementId,
        input_name: &str,
        upstream: ElementId,
    ) -> Result<ElementId, DocumentError> {
        let input = match self.input(node, input_name) {
            Some(input) => input,
            None => {
                let upstream_type = self.value_type(upstream).unwrap_or_default().to_string();
                self.add_input(node, input_name, &upstream_type)?
            }
        };
        self.connect_port(input, Some(upstream))?;
        Ok(input)
    }

    /// Resolve the node connected to an input of `node`
    pub fn connected_node(&self, node: ElementId, input_name: &str) -> Option<ElementId> {
        let input = self.input(node, input_name)?;
        self.port_connected_node(input)
    }

    /// Set the upstream node name of an input, creating the input if needed
    pub fn set_connected_node_name(
        &mut self,
        node: ElementId,
        input_name: &str,
        node_name: &str,
    ) -> Result<ElementId, DocumentError> {
        let input = match self.input(node, input_name) {
            Some(input) => input,
            None => self.add_input(node, input_name, "")?,
        };
        self.set_port_node_name(input, node_name)?;
        Ok(input)
    }

    /// Upstream node name stored on an input, resolved or not
    pub fn connected_node_name(&self, node: ElementId, input_name: &str) -> Option<&str> {
        let input = self.input(node, input_name)?;
        self.port_node_name(input)
    }

    /// Number of potential upstream edges: one per input on a node, one for
    /// an output, none for anything else
    pub fn upstream_edge_count(&self, element: ElementId) -> usize {
        match self.kind(element) {
            Some(kind) if kind.is_node_like() => self.inputs(element).len(),
            Some(ElementKind::Output) => 1,
            _ => 0,
        }
    }

    /// Edge for the input at `index`, if it exists and resolves
    pub fn upstream_edge(&self, element: ElementId, index: usize) -> Option<Edge> {
        let port = match self.kind(element)? {
            kind if kind.is_node_like() => *self.inputs(element).get(index)?,
            ElementKind::Output if index == 0 => element,
            _ => return None,
        };
        let upstream = self.port_connected_node(port)?;
        Some(Edge::new(element, port, upstream))
    }

    /// All resolved upstream edges in input order
    pub fn upstream_edges(&self, element: ElementId) -> Vec<Edge> {
        (0..self.upstream_edge_count(element))
            .filter_map(|index| self.upstream_edge(element, index))
            .collect()
    }

    /// Ports anywhere in the document connected to `node`.
    ///
    /// Candidates come from the name index and are confirmed by resolving
    /// each one, so same-named nodes in other scopes never match.
    pub fn downstream_ports(&self, node: ElementId) -> Vec<ElementId> {
        let Some(name) = self.name(node) else {
            return Vec::new();
        };
        self.ports_referencing(name)
            .into_iter()
            .filter(|port| self.port_connected_node(*port) == Some(node))
            .collect()
    }

    /// Output of a multi-output upstream node this port reads from
    pub fn port_output_name(&self, port: ElementId) -> Option<&str> {
        self.attribute(port, OUTPUT_ATTRIBUTE).filter(|name| !name.is_empty())
    }

    /// Select which output of the upstream node this port reads from. An
    /// empty name clears the selection.
    pub fn set_port_output_name(&mut self, port: ElementId, output_name: &str) -> Result<(), DocumentError> {
        if output_name.is_empty() {
            self.require(port)?;
            self.remove_attribute(port, OUTPUT_ATTRIBUTE);
            Ok(())
        } else {
            self.set_attribute(port, OUTPUT_ATTRIBUTE, output_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        doc: Document,
        graph: ElementId,
        a: ElementId,
        b: ElementId,
    }

    fn fixture() -> Fixture {
        let mut doc = Document::new("doc");
        let root = doc.root();
        let graph = doc.add_child(root, ElementKind::NodeGraph, "nodegraph", "graph").unwrap();
        let a = doc.add_child(graph, ElementKind::Node, "constant", "a").unwrap();
        doc.set_value_type(a, "color3").unwrap();
        let b = doc.add_child(graph, ElementKind::Node, "multiply", "b").unwrap();
        doc.set_value_type(b, "color3").unwrap();
        Fixture { doc, graph, a, b }
    }

    #[test]
    fn test_set_connected_node_creates_input() {
        let Fixture { mut doc, a, b, .. } = fixture();
        let input = doc.set_connected_node(b, "in1", a).unwrap();
        assert_eq!(doc.value_type(input), Some("color3"));
        assert_eq!(doc.connected_node(b, "in1"), Some(a));
        assert_eq!(doc.connected_node_name(b, "in1"), Some("a"));

        let again = doc.set_connected_node(b, "in1", a).unwrap();
        assert_eq!(again, input);
        assert_eq!(doc.inputs(b).len(), 1);
    }

    #[test]
    fn test_missing_and_dangling_connections() {
        let Fixture { mut doc, b, .. } = fixture();
        assert_eq!(doc.connected_node(b, "in1"), None);
        doc.set_connected_node_name(b, "in1", "nowhere").unwrap();
        assert_eq!(doc.connected_node_name(b, "in1"), Some("nowhere"));
        assert_eq!(doc.connected_node(b, "in1"), None);
    }

    #[test]
    fn test_upstream_edges() {
        let Fixture { mut doc, a, b, .. } = fixture();
        doc.add_input(b, "in1", "color3").unwrap();
        doc.set_connected_node(b, "in2", a).unwrap();
        doc.set_connected_node_name(b, "in3", "missing").unwrap();

        assert_eq!(doc.upstream_edge_count(b), 3);
        assert!(doc.upstream_edge(b, 0).is_none());
        let edge = doc.upstream_edge(b, 1).unwrap();
        assert_eq!(edge.downstream, b);
        assert_eq!(edge.upstream, a);
        assert_eq!(Some(edge.connecting_port), doc.input(b, "in2"));
        assert!(doc.upstream_edge(b, 2).is_none());
        assert!(doc.upstream_edge(b, 7).is_none());
        assert_eq!(doc.upstream_edges(b).len(), 1);
    }

    #[test]
    fn test_graph_output_edge() {
        let Fixture { mut doc, graph, b, .. } = fixture();
        let out = doc.add_output(graph, "out", "color3").unwrap();
        doc.connect_port(out, Some(b)).unwrap();
        assert_eq!(doc.upstream_edge_count(out), 1);
        let edge = doc.upstream_edge(out, 0).unwrap();
        assert_eq!(edge, Edge::new(out, out, b));
        assert_eq!(doc.downstream_ports(b), vec![out]);
    }

    #[test]
    fn test_downstream_ports_ignore_other_scopes() {
        let Fixture { mut doc, a, b, .. } = fixture();
        let root = doc.root();
        let other = doc.add_child(root, ElementKind::NodeGraph, "nodegraph", "other").unwrap();
        let other_a = doc.add_child(other, ElementKind::Node, "constant", "a").unwrap();
        let other_b = doc.add_child(other, ElementKind::Node, "multiply", "b").unwrap();
        let foreign = doc.set_connected_node(other_b, "in1", other_a).unwrap();
        let local = doc.set_connected_node(b, "in1", a).unwrap();

        assert_eq!(doc.downstream_ports(a), vec![local]);
        assert_eq!(doc.downstream_ports(other_a), vec![foreign]);
    }

    #[test]
    fn test_resolution_walks_ancestor_scopes() {
        let mut doc = Document::new("doc");
        let root = doc.root();
        let shared = doc.add_child(root, ElementKind::Node, "constant", "shared").unwrap();
        let graph = doc.add_child(root, ElementKind::NodeGraph, "nodegraph", "graph").unwrap();
        let node = doc.add_child(graph, ElementKind::Node, "multiply", "mul").unwrap();
        doc.set_connected_node_name(node, "in1", "shared").unwrap();
        assert_eq!(doc.connected_node(node, "in1"), Some(shared));
    }

    #[test]
    fn test_disconnect() {
        let Fixture { mut doc, a, b, .. } = fixture();
        let input = doc.set_connected_node(b, "in1", a).unwrap();
        doc.connect_port(input, None).unwrap();
        assert_eq!(doc.connected_node(b, "in1"), None);
        assert!(doc.downstream_ports(a).is_empty());
    }

    #[test]
    fn test_output_selection() {
        let Fixture { mut doc, a, b, .. } = fixture();
        let input = doc.set_connected_node(b, "in1", a).unwrap();
        doc.set_port_output_name(input, "outr").unwrap();
        assert_eq!(doc.port_output_name(input), Some("outr"));
        doc.set_port_output_name(input, "").unwrap();
        assert_eq!(doc.port_output_name(input), None);
    }
}
