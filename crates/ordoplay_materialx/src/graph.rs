// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graphs: construction, subgraph flattening and topological ordering.

use crate::definition::Implementation;
use crate::document::{Document, DocumentError};
use crate::element::{ElementId, ElementKind};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

impl Document {
    /// Add a node graph to the document root
    pub fn add_node_graph(&mut self, name: &str) -> Result<ElementId, DocumentError> {
        let root = self.root();
        self.add_child(root, ElementKind::NodeGraph, ElementKind::NodeGraph.tag(), name)
    }

    /// Add a node of `category` producing `node_type` to a graph
    pub fn add_node(
        &mut self,
        graph: ElementId,
        category: &str,
        name: &str,
        node_type: &str,
    ) -> Result<ElementId, DocumentError> {
        let node = self.add_child(graph, ElementKind::Node, category, name)?;
        if !node_type.is_empty() {
            self.set_value_type(node, node_type)?;
        }
        Ok(node)
    }

    /// Nodes of a graph in document order
    pub fn nodes(&self, graph: ElementId) -> Vec<ElementId> {
        self.children_of_kind(graph, ElementKind::Node)
    }

    /// Get a node by name
    pub fn node(&self, graph: ElementId, name: &str) -> Option<ElementId> {
        self.child_of_kind(graph, name, ElementKind::Node)
    }

    /// Remove a node by name. Connections naming it are left dangling.
    pub fn remove_node(&mut self, graph: ElementId, name: &str) -> bool {
        self.node(graph, name)
            .and_then(|node| self.remove_element(node))
            .is_some()
    }

    fn require_graph(&self, graph: ElementId) -> Result<(), GraphError> {
        match self.require(graph)?.kind() {
            ElementKind::NodeGraph | ElementKind::Document => Ok(()),
            _ => Err(GraphError::NotAGraph(graph)),
        }
    }

    fn has_graph_implementation(&self, node: ElementId, target: &str) -> bool {
        matches!(self.implementation(node, target), Some(Implementation::Graph(_)))
    }

    /// Inline every node whose implementation for `target` is a node graph,
    /// layer by layer, until none remain. Returns the number of reference
    /// nodes replaced.
    ///
    /// Nodes without a graph implementation are left untouched. Each inlined
    /// node takes the place of its reference node in sibling order, receives
    /// the reference node's bound values and connections, and ports that read
    /// from the reference node are redirected to the inlined node feeding the
    /// subgraph output.
    pub fn flatten_subgraphs(&mut self, graph: ElementId, target: &str) -> Result<usize, GraphError> {
        self.require_graph(graph)?;
        let separator = self.config().name_separator.clone();
        let max_expansions = self.config().max_expansions;

        let mut queue: VecDeque<ElementId> = self.nodes(graph).into();
        let mut expanded = 0;

        while let Some(ref_node) = queue.pop_front() {
            let Some(Implementation::Graph(sub_graph)) = self.implementation(ref_node, target) else {
                continue;
            };
            if expanded >= max_expansions {
                warn!(
                    "Stopped flattening '{}' after {} expansions, {} nodes left unexpanded",
                    self.name(graph).unwrap_or_default(),
                    expanded,
                    queue.len() + 1,
                );
                break;
            }

            let ref_name = self.name(ref_node).unwrap_or_default().to_string();
            let impl_name = self.name(sub_graph).unwrap_or_default().to_string();
            let ref_downstream = self.downstream_ports(ref_node);
            let mut sub_node_map: Vec<(ElementId, ElementId)> = Vec::new();

            for orig_sub_node in self.nodes(sub_graph) {
                let orig = self.require(orig_sub_node)?;
                let category = orig.category().to_string();
                let base = format!("{impl_name}{separator}{}", orig.name());
                let new_name = self.create_valid_child_name(graph, &base);

                let new_sub_node = self.add_child(graph, ElementKind::Node, &category, &new_name)?;
                self.copy_content_from(new_sub_node, orig_sub_node)?;
                if let Some(index) = self.child_index(graph, ref_node) {
                    self.set_child_index(graph, new_sub_node, index)?;
                }
                self.bind_interface(new_sub_node, ref_node)?;

                sub_node_map.push((orig_sub_node, new_sub_node));
                if self.has_graph_implementation(new_sub_node, target) {
                    queue.push_back(new_sub_node);
                }
            }

            for &(orig_sub_node, new_sub_node) in &sub_node_map {
                for port in self.downstream_ports(orig_sub_node) {
                    let Some(owner) = self.parent(port) else {
                        continue;
                    };
                    match self.kind(port) {
                        Some(ElementKind::Input) => {
                            let mapped = sub_node_map
                                .iter()
                                .find(|(orig, _)| *orig == owner)
                                .map(|(_, new)| *new);
                            if let (Some(mapped), Some(port_name)) = (mapped, self.name(port)) {
                                let port_name = port_name.to_string();
                                self.set_connected_node(mapped, &port_name, new_sub_node)?;
                            }
                        }
                        Some(ElementKind::Output) if owner == sub_graph => {
                            self.redirect_outputs(ref_node, &ref_downstream, port, new_sub_node)?;
                        }
                        _ => {}
                    }
                }
            }

            self.remove_element(ref_node);
            expanded += 1;
            debug!(
                "Inlined '{}' into '{}' as {} nodes from '{}'",
                ref_name,
                self.name(graph).unwrap_or_default(),
                sub_node_map.len(),
                impl_name,
            );
        }

        Ok(expanded)
    }

    /// Copy values and connections bound through interface names from the
    /// reference node onto a freshly inlined node, then drop the bindings.
    fn bind_interface(&mut self, new_sub_node: ElementId, ref_node: ElementId) -> Result<(), DocumentError> {
        for new_value in self.value_elements(new_sub_node) {
            let Some(interface) = self.interface_name(new_value).map(str::to_string) else {
                continue;
            };
            if let Some(ref_value) = self.value_element(ref_node, &interface) {
                if let Some(value) = self.value(ref_value).map(str::to_string) {
                    self.set_value(new_value, &value)?;
                }
                let both_inputs = self.kind(new_value) == Some(ElementKind::Input)
                    && self.kind(ref_value) == Some(ElementKind::Input);
                if both_inputs {
                    if let Some(node_name) = self.port_node_name(ref_value).map(str::to_string) {
                        let output_name = self.port_output_name(ref_value).unwrap_or_default().to_string();
                        self.set_port_node_name(new_value, &node_name)?;
                        self.set_port_output_name(new_value, &output_name)?;
                    }
                }
            }
            self.clear_interface_name(new_value)?;
        }
        Ok(())
    }

    /// Point ports that still read from the reference node at the inlined
    /// node feeding `boundary_output`. Ports selecting a different output of
    /// the reference node by name are left alone.
    fn redirect_outputs(
        &mut self,
        ref_node: ElementId,
        ref_downstream: &[ElementId],
        boundary_output: ElementId,
        new_sub_node: ElementId,
    ) -> Result<(), DocumentError> {
        let output_name = self.name(boundary_output).unwrap_or_default().to_string();
        let inner_output = self.port_output_name(boundary_output).unwrap_or_default().to_string();
        for &outer_port in ref_downstream {
            if self.port_connected_node(outer_port) != Some(ref_node) {
                continue;
            }
            if self
                .port_output_name(outer_port)
                .is_some_and(|selected| selected != output_name)
            {
                continue;
            }
            self.connect_port(outer_port, Some(new_sub_node))?;
            self.set_port_output_name(outer_port, &inner_output)?;
        }
        Ok(())
    }

    /// Order the children of a graph so that every element follows its
    /// upstream dependencies, using Kahn's algorithm.
    ///
    /// Only dependencies between children of `graph` are considered: a
    /// connection that resolves to a node in an enclosing scope does not count
    /// toward in-degree. Counting it would report a cycle for any graph that
    /// reads from an outer node, since nothing inside the graph can release
    /// that edge. Ties are broken by document order. Fails without a partial
    /// result if the children contain a cycle.
    pub fn topological_sort(&self, graph: ElementId) -> Result<Vec<ElementId>, GraphError> {
        self.require_graph(graph)?;
        let children = self.children(graph);
        let position: HashMap<ElementId, usize> =
            children.iter().enumerate().map(|(i, child)| (*child, i)).collect();

        let mut in_degree: HashMap<ElementId, usize> = HashMap::with_capacity(children.len());
        let mut queue = VecDeque::new();
        for &child in children {
            let count = self
                .upstream_edges(child)
                .iter()
                .filter(|edge| position.contains_key(&edge.upstream))
                .count();
            in_degree.insert(child, count);
            if count == 0 {
                queue.push_back(child);
            }
        }

        let mut result = Vec::with_capacity(children.len());
        while let Some(child) = queue.pop_front() {
            result.push(child);
            if !self.kind(child).is_some_and(|k| k.is_node_like()) {
                continue;
            }

            let mut ready = Vec::new();
            for port in self.downstream_ports(child) {
                let downstream = match self.kind(port) {
                    Some(ElementKind::Output) => port,
                    _ => match self.parent(port) {
                        Some(owner) => owner,
                        None => continue,
                    },
                };
                if let Some(degree) = in_degree.get_mut(&downstream) {
                    if *degree > 0 {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.push(downstream);
                        }
                    }
                }
            }
            ready.sort_by_key(|id| position.get(id).copied().unwrap_or(usize::MAX));
            queue.extend(ready);
        }

        if result.len() != children.len() {
            return Err(GraphError::FoundCycle {
                graph: self.name(graph).unwrap_or_default().to_string(),
            });
        }
        Ok(result)
    }
}

/// Error raised by graph operations
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Graph contains a cycle
    #[error("Encountered a cycle in graph: {graph}")]
    FoundCycle {
        /// Name of the graph
        graph: String,
    },

    /// Element is not a node graph
    #[error("Element is not a node graph: {0:?}")]
    NotAGraph(ElementId),

    /// Tree mutation failed
    #[error(transparent)]
    Document(#[from] DocumentError),
}
