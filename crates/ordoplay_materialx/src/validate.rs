// SPDX-License-Identifier: MIT OR Apache-2.0
//! Soft validation and dangling reference detection.

use crate::document::Document;
use crate::element::{ElementId, ElementKind, NODE_DEF_ATTRIBUTE};

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Element the finding is about
    pub element: ElementId,
    /// Human readable description
    pub message: String,
}

/// Accumulated validation findings
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// True if nothing was reported
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// All findings in document order
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Findings about one element
    pub fn issues_for(&self, element: ElementId) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.element == element)
    }

    fn require(&mut self, condition: bool, element: ElementId, message: impl Into<String>) {
        if !condition {
            self.issues.push(ValidationIssue {
                element,
                message: message.into(),
            });
        }
    }
}

impl Document {
    /// Validate an element and its descendants, collecting every finding
    pub fn validate(&self, element: ElementId) -> ValidationReport {
        let mut report = ValidationReport::default();
        for id in self.descendants(element) {
            let Some(kind) = self.kind(id) else {
                continue;
            };
            match kind {
                ElementKind::Node | ElementKind::NodeDef => {
                    report.require(self.value_type(id).is_some(), id, "Missing type");
                }
                ElementKind::Input | ElementKind::Output | ElementKind::Parameter => {
                    report.require(self.value_type(id).is_some(), id, "Missing type");
                    if let Some(node_name) = self.port_node_name(id) {
                        report.require(
                            self.port_connected_node(id).is_some(),
                            id,
                            format!("Unresolved connection to '{node_name}'"),
                        );
                    }
                }
                ElementKind::Implementation => {
                    let def = self.attribute(id, NODE_DEF_ATTRIBUTE);
                    report.require(def.is_some(), id, "Missing node definition");
                }
                ElementKind::Document | ElementKind::NodeGraph => {}
            }
        }
        report
    }

    /// Ports whose stored connection no longer resolves, in document order
    pub fn find_dangling_connections(&self) -> Vec<ElementId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.port_node_name(*id).is_some() && self.port_connected_node(*id).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_graph() {
        let mut doc = Document::new("doc");
        let graph = doc.add_node_graph("G").unwrap();
        let a = doc.add_node(graph, "constant", "a", "float").unwrap();
        let b = doc.add_node(graph, "add", "b", "float").unwrap();
        doc.set_connected_node(b, "in1", a).unwrap();
        let report = doc.validate(doc.root());
        assert!(report.is_valid());
        assert!(doc.find_dangling_connections().is_empty());
    }

    #[test]
    fn test_missing_type_is_reported() {
        let mut doc = Document::new("doc");
        let graph = doc.add_node_graph("G").unwrap();
        let node = doc.add_node(graph, "add", "untyped", "").unwrap();
        doc.add_input(node, "in1", "").unwrap();
        let report = doc.validate(graph);
        assert!(!report.is_valid());
        assert_eq!(report.issues().len(), 2);
        assert_eq!(report.issues_for(node).count(), 1);
        assert_eq!(report.issues()[0].message, "Missing type");
    }

    #[test]
    fn test_removal_leaves_dangling_connection() {
        let mut doc = Document::new("doc");
        let graph = doc.add_node_graph("G").unwrap();
        let a = doc.add_node(graph, "constant", "a", "float").unwrap();
        let b = doc.add_node(graph, "add", "b", "float").unwrap();
        let input = doc.set_connected_node(b, "in1", a).unwrap();

        assert!(doc.remove_node(graph, "a"));
        assert_eq!(doc.connected_node_name(b, "in1"), Some("a"));
        assert_eq!(doc.connected_node(b, "in1"), None);
        assert_eq!(doc.find_dangling_connections(), vec![input]);

        let report = doc.validate(doc.root());
        let issue = report.issues_for(input).next().unwrap();
        assert_eq!(issue.message, "Unresolved connection to 'a'");

        // A new node with the old name silently repairs the reference
        let replacement = doc.add_node(graph, "constant", "a", "float").unwrap();
        assert_eq!(doc.connected_node(b, "in1"), Some(replacement));
        assert!(doc.find_dangling_connections().is_empty());
    }

    #[test]
    fn test_implementation_without_definition() {
        let mut doc = Document::new("doc");
        let implementation = doc.add_implementation("IM_orphan", "", "glsl").unwrap();
        doc.remove_attribute(implementation, NODE_DEF_ATTRIBUTE);
        let report = doc.validate(doc.root());
        assert_eq!(report.issues_for(implementation).count(), 1);
    }
}
