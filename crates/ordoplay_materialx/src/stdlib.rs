// SPDX-License-Identifier: MIT OR Apache-2.0
//! Standard shading node definitions.
//!
//! Registers a small set of common node definitions for a value type so
//! documents can resolve `constant`, `add`, `multiply`, `mix` and `image`
//! nodes without loading a library from disk.

use crate::document::{Document, DocumentError};
use crate::element::ElementId;

/// Declared port of a standard node
struct PortDecl {
    name: &'static str,
    /// `None` uses the node's own type
    port_type: Option<&'static str>,
    default: Option<&'static str>,
    uniform: bool,
}

impl PortDecl {
    const fn input(name: &'static str) -> Self {
        Self {
            name,
            port_type: None,
            default: None,
            uniform: false,
        }
    }

    const fn typed(name: &'static str, port_type: &'static str) -> Self {
        Self {
            name,
            port_type: Some(port_type),
            default: None,
            uniform: false,
        }
    }

    const fn with_default(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    const fn uniform(mut self) -> Self {
        self.uniform = true;
        self
    }
}

/// Standard node signature
struct NodeDecl {
    category: &'static str,
    ports: &'static [PortDecl],
}

const STANDARD_NODES: &[NodeDecl] = &[
    // ========================================================================
    // Sources
    // ========================================================================
    NodeDecl {
        category: "constant",
        ports: &[PortDecl::input("value")],
    },
    NodeDecl {
        category: "image",
        ports: &[
            PortDecl::typed("file", "filename").uniform(),
            PortDecl::typed("texcoord", "vector2"),
            PortDecl::input("default"),
        ],
    },
    // ========================================================================
    // Math
    // ========================================================================
    NodeDecl {
        category: "add",
        ports: &[PortDecl::input("in1"), PortDecl::input("in2")],
    },
    NodeDecl {
        category: "multiply",
        ports: &[PortDecl::input("in1"), PortDecl::input("in2")],
    },
    // ========================================================================
    // Compositing
    // ========================================================================
    NodeDecl {
        category: "mix",
        ports: &[
            PortDecl::input("fg"),
            PortDecl::input("bg"),
            PortDecl::typed("mix", "float").with_default("0.5"),
        ],
    },
];

/// Name of the standard definition of `category` for `value_type`
pub fn standard_node_def_name(category: &str, value_type: &str) -> String {
    format!("ND_{category}_{value_type}")
}

/// Register the standard node definitions for `value_type`.
///
/// Definitions already present under the same name are skipped, so calling
/// this twice for a type is harmless.
pub fn register_standard_node_defs(doc: &mut Document, value_type: &str) -> Result<Vec<ElementId>, DocumentError> {
    let mut registered = Vec::new();
    for decl in STANDARD_NODES {
        let name = standard_node_def_name(decl.category, value_type);
        if doc.child(doc.root(), &name).is_some() {
            continue;
        }
        let def = doc.add_node_def(&name, decl.category, value_type)?;
        for port in decl.ports {
            let port_type = port.port_type.unwrap_or(value_type);
            let id = if port.uniform {
                doc.add_parameter(def, port.name, port_type)?
            } else {
                doc.add_input(def, port.name, port_type)?
            };
            if let Some(value) = port.default {
                doc.set_value(id, value)?;
            }
        }
        doc.add_output(def, "out", value_type)?;
        registered.push(def);
    }
    Ok(registered)
}
