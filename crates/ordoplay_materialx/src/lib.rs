// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material node graph document model for `OrdoPlay`.
//!
//! This crate describes procedural shading networks as typed, named, nested
//! graphs of nodes:
//! - Nodes with typed, named ports connected by upstream node name
//! - Node graphs usable as reusable subgraphs or as node implementations
//! - Node definitions and per-target implementations
//!
//! ## Architecture
//!
//! A [`Document`] owns every element in an arena. Parents own children;
//! parent links and connections are lookups, resolved on each query.
//! On top of that model the crate provides:
//! - Connection and definition resolution
//! - Subgraph flattening for a target
//! - Topological ordering with cycle detection
//! - Soft validation

pub mod config;
pub mod connection;
pub mod definition;
pub mod document;
pub mod element;
pub mod graph;
pub mod port;
pub mod stdlib;
pub mod validate;

pub use config::GraphConfig;
pub use connection::Edge;
pub use definition::Implementation;
pub use document::{Document, DocumentError};
pub use element::{Element, ElementId, ElementKind};
pub use graph::GraphError;
pub use validate::{ValidationIssue, ValidationReport};
