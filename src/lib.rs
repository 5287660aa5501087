//! topolay - deployment-topology layout pipeline
//!
//! topolay turns a technology-agnostic deployment model (components, their
//! types, and relations between them) into a positioned topology: the same
//! graph annotated with 2-D pixel coordinates and materialized as TOSCA
//! node-type and service-template documents.
//!
//! The pipeline per task: validate the graph, serialize it into a DOT
//! description, run an external deterministic layout engine (Graphviz by
//! default, injectable through [`layout::LayoutEngine`]), normalize the
//! engine's inch coordinates into pixel space, and emit the documents.

pub mod cli;
pub mod config;
pub mod dot;
pub mod error;
pub mod fs;
pub mod ingest;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod tosca;

// Re-exports for convenience
pub use config::{FlattenMode, LayoutConfig};
pub use dot::build_dot;
pub use error::{TopolayError, TopolayResult};
pub use ingest::{load_model, parse_model};
pub use layout::{compute_layout, GraphvizEngine, LayoutEngine, Point};
pub use model::{
    Component, ComponentType, Confidence, DeploymentGraph, Property, PropertyKind, PropertyValue,
    Relation, RelationClass, RelationType,
};
pub use pipeline::{LayoutOutcome, Pipeline};
pub use tosca::{emit_documents, OutputFile};
