//! TOSCA template emitter
//!
//! Combines the deployment graph with the normalized coordinate map into the
//! output documents: one node-type document per component type and one
//! service template per task. Rendering is pure — documents come back as
//! in-memory `OutputFile` values and the pipeline decides when to commit
//! them to disk.
//!
//! The emitted key names and document structure are a compatibility surface
//! for the downstream TOSCA toolchain and must not drift.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{TopolayError, TopolayResult};
use crate::layout::Point;
use crate::model::{ComponentType, DeploymentGraph, Property, RelationClass};

const TOSCA_VERSION: &str = "tosca_simple_yaml_1_3";
const NODE_TYPE_NAMESPACE: &str = "ust.tad.nodetypes";
const SERVICE_TEMPLATE_NAMESPACE: &str = "ust.tad.servicetemplates";
/// Fallback for components and relations without a resolvable type
const FALLBACK_TYPE: &str = "Root";

/// Fixed lifecycle operations declared on every node type; descriptive
/// placeholders, not executable code.
const LIFECYCLE_OPERATIONS: [&str; 5] = ["stop", "start", "create", "configure", "delete"];

/// A rendered document ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    path: PathBuf,
    content: String,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Path relative to the task output root
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// One node-template entry, assembled before rendering
struct NodeTemplate<'a> {
    /// Deduplicated `<TypeName>_<count>` name, unique in the document
    instance_name: String,
    /// Original component name; stable key for all cross-references
    display_name: &'a str,
    /// Fully-qualified emitted type
    tosca_type: String,
    position: Point,
    properties: &'a [Property],
}

/// Render all output documents for one task.
///
/// Fails with `MissingReference` if any requirement points at a component
/// absent from the node map or if a node has no coordinates; in that case no
/// document is returned at all.
pub fn emit_documents(
    graph: &DeploymentGraph,
    layout: &HashMap<String, Point>,
) -> TopolayResult<Vec<OutputFile>> {
    let mut outputs = Vec::new();
    for ty in &graph.component_types {
        outputs.push(node_type_document(graph, ty));
    }
    outputs.push(service_template_document(graph, layout)?);
    Ok(outputs)
}

/// Node-type document for one component type.
///
/// Lists the type's own property schema only; inherited properties are not
/// merged in, matching what the downstream toolchain expects.
fn node_type_document(graph: &DeploymentGraph, ty: &ComponentType) -> OutputFile {
    let pid = graph.process_id;
    let mut doc = String::new();

    let _ = writeln!(doc, "tosca_definitions_version: {TOSCA_VERSION}");
    doc.push('\n');
    doc.push_str("node_types:\n");
    let _ = writeln!(doc, "  {pid}.{NODE_TYPE_NAMESPACE}.{}:", ty.name);
    doc.push_str("    derived_from: tosca.nodes.Root\n");
    doc.push_str("    metadata:\n");
    let _ = writeln!(doc, "      targetNamespace: {pid}.{NODE_TYPE_NAMESPACE}");
    doc.push_str("      abstract: \"false\"\n");
    doc.push_str("      final: \"false\"\n");
    doc.push_str("    properties:\n");
    for property in &ty.properties {
        let _ = writeln!(doc, "      {}:", map_key(&property.key));
        let _ = writeln!(doc, "        type: {}", property.kind);
        let _ = writeln!(doc, "        required: {}", property.required);
        let _ = writeln!(doc, "        default: {}", property.value);
    }
    doc.push_str("    requirements:\n");
    doc.push_str("      - host:\n");
    doc.push_str("          capability: tosca.capabilities.Node\n");
    doc.push_str("          relationship: tosca.relationships.HostedOn\n");
    doc.push_str("          occurrences: [ 1, 1 ]\n");
    doc.push_str("    interfaces:\n");
    doc.push_str("      Standard:\n");
    doc.push_str("        type: tosca.interfaces.node.lifecycle.Standard\n");
    doc.push_str("        operations:\n");
    for operation in LIFECYCLE_OPERATIONS {
        let _ = writeln!(doc, "          {operation}:");
        let _ = writeln!(doc, "            description: The standard {operation} operation");
    }

    let path = PathBuf::from("nodetypes")
        .join(format!("{pid}.{NODE_TYPE_NAMESPACE}"))
        .join(&ty.name)
        .join("NodeType.tosca");
    OutputFile::new(path, doc)
}

/// The topology document: one node-template entry per component, plus one
/// relationship-template block per relation.
fn service_template_document(
    graph: &DeploymentGraph,
    layout: &HashMap<String, Point>,
) -> TopolayResult<OutputFile> {
    let pid = graph.process_id;

    // First pass: assemble node entries in component encounter order and
    // assign the deduplicated instance names.
    let mut nodes: Vec<NodeTemplate<'_>> = Vec::new();
    let mut type_counts: HashMap<String, usize> = HashMap::new();
    for component in &graph.components {
        let (bucket, tosca_type) = match component
            .type_name
            .as_deref()
            .and_then(|name| graph.component_type(name))
        {
            Some(ty) => (
                ty.name.clone(),
                format!("{pid}.{NODE_TYPE_NAMESPACE}.{}", ty.name),
            ),
            None => {
                warn!(
                    component = %component.name,
                    "component type is not defined, falling back to tosca.nodes.Root"
                );
                (FALLBACK_TYPE.to_string(), "tosca.nodes.Root".to_string())
            }
        };

        let count = type_counts.entry(bucket.clone()).or_insert(0);
        let instance_name = format!("{bucket}_{count}");
        *count += 1;

        let position = *layout.get(&component.name).ok_or_else(|| {
            TopolayError::MissingReference(format!(
                "no coordinates for node '{}'",
                component.name
            ))
        })?;

        nodes.push(NodeTemplate {
            instance_name,
            display_name: &component.name,
            tosca_type,
            position,
            properties: &component.properties,
        });
    }

    let instance_by_display: HashMap<&str, &str> = nodes
        .iter()
        .map(|n| (n.display_name, n.instance_name.as_str()))
        .collect();

    // Second pass: render, wiring requirements against instance names while
    // matching relations by displayName only.
    let mut doc = String::new();
    let _ = writeln!(doc, "tosca_definitions_version: {TOSCA_VERSION}");
    doc.push('\n');
    doc.push_str("metadata:\n");
    let _ = writeln!(doc, "  targetNamespace: \"{SERVICE_TEMPLATE_NAMESPACE}\"");
    let _ = writeln!(doc, "  name: {pid}");
    doc.push_str("topology_template:\n");
    doc.push_str("  node_templates:\n");
    for node in &nodes {
        let _ = writeln!(doc, "    {}:", node.instance_name);
        let _ = writeln!(doc, "      type: {}", node.tosca_type);
        doc.push_str("      metadata:\n");
        let _ = writeln!(doc, "        x: '{}'", node.position.x);
        let _ = writeln!(doc, "        y: '{}'", node.position.y);
        let _ = writeln!(doc, "        displayName: {}", node.display_name);
        doc.push_str("      properties:\n");
        for property in node.properties {
            let _ = writeln!(doc, "        {}: {}", map_key(&property.key), property.value);
        }

        let mut requirements = String::new();
        for relation in &graph.relations {
            if relation.source != node.display_name {
                continue;
            }
            let key = match relation.class() {
                RelationClass::Containment => "host",
                RelationClass::Adjacency => "connect",
                RelationClass::Other => {
                    warn!(
                        relation = %relation.name,
                        "relation has no layout class, no requirement emitted"
                    );
                    continue;
                }
            };
            let target_instance =
                instance_by_display.get(relation.target.as_str()).ok_or_else(|| {
                    TopolayError::MissingReference(format!(
                        "requirement of '{}' targets unknown node '{}'",
                        node.display_name, relation.target
                    ))
                })?;
            let _ = writeln!(requirements, "        - {key}:");
            let _ = writeln!(requirements, "            node: {target_instance}");
            let _ = writeln!(requirements, "            relationship: {}", relation.name);
            requirements.push_str("            capability: feature\n");
        }
        if !requirements.is_empty() {
            doc.push_str("      requirements:\n");
            doc.push_str(&requirements);
        }
    }

    doc.push_str("  relationship_templates:\n");
    for relation in &graph.relations {
        let type_name = match relation
            .type_name
            .as_deref()
            .and_then(|name| graph.relation_type(name))
        {
            Some(ty) => ty.name.as_str(),
            None => {
                warn!(
                    relation = %relation.name,
                    "relation type is not defined, falling back to tosca.relationships.Root"
                );
                FALLBACK_TYPE
            }
        };
        let _ = writeln!(doc, "    {}:", relation.name);
        let _ = writeln!(doc, "      type: tosca.relationships.{type_name}");
    }

    let path = PathBuf::from("servicetemplates")
        .join(SERVICE_TEMPLATE_NAMESPACE)
        .join(pid.to_string())
        .join("ServiceTemplate.tosca");
    Ok(OutputFile::new(path, doc))
}

/// Quote keys that would otherwise parse as numeric literals, so they stay
/// valid map keys in the output grammar.
fn map_key(key: &str) -> String {
    if key.parse::<f64>().is_ok() {
        format!("\"{key}\"")
    } else {
        key.to_string()
    }
}
