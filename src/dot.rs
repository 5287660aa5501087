//! Graph description builder
//!
//! Serializes a validated `DeploymentGraph` into the DOT text consumed by the
//! layout engine. Construction is a pure function of (graph, config): the same
//! input always produces the same bytes, which keeps the output golden-testable.
//!
//! Containment relations (`HostedOn`) become solid edges in the main digraph
//! and drive the vertical hierarchy; adjacency relations (`ConnectsTo`) become
//! dashed edges in a subgraph overlay. Relations of any other class carry no
//! layout semantics and are dropped from the description with a warning.

use std::fmt::Write as _;

use tracing::warn;

use crate::config::{FlattenMode, LayoutConfig};
use crate::model::{DeploymentGraph, RelationClass};

/// Extra layout weight applied to merged fan-out edges so the engine favors
/// co-locating siblings of one source.
const FAN_OUT_WEIGHT: u32 = 2;

/// Edges grouped by source, in encounter order
#[derive(Default)]
struct EdgeSet {
    edges: Vec<(String, Vec<String>)>,
}

impl EdgeSet {
    fn add(&mut self, source: &str, target: &str) {
        if let Some((_, targets)) = self.edges.iter_mut().find(|(s, _)| s == source) {
            targets.push(target.to_string());
        } else {
            self.edges.push((source.to_string(), vec![target.to_string()]));
        }
    }
}

/// Build the layout-engine input description.
///
/// Assumes `graph.validate()` has already passed; endpoints are not re-checked.
pub fn build_dot(graph: &DeploymentGraph, config: &LayoutConfig) -> String {
    let mut containment = EdgeSet::default();
    let mut adjacency = EdgeSet::default();
    let mut rank_same: Vec<&str> = Vec::new();

    for relation in &graph.relations {
        match relation.class() {
            RelationClass::Containment => containment.add(&relation.source, &relation.target),
            RelationClass::Adjacency => {
                adjacency.add(&relation.source, &relation.target);
                if !rank_same.contains(&relation.source.as_str()) {
                    rank_same.push(&relation.source);
                }
            }
            RelationClass::Other => {
                warn!(
                    relation = %relation.name,
                    relation_type = relation.type_name.as_deref().unwrap_or("<none>"),
                    "relation has no layout class, dropped from graph description"
                );
            }
        }
    }

    let (graph_w, graph_h) = config.graph_size_in();
    let (node_w, node_h) = config.node_size_in();

    let mut dot = String::new();
    dot.push_str("strict digraph {\n");
    if config.flatten == FlattenMode::Full {
        let _ = writeln!(
            dot,
            "    graph [dpi={}, rank=\"same\", ratio=\"compress\", size=\"{:.3},{:.3}\", splines=\"ortho\"]",
            config.dpi, graph_w, graph_h
        );
    } else {
        let _ = writeln!(
            dot,
            "    graph [dpi={}, ratio=\"compress\", size=\"{:.3},{:.3}\", splines=\"ortho\"]",
            config.dpi, graph_w, graph_h
        );
    }
    let _ = writeln!(
        dot,
        "    node [fixedsize=\"true\", shape=\"polygon\", width={node_w:.3}, height={node_h:.3}]"
    );
    dot.push_str("    edge [label=\"HostedOn\", style=\"solid\"]\n");

    for component in &graph.components {
        let _ = writeln!(dot, "    {}", quote(&component.name));
    }

    write_edges(&mut dot, &containment, "    ");

    dot.push_str("    subgraph {\n");
    dot.push_str("        edge [label=\"ConnectsTo\", style=\"dashed\"]\n");
    if config.flatten == FlattenMode::Partial {
        dot.push_str("        { rank=\"same\"");
        for node in &rank_same {
            let _ = write!(dot, " {}", quote(node));
        }
        dot.push_str(" }\n");
    }
    write_edges(&mut dot, &adjacency, "        ");
    dot.push_str("    }\n}");

    dot
}

fn write_edges(dot: &mut String, edges: &EdgeSet, indent: &str) {
    for (source, targets) in &edges.edges {
        if targets.len() > 1 {
            let _ = write!(dot, "{indent}{} -> {{ ", quote(source));
            for target in targets {
                let _ = write!(dot, "{} ", quote(target));
            }
            let _ = writeln!(dot, "}} [weight={FAN_OUT_WEIGHT}]");
        } else {
            let _ = writeln!(dot, "{indent}{} -> {}", quote(source), quote(&targets[0]));
        }
    }
}

/// Quote an identifier for the DOT grammar, escaping embedded quotes and
/// backslashes. Identifiers are always quoted; component names may contain
/// anything the ingestion side produced.
fn quote(id: &str) -> String {
    format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, ComponentType, Relation, RelationType};
    use uuid::Uuid;

    fn graph_with(
        components: &[&str],
        relations: &[(&str, &str, &str, &str)],
    ) -> DeploymentGraph {
        let mut graph = DeploymentGraph::new(Uuid::nil());
        graph.component_types.push(ComponentType::new("Root"));
        graph.relation_types.push(RelationType::new("HostedOn"));
        graph.relation_types.push(RelationType::new("ConnectsTo"));
        graph.relation_types.push(RelationType::new("DependsOn"));
        for name in components {
            graph.components.push(Component::typed(*name, "Root"));
        }
        for (name, ty, source, target) in relations {
            graph.relations.push(Relation::new(*name, *ty, *source, *target));
        }
        graph
    }

    #[test]
    fn test_every_component_becomes_one_node() {
        let graph = graph_with(&["web", "db", "cache"], &[]);
        let dot = build_dot(&graph, &LayoutConfig::default());
        for name in ["web", "db", "cache"] {
            let node = format!("    \"{name}\"\n");
            assert_eq!(dot.matches(&node).count(), 1);
        }
    }

    #[test]
    fn test_containment_edge_in_main_graph() {
        let graph = graph_with(&["web", "db"], &[("r1", "HostedOn", "web", "db")]);
        let dot = build_dot(&graph, &LayoutConfig::default());
        assert!(dot.contains("    \"web\" -> \"db\"\n"));
        // Nothing in the adjacency subgraph
        let subgraph = dot.split("subgraph {").nth(1).unwrap();
        assert!(!subgraph.contains("->"));
    }

    #[test]
    fn test_adjacency_edge_in_subgraph() {
        let graph = graph_with(&["a", "b"], &[("r1", "ConnectsTo", "a", "b")]);
        let dot = build_dot(&graph, &LayoutConfig::default());
        let subgraph = dot.split("subgraph {").nth(1).unwrap();
        assert!(subgraph.contains("        \"a\" -> \"b\"\n"));
    }

    #[test]
    fn test_fan_out_edges_merge_with_weight() {
        let graph = graph_with(
            &["web", "db", "cache"],
            &[
                ("r1", "HostedOn", "web", "db"),
                ("r2", "HostedOn", "web", "cache"),
            ],
        );
        let dot = build_dot(&graph, &LayoutConfig::default());
        assert!(dot.contains("    \"web\" -> { \"db\" \"cache\" } [weight=2]\n"));
        assert!(!dot.contains("\"web\" -> \"db\"\n"));
    }

    #[test]
    fn test_unclassified_relation_dropped() {
        let graph = graph_with(&["a", "b"], &[("r1", "DependsOn", "a", "b")]);
        let dot = build_dot(&graph, &LayoutConfig::default());
        assert!(!dot.contains("->"));
    }

    #[test]
    fn test_flatten_full_sets_graph_rank() {
        let graph = graph_with(&["a", "b"], &[]);
        let config = LayoutConfig {
            flatten: FlattenMode::Full,
            ..Default::default()
        };
        let dot = build_dot(&graph, &config);
        assert!(dot.contains("graph [dpi=72, rank=\"same\","));
    }

    #[test]
    fn test_flatten_partial_groups_adjacency_sources() {
        let graph = graph_with(
            &["a", "b", "c"],
            &[
                ("r1", "ConnectsTo", "a", "b"),
                ("r2", "ConnectsTo", "c", "a"),
            ],
        );
        let config = LayoutConfig {
            flatten: FlattenMode::Partial,
            ..Default::default()
        };
        let dot = build_dot(&graph, &config);
        assert!(dot.contains("        { rank=\"same\" \"a\" \"c\" }\n"));
    }

    #[test]
    fn test_flatten_none_has_no_rank_group() {
        let graph = graph_with(&["a", "b"], &[("r1", "ConnectsTo", "a", "b")]);
        let dot = build_dot(&graph, &LayoutConfig::default());
        assert!(!dot.contains("rank=\"same\""));
    }

    #[test]
    fn test_special_identifiers_are_escaped() {
        let graph = graph_with(&["my \"app\"", "db-1"], &[]);
        let dot = build_dot(&graph, &LayoutConfig::default());
        assert!(dot.contains("    \"my \\\"app\\\"\"\n"));
        assert!(dot.contains("    \"db-1\"\n"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let graph = graph_with(
            &["web", "db", "cache"],
            &[
                ("r1", "HostedOn", "web", "db"),
                ("r2", "ConnectsTo", "web", "cache"),
            ],
        );
        let config = LayoutConfig::default();
        assert_eq!(build_dot(&graph, &config), build_dot(&graph, &config));
    }

    #[test]
    fn test_node_geometry_from_config() {
        let graph = graph_with(&["a"], &[]);
        let config = LayoutConfig {
            dpi: 72.0,
            ..Default::default()
        };
        let dot = build_dot(&graph, &config);
        // 225px / 72dpi and 60px / 72dpi
        assert!(dot.contains("width=3.125, height=0.833"));
    }
}
