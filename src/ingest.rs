//! Deployment-model ingestion
//!
//! Reads an already-resolved technology-agnostic deployment model from YAML.
//! Dialect-specific parsing of deployment technologies happens upstream; the
//! only contract here is "produce a populated `DeploymentGraph`".
//!
//! Properties declared with a `type` block come in as `Confirmed`; bare
//! string scalars run through type inference and are recorded `Suspected`
//! (see `PropertyValue::infer`).

use std::path::Path;

use crate::error::{TopolayError, TopolayResult};
use crate::model::DeploymentGraph;

/// Load a deployment model from a YAML file.
pub fn load_model(path: &Path) -> TopolayResult<DeploymentGraph> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TopolayError::ModelNotFound {
                path: path.to_path_buf(),
            }
        } else {
            TopolayError::Io(e)
        }
    })?;
    parse_model(&content)
}

/// Parse a deployment model from YAML text.
pub fn parse_model(content: &str) -> TopolayResult<DeploymentGraph> {
    let graph: DeploymentGraph = serde_yaml_ng::from_str(content)?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Confidence, PropertyKind, PropertyValue};

    const MODEL: &str = r#"
processId: 2b5f2a80-8a50-4e9d-b722-8a6826e382e7
componentTypes:
  - name: AppServer
    description: A generic application server
    properties:
      - key: port
        type: INTEGER
        value: 8080
        required: true
  - name: Database
    extends: AppServer
relationTypes:
  - name: HostedOn
  - name: ConnectsTo
components:
  - name: web
    type: AppServer
    properties:
      - key: replicas
        value: "2"
  - name: db
    type: Database
relations:
  - name: r1
    type: HostedOn
    source: web
    target: db
"#;

    #[test]
    fn test_parse_full_model() {
        let graph = parse_model(MODEL).unwrap();
        assert_eq!(
            graph.process_id.to_string(),
            "2b5f2a80-8a50-4e9d-b722-8a6826e382e7"
        );
        assert_eq!(graph.components.len(), 2);
        assert_eq!(graph.relations.len(), 1);
        assert_eq!(graph.component_types.len(), 2);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_parse_declared_property_is_confirmed() {
        let graph = parse_model(MODEL).unwrap();
        let port = &graph.component_type("AppServer").unwrap().properties[0];
        assert_eq!(port.kind, PropertyKind::Integer);
        assert_eq!(port.confidence, Confidence::Confirmed);
        assert!(port.required);
    }

    #[test]
    fn test_parse_bare_scalar_is_inferred_suspected() {
        let graph = parse_model(MODEL).unwrap();
        let replicas = &graph.component("web").unwrap().properties[0];
        assert_eq!(replicas.value, PropertyValue::Integer(2));
        assert_eq!(replicas.confidence, Confidence::Suspected);
    }

    #[test]
    fn test_parse_inheritance_link() {
        let graph = parse_model(MODEL).unwrap();
        assert_eq!(
            graph.component_type("Database").unwrap().extends.as_deref(),
            Some("AppServer")
        );
    }

    #[test]
    fn test_missing_process_id_gets_generated() {
        let graph = parse_model("components:\n  - name: web\n").unwrap();
        assert!(!graph.process_id.is_nil());
    }

    #[test]
    fn test_load_model_missing_file() {
        let err = load_model(Path::new("/no/such/model.yaml")).unwrap_err();
        assert_eq!(err.kind(), "model-not-found");
    }

    #[test]
    fn test_parse_rejects_malformed_yaml() {
        let err = parse_model("components: [").unwrap_err();
        assert_eq!(err.kind(), "yaml");
    }
}
