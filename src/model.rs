//! Core data model for topolay
//!
//! Defines the technology-agnostic deployment graph handed over by the
//! ingestion side:
//! - `DeploymentGraph`: aggregate root, one per transformation process
//! - `Component` / `ComponentType`: deployable unit instance / reusable schema
//! - `Relation` / `RelationType`: directed edge between components / its schema
//! - `Property`, `Operation`, `Artifact`: shared leaf entities
//!
//! Entity references are name-keyed and resolved through lookup helpers on
//! `DeploymentGraph`, never through object aliasing. The graph is built once
//! per task, validated, and passed by value through the pipeline stages.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{TopolayError, TopolayResult};

/// Declared type of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyKind {
    Boolean,
    Double,
    Integer,
    String,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyKind::Boolean => "BOOLEAN",
            PropertyKind::Double => "DOUBLE",
            PropertyKind::Integer => "INTEGER",
            PropertyKind::String => "STRING",
        };
        f.write_str(name)
    }
}

/// Provenance marker for model data
///
/// `Suspected` means inferred from a bare scalar, `Confirmed` means the
/// source declared it explicitly with a type/required block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    #[default]
    Suspected,
    Confirmed,
}

/// A typed property value
///
/// Variant order matters: untagged deserialization and bare-scalar inference
/// both try boolean first, then integer, then double, then fall back to string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl PropertyValue {
    /// Infer a value from a bare scalar string.
    ///
    /// Order is fixed and load-bearing: boolean literal, then integer (no
    /// fractional part or exponent), then double, else string. `"1"` becomes
    /// an integer while `"1.0"` becomes a double.
    pub fn infer(raw: &str) -> PropertyValue {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return PropertyValue::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return PropertyValue::Boolean(false);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return PropertyValue::Integer(i);
        }
        if let Ok(d) = trimmed.parse::<f64>() {
            if d.is_finite() {
                return PropertyValue::Double(d);
            }
        }
        PropertyValue::String(raw.to_string())
    }

    /// The declared kind matching this value
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Boolean(_) => PropertyKind::Boolean,
            PropertyValue::Integer(_) => PropertyKind::Integer,
            PropertyValue::Double(_) => PropertyKind::Double,
            PropertyValue::String(_) => PropertyKind::String,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            // Whole doubles keep their decimal point so "1.0" stays
            // distinguishable from the integer "1" in emitted documents.
            PropertyValue::Double(d) if d.is_finite() && d.fract() == 0.0 => {
                write!(f, "{d:.1}")
            }
            PropertyValue::Double(d) => write!(f, "{d}"),
            PropertyValue::String(s) => f.write_str(s),
        }
    }
}

/// A key/value pair attached to a graph entity
///
/// Keys are unique within their owning entity. On a `ComponentType` the value
/// acts as the schema default; on a `Component` it is the instance value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PropertyRepr")]
pub struct Property {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    pub value: PropertyValue,
    pub required: bool,
    pub confidence: Confidence,
}

impl Property {
    /// An explicitly declared property (type and required flag known)
    pub fn confirmed(
        key: impl Into<String>,
        value: PropertyValue,
        required: bool,
    ) -> Self {
        Self {
            key: key.into(),
            kind: value.kind(),
            value,
            required,
            confidence: Confidence::Confirmed,
        }
    }

    /// A property inferred from a bare scalar
    pub fn suspected(key: impl Into<String>, raw: &str) -> Self {
        let value = PropertyValue::infer(raw);
        Self {
            key: key.into(),
            kind: value.kind(),
            value,
            required: false,
            confidence: Confidence::Suspected,
        }
    }
}

/// Wire shape for `Property` deserialization.
///
/// A missing `type` field means the value came in as a bare scalar: string
/// values run through inference and the property is recorded as `Suspected`.
/// A declared `type` makes the property `Confirmed` and the value must match.
#[derive(Deserialize)]
struct PropertyRepr {
    key: String,
    #[serde(rename = "type")]
    kind: Option<PropertyKind>,
    value: PropertyValue,
    #[serde(default)]
    required: Option<bool>,
    #[serde(default)]
    confidence: Option<Confidence>,
}

impl TryFrom<PropertyRepr> for Property {
    type Error = String;

    fn try_from(repr: PropertyRepr) -> Result<Self, String> {
        match repr.kind {
            Some(kind) => {
                let value = coerce_value(repr.value, kind, &repr.key)?;
                Ok(Property {
                    key: repr.key,
                    kind,
                    value,
                    required: repr.required.unwrap_or(false),
                    confidence: repr.confidence.unwrap_or(Confidence::Confirmed),
                })
            }
            None => {
                let value = match repr.value {
                    PropertyValue::String(raw) => PropertyValue::infer(&raw),
                    v => v,
                };
                Ok(Property {
                    key: repr.key,
                    kind: value.kind(),
                    value,
                    required: repr.required.unwrap_or(false),
                    confidence: repr.confidence.unwrap_or(Confidence::Suspected),
                })
            }
        }
    }
}

/// Align a deserialized value with its declared kind
fn coerce_value(
    value: PropertyValue,
    kind: PropertyKind,
    key: &str,
) -> Result<PropertyValue, String> {
    match (kind, value) {
        (PropertyKind::Boolean, v @ PropertyValue::Boolean(_)) => Ok(v),
        (PropertyKind::Integer, v @ PropertyValue::Integer(_)) => Ok(v),
        (PropertyKind::Double, v @ PropertyValue::Double(_)) => Ok(v),
        (PropertyKind::Double, PropertyValue::Integer(i)) => Ok(PropertyValue::Double(i as f64)),
        (PropertyKind::String, v) => Ok(PropertyValue::String(v.to_string())),
        (PropertyKind::Boolean, PropertyValue::String(s)) => s
            .trim()
            .parse::<bool>()
            .map(PropertyValue::Boolean)
            .map_err(|_| format!("property '{key}': '{s}' is not a BOOLEAN")),
        (PropertyKind::Integer, PropertyValue::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(PropertyValue::Integer)
            .map_err(|_| format!("property '{key}': '{s}' is not an INTEGER")),
        (PropertyKind::Double, PropertyValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(PropertyValue::Double)
            .map_err(|_| format!("property '{key}': '{s}' is not a DOUBLE")),
        (kind, value) => Err(format!(
            "property '{key}': value {value} does not match declared type {kind}"
        )),
    }
}

/// A named artifact attached to a component or operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, rename = "fileURI", skip_serializing_if = "Option::is_none")]
    pub file_uri: Option<String>,
    #[serde(default)]
    pub confidence: Confidence,
}

/// A named operation with its artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub confidence: Confidence,
}

/// Reusable schema for components, with single-inheritance extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl ComponentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: None,
            description: None,
            properties: Vec::new(),
            operations: Vec::new(),
        }
    }
}

/// Reusable schema for relations, with single-inheritance extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl RelationType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: None,
            description: None,
            properties: Vec::new(),
            operations: Vec::new(),
        }
    }
}

/// A deployable unit instance
///
/// `name` is the identity key within the graph and survives unchanged as the
/// `displayName` of the emitted node template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub confidence: Confidence,
}

impl Component {
    /// Component with a resolved type reference
    pub fn typed(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            properties: Vec::new(),
            operations: Vec::new(),
            artifacts: Vec::new(),
            confidence: Confidence::Confirmed,
        }
    }

    /// Component without a type reference
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            properties: Vec::new(),
            operations: Vec::new(),
            artifacts: Vec::new(),
            confidence: Confidence::Suspected,
        }
    }
}

/// A directed edge between two components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub confidence: Confidence,
}

/// Relation-type name driving containment (vertical hierarchy) layout
pub const HOSTED_ON: &str = "HostedOn";
/// Relation-type name driving adjacency (same-rank overlay) layout
pub const CONNECTS_TO: &str = "ConnectsTo";

/// Layout class of a relation, decided by its resolved relation-type name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationClass {
    /// `HostedOn` semantics: solid edge in the vertical hierarchy
    Containment,
    /// `ConnectsTo` semantics: dashed same-rank overlay edge
    Adjacency,
    /// Untyped or any other type; carries no layout semantics
    Other,
}

impl Relation {
    /// Relation between two components; source and target are distinct
    /// parameters on purpose and never share a setter.
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            source: source.into(),
            target: target.into(),
            properties: Vec::new(),
            operations: Vec::new(),
            confidence: Confidence::Confirmed,
        }
    }

    /// Layout class of this relation
    pub fn class(&self) -> RelationClass {
        match self.type_name.as_deref() {
            Some(HOSTED_ON) => RelationClass::Containment,
            Some(CONNECTS_TO) => RelationClass::Adjacency,
            _ => RelationClass::Other,
        }
    }
}

/// The aggregate root: one technology-agnostic deployment model per
/// transformation process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentGraph {
    #[serde(default = "Uuid::new_v4", rename = "processId")]
    pub process_id: Uuid,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default, rename = "componentTypes")]
    pub component_types: Vec<ComponentType>,
    #[serde(default, rename = "relationTypes")]
    pub relation_types: Vec<RelationType>,
}

impl DeploymentGraph {
    /// Empty graph for the given transformation process
    pub fn new(process_id: Uuid) -> Self {
        Self {
            process_id,
            properties: Vec::new(),
            components: Vec::new(),
            relations: Vec::new(),
            component_types: Vec::new(),
            relation_types: Vec::new(),
        }
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn component_type(&self, name: &str) -> Option<&ComponentType> {
        self.component_types.iter().find(|t| t.name == name)
    }

    pub fn relation_type(&self, name: &str) -> Option<&RelationType> {
        self.relation_types.iter().find(|t| t.name == name)
    }

    /// Check every graph invariant.
    ///
    /// Later stages assume a validated graph and do not re-check:
    /// - entity names are unique within their collection
    /// - property keys are unique within their owner
    /// - component type references resolve
    /// - relation type references and both endpoints resolve
    /// - type inheritance chains resolve and contain no cycle
    pub fn validate(&self) -> TopolayResult<()> {
        unique_names("component", self.components.iter().map(|c| c.name.as_str()))?;
        unique_names("relation", self.relations.iter().map(|r| r.name.as_str()))?;
        unique_names(
            "component type",
            self.component_types.iter().map(|t| t.name.as_str()),
        )?;
        unique_names(
            "relation type",
            self.relation_types.iter().map(|t| t.name.as_str()),
        )?;

        unique_keys("deployment model", &self.properties)?;
        for component in &self.components {
            unique_keys(&format!("component '{}'", component.name), &component.properties)?;
        }
        for relation in &self.relations {
            unique_keys(&format!("relation '{}'", relation.name), &relation.properties)?;
        }
        for ty in &self.component_types {
            unique_keys(&format!("component type '{}'", ty.name), &ty.properties)?;
        }
        for ty in &self.relation_types {
            unique_keys(&format!("relation type '{}'", ty.name), &ty.properties)?;
        }

        for component in &self.components {
            if let Some(type_name) = &component.type_name {
                if self.component_type(type_name).is_none() {
                    return Err(TopolayError::Validation(format!(
                        "component '{}' references unknown type '{}'",
                        component.name, type_name
                    )));
                }
            }
        }

        for relation in &self.relations {
            if let Some(type_name) = &relation.type_name {
                if self.relation_type(type_name).is_none() {
                    return Err(TopolayError::Validation(format!(
                        "relation '{}' references unknown type '{}'",
                        relation.name, type_name
                    )));
                }
            }
            if self.component(&relation.source).is_none() {
                return Err(TopolayError::Validation(format!(
                    "relation '{}' has unresolved source '{}'",
                    relation.name, relation.source
                )));
            }
            if self.component(&relation.target).is_none() {
                return Err(TopolayError::Validation(format!(
                    "relation '{}' has unresolved target '{}'",
                    relation.name, relation.target
                )));
            }
        }

        validate_hierarchy(
            "component type",
            &self
                .component_types
                .iter()
                .map(|t| (t.name.as_str(), t.extends.as_deref()))
                .collect::<Vec<_>>(),
        )?;
        validate_hierarchy(
            "relation type",
            &self
                .relation_types
                .iter()
                .map(|t| (t.name.as_str(), t.extends.as_deref()))
                .collect::<Vec<_>>(),
        )?;

        Ok(())
    }
}

fn unique_names<'a>(
    kind: &str,
    names: impl Iterator<Item = &'a str>,
) -> TopolayResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(TopolayError::Validation(format!(
                "duplicate {kind} name '{name}'"
            )));
        }
    }
    Ok(())
}

fn unique_keys(owner: &str, properties: &[Property]) -> TopolayResult<()> {
    let mut seen = HashSet::new();
    for property in properties {
        if !seen.insert(property.key.as_str()) {
            return Err(TopolayError::Validation(format!(
                "duplicate property key '{}' in {owner}",
                property.key
            )));
        }
    }
    Ok(())
}

/// Walk every single-inheritance chain; parents must resolve within the same
/// collection and chains must not loop back on themselves.
fn validate_hierarchy(kind: &str, links: &[(&str, Option<&str>)]) -> TopolayResult<()> {
    let by_name: HashMap<&str, Option<&str>> = links.iter().copied().collect();
    for (start, _) in links {
        let mut visited = HashSet::new();
        let mut current = *start;
        visited.insert(current);
        while let Some(Some(parent)) = by_name.get(current).copied() {
            if !by_name.contains_key(parent) {
                return Err(TopolayError::Validation(format!(
                    "{kind} '{current}' extends unknown type '{parent}'"
                )));
            }
            if !visited.insert(parent) {
                return Err(TopolayError::Validation(format!(
                    "cyclic {kind} inheritance involving '{parent}'"
                )));
            }
            current = parent;
        }
    }
    Ok(())
}
