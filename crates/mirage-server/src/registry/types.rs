//! Type definitions for the extracted API description.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status code (as declared, e.g. `"200"`) → response spec.
pub type StatusMap = IndexMap<String, ResponseSpec>;

/// HTTP method (lowercase as declared) → status map.
pub type MethodMap = IndexMap<String, StatusMap>;

/// Route template (e.g. `/pets/{id}`) → method map.
pub type ResourceMap = IndexMap<String, MethodMap>;

/// Reference name → JSON Schema.
pub type DefinitionMap = IndexMap<String, Value>;

/// One declared response for a route, method and status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// Name of a schema in the definition map
    #[serde(
        rename = "ref",
        alias = "_ref",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reference: Option<String>,
    /// Inline schema as declared. Bodies are only generated from `ref`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl ResponseSpec {
    pub fn with_example(example: Value) -> Self {
        Self {
            example: Some(example),
            ..Default::default()
        }
    }

    pub fn with_reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Default::default()
        }
    }

    /// The literal example, treating JSON `null` as absent.
    pub fn literal_example(&self) -> Option<&Value> {
        self.example.as_ref().filter(|v| !v.is_null())
    }
}

/// A schema definition as it appears in a description document.
///
/// RAML schema blocks arrive as JSON text, so both encoded strings and
/// already-parsed objects are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefinitionSource {
    Encoded(String),
    Schema(Value),
}

/// The extracted API: resources plus the raw schema definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiDescription {
    #[serde(default)]
    pub resources: ResourceMap,
    #[serde(default)]
    pub definitions: IndexMap<String, DefinitionSource>,
}
