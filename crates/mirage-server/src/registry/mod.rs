//! Resource registry: the read-only data model consumed by the route binder.
//!
//! The registry is built once from an extracted [`ApiDescription`] and the
//! resolved schema definitions. It never validates completeness; a status with
//! neither example nor schema only surfaces when a request selects it.

mod types;

pub use types::{
    ApiDescription, DefinitionMap, DefinitionSource, MethodMap, ResourceMap, ResponseSpec,
    StatusMap,
};

use crate::error::StartupError;
use serde_json::Value;
use std::path::Path;

/// Immutable lookup over resources and definitions.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    resources: ResourceMap,
    definitions: DefinitionMap,
}

impl Registry {
    pub fn new(resources: ResourceMap, definitions: DefinitionMap) -> Self {
        Self {
            resources,
            definitions,
        }
    }

    pub fn resources(&self) -> &ResourceMap {
        &self.resources
    }

    pub fn definitions(&self) -> &DefinitionMap {
        &self.definitions
    }

    /// Look up the spec declared for a route, method and status.
    pub fn response(&self, route: &str, method: &str, status: &str) -> Option<&ResponseSpec> {
        self.resources.get(route)?.get(method)?.get(status)
    }

    /// Schema backing a response: the definition named by its `ref`.
    pub fn schema_for(&self, spec: &ResponseSpec) -> Option<&Value> {
        spec.reference
            .as_deref()
            .and_then(|name| self.definitions.get(name))
    }
}

impl ApiDescription {
    /// Load a description document. `.json` files are parsed as JSON, anything
    /// else as YAML (which also accepts JSON).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| StartupError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let parsed = if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        };

        parsed.map_err(|message| StartupError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_json_str(contents: &str) -> Result<Self, String> {
        serde_json::from_str(contents).map_err(|e| e.to_string())
    }

    /// Parse YAML. Goes through `serde_json::Value` so unquoted status keys
    /// (`200:`) become strings.
    pub fn from_yaml_str(contents: &str) -> Result<Self, String> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(contents).map_err(|e| e.to_string())?;
        let json = yaml_to_json(yaml)?;
        serde_json::from_value(json).map_err(|e| e.to_string())
    }

    /// Decode every definition into a JSON schema value.
    pub fn decode_definitions(&self) -> Result<DefinitionMap, StartupError> {
        self.definitions
            .iter()
            .map(|(name, source)| {
                let schema = match source {
                    DefinitionSource::Schema(value) => value.clone(),
                    DefinitionSource::Encoded(text) => {
                        serde_json::from_str(text).map_err(|e| StartupError::Definition {
                            name: name.clone(),
                            message: e.to_string(),
                        })?
                    }
                };
                Ok((name.clone(), schema))
            })
            .collect()
    }
}

/// Convert a YAML tree to JSON, stringifying non-string mapping keys.
pub(crate) fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Yaml::Mapping(map) => {
            let mut object = serde_json::Map::new();
            for (key, value) in map {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported mapping key: {other:?}")),
                };
                object.insert(key, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}
