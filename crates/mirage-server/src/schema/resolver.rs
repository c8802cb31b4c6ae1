//! Reference resolution against the definition map and the local filesystem.

use super::{RefTable, ReferenceResolver, ResolutionError};
use crate::registry::{yaml_to_json, DefinitionMap};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolves `$ref`s to definitions by name or id, to JSON pointers inside the
/// referencing document, and to schema files under `directory`.
#[derive(Debug, Clone, Default)]
pub struct LocalResolver {
    directory: Option<PathBuf>,
}

impl LocalResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base directory for file references.
    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
        }
    }

    fn load_document(&self, file: &str) -> Result<Option<(PathBuf, Value)>, ResolutionError> {
        let Some(ref directory) = self.directory else {
            return Ok(None);
        };
        let path = directory.join(file);
        if !path.is_file() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| ResolutionError::Read {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let document = parse_document(&path, &contents)?;
        debug!("Loaded referenced schema {}", path.display());
        Ok(Some((path, document)))
    }
}

impl ReferenceResolver for LocalResolver {
    fn resolve(
        &self,
        definitions: &DefinitionMap,
    ) -> Result<(RefTable, DefinitionMap), ResolutionError> {
        let mut refs = RefTable::new();

        for (name, schema) in definitions {
            refs.insert(name.clone(), schema.clone());
            if let Some(id) = schema_id(schema) {
                refs.insert(id.trim_end_matches('#').to_string(), schema.clone());
            }
        }

        // (document label, document root) pairs still to scan for references
        let mut pending: VecDeque<(String, Value)> = definitions
            .iter()
            .map(|(name, schema)| (name.clone(), schema.clone()))
            .collect();
        let mut loaded: HashSet<String> = HashSet::new();

        while let Some((label, root)) = pending.pop_front() {
            let mut references = Vec::new();
            collect_refs(&root, &mut references);

            for reference in references {
                if refs.contains(&reference) {
                    continue;
                }

                let (file, fragment) = match reference.split_once('#') {
                    Some((file, fragment)) => (file, fragment),
                    None => (reference.as_str(), ""),
                };

                if file.is_empty() {
                    // Pointer into the referencing document itself
                    let target = root.pointer(fragment).cloned().ok_or_else(|| {
                        ResolutionError::UnresolvedReference {
                            reference: reference.clone(),
                            definition: label.clone(),
                        }
                    })?;
                    refs.insert(reference.clone(), target);
                    continue;
                }

                let document = if let Some(existing) = refs.get(file) {
                    existing.clone()
                } else {
                    let (path, document) = self.load_document(file)?.ok_or_else(|| {
                        ResolutionError::UnresolvedReference {
                            reference: reference.clone(),
                            definition: label.clone(),
                        }
                    })?;
                    refs.insert(file.to_string(), document.clone());
                    if loaded.insert(file.to_string()) {
                        pending.push_back((path.display().to_string(), document.clone()));
                    }
                    document
                };

                if !fragment.is_empty() {
                    let target = document.pointer(fragment).cloned().ok_or_else(|| {
                        ResolutionError::UnresolvedReference {
                            reference: reference.clone(),
                            definition: label.clone(),
                        }
                    })?;
                    refs.insert(reference.clone(), target);
                }
            }
        }

        debug!(
            "Resolved {} definitions into {} references",
            definitions.len(),
            refs.len()
        );

        Ok((refs, definitions.clone()))
    }
}

fn schema_id(schema: &Value) -> Option<&str> {
    schema
        .get("$id")
        .or_else(|| schema.get("id"))
        .and_then(Value::as_str)
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$ref", Value::String(reference)) => out.push(reference.clone()),
                    _ => collect_refs(child, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, out)),
        _ => {}
    }
}

fn parse_document(path: &Path, contents: &str) -> Result<Value, ResolutionError> {
    let invalid = |message: String| ResolutionError::InvalidDocument {
        path: path.to_path_buf(),
        message,
    };
    if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
        serde_json::from_str(contents).map_err(|e| invalid(e.to_string()))
    } else {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(contents).map_err(|e| invalid(e.to_string()))?;
        yaml_to_json(yaml).map_err(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definitions(pairs: &[(&str, Value)]) -> DefinitionMap {
        pairs
            .iter()
            .map(|(name, schema)| (name.to_string(), schema.clone()))
            .collect()
    }

    #[test]
    fn test_resolves_named_definitions() {
        let defs = definitions(&[
            (
                "Pet",
                json!({"type": "object", "properties": {"tag": {"$ref": "#/definitions/Tag"}}}),
            ),
            ("Tag", json!({"type": "string", "id": "http://example.com/tag#"})),
        ]);

        let (refs, resolved) = LocalResolver::new().resolve(&defs).unwrap();
        assert_eq!(resolved, defs);
        assert!(refs.contains("#/definitions/Tag"));
        assert!(refs.contains("http://example.com/tag"));
    }

    #[test]
    fn test_local_pointer() {
        let defs = definitions(&[(
            "Pet",
            json!({
                "definitions": {"name": {"type": "string"}},
                "properties": {"name": {"$ref": "#/definitions/name"}}
            }),
        )]);

        let (refs, _) = LocalResolver::new().resolve(&defs).unwrap();
        assert_eq!(refs.get("#/definitions/name"), Some(&json!({"type": "string"})));
    }

    #[test]
    fn test_unresolved_reference_fails() {
        let defs = definitions(&[("Pet", json!({"$ref": "Missing"}))]);
        let err = LocalResolver::new().resolve(&defs).unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::UnresolvedReference { ref reference, ref definition }
                if reference == "Missing" && definition == "Pet"
        ));
    }

    #[test]
    fn test_file_reference() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("owner.json"),
            r##"{"type": "object", "definitions": {"id": {"type": "integer"}}, "properties": {"id": {"$ref": "#/definitions/id"}}}"##,
        )
        .unwrap();

        let defs = definitions(&[(
            "Pet",
            json!({"properties": {
                "owner": {"$ref": "owner.json"},
                "ownerId": {"$ref": "owner.json#/definitions/id"}
            }}),
        )]);

        let (refs, _) = LocalResolver::with_directory(dir.path())
            .resolve(&defs)
            .unwrap();
        assert_eq!(refs.get("owner.json").unwrap()["type"], "object");
        assert_eq!(
            refs.get("owner.json#/definitions/id"),
            Some(&json!({"type": "integer"}))
        );
        // Nested pointer inside the loaded file
        assert!(refs.contains("#/definitions/id"));
    }
}
