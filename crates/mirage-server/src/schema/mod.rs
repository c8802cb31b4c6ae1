//! Schema collaborators: reference resolution and value generation.
//!
//! Both are traits so the dispatch engine can run against fakes in tests. The
//! shipped implementations are [`LocalResolver`] and [`FakerGenerator`].

mod generator;
mod resolver;

pub use generator::{load_formats, FakerGenerator, FormatMap};
pub use resolver::LocalResolver;

use crate::error::panic_message;
use crate::registry::DefinitionMap;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

/// Produces one random value conforming to a JSON Schema.
pub trait SchemaValueGenerator: Send + Sync {
    fn generate(&self, schema: &Value, refs: &RefTable) -> Result<Value, GenerationError>;
}

/// Turns raw definitions into resolved definitions plus a reference table.
pub trait ReferenceResolver {
    fn resolve(
        &self,
        definitions: &DefinitionMap,
    ) -> Result<(RefTable, DefinitionMap), ResolutionError>;
}

/// Reference string → schema. Opaque to the dispatch engine.
#[derive(Debug, Clone, Default)]
pub struct RefTable {
    schemas: HashMap<String, Value>,
}

impl RefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema. The first registration of a key wins.
    pub fn insert(&mut self, key: impl Into<String>, schema: Value) {
        self.schemas.entry(key.into()).or_insert(schema);
    }

    /// Look up a `$ref`, first verbatim, then by its definition name.
    pub fn get(&self, reference: &str) -> Option<&Value> {
        self.schemas
            .get(reference)
            .or_else(|| self.schemas.get(ref_name(reference)))
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.get(reference).is_some()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Strip the well-known local prefixes from a reference.
///
/// `#/definitions/Pet`, `#/components/schemas/Pet` and `Pet#` all name `Pet`.
pub fn ref_name(reference: &str) -> &str {
    let name = reference
        .strip_prefix("#/definitions/")
        .or_else(|| reference.strip_prefix("#/components/schemas/"))
        .unwrap_or(reference);
    name.strip_suffix('#').unwrap_or(name)
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("unresolved schema reference: {0}")]
    UnresolvedReference(String),
    #[error("invalid {keyword} range: {min} > {max}")]
    InvalidRange {
        keyword: &'static str,
        min: String,
        max: String,
    },
    #[error("unsupported schema: {0}")]
    Unsupported(String),
    #[error("schema generation panicked: {0}")]
    Panicked(String),
}

/// Run a generator, turning a panic into [`GenerationError::Panicked`].
pub fn generate_value(
    generator: &dyn SchemaValueGenerator,
    schema: &Value,
    refs: &RefTable,
) -> Result<Value, GenerationError> {
    catch_unwind(AssertUnwindSafe(|| generator.generate(schema, refs))).unwrap_or_else(|panic| {
        Err(GenerationError::Panicked(
            panic_message(panic.as_ref()).unwrap_or_else(|| "unknown cause".to_string()),
        ))
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("unresolved reference '{reference}' in '{definition}'")]
    UnresolvedReference {
        reference: String,
        definition: String,
    },
    #[error("failed to read referenced schema {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("invalid referenced schema {path}: {message}")]
    InvalidDocument { path: PathBuf, message: String },
}
