//! Random value generation from JSON Schema, backed by `fake`.
//!
//! Covers the draft-04/06 keywords that appear in API descriptions: `$ref`,
//! `const`, `enum`, `allOf`/`anyOf`/`oneOf`, typed objects, arrays, strings
//! (with `format`), numbers and booleans. Regex `pattern` is not honoured.

use super::{GenerationError, RefTable, SchemaValueGenerator};
use crate::error::StartupError;
use crate::registry::yaml_to_json;
use fake::faker::chrono::en::DateTime;
use fake::faker::internet::en::{DomainSuffix, IPv4, IPv6, SafeEmail};
use fake::faker::lorem::en::{Sentence, Word};
use fake::Fake;
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Custom string formats: format name → candidate values.
pub type FormatMap = HashMap<String, Vec<Value>>;

const DEFAULT_MAX_DEPTH: usize = 12;
const DEFAULT_SPAN: i64 = 1000;

/// Default [`SchemaValueGenerator`].
#[derive(Debug, Clone)]
pub struct FakerGenerator {
    formats: FormatMap,
    max_depth: usize,
    /// Chance that a non-required property is emitted
    optional_probability: f64,
}

impl Default for FakerGenerator {
    fn default() -> Self {
        Self {
            formats: FormatMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            optional_probability: 0.5,
        }
    }
}

impl FakerGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formats(mut self, formats: FormatMap) -> Self {
        self.formats = formats;
        self
    }

    /// Recursive references deeper than this produce `null`.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_optional_probability(mut self, probability: f64) -> Self {
        self.optional_probability = probability.clamp(0.0, 1.0);
        self
    }

    fn value(
        &self,
        schema: &Value,
        refs: &RefTable,
        rng: &mut ThreadRng,
        depth: usize,
    ) -> Result<Value, GenerationError> {
        if depth > self.max_depth {
            return Ok(Value::Null);
        }

        let obj = match schema {
            Value::Object(obj) => obj,
            Value::Bool(true) => return Ok(Value::String(Word().fake_with_rng(rng))),
            Value::Bool(false) => return Ok(Value::Null),
            other => return Err(GenerationError::Unsupported(other.to_string())),
        };

        if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
            let target = refs
                .get(reference)
                .ok_or_else(|| GenerationError::UnresolvedReference(reference.to_string()))?;
            return self.value(target, refs, rng, depth + 1);
        }

        if let Some(constant) = obj.get("const") {
            return Ok(constant.clone());
        }

        if let Some(choice) = obj
            .get("enum")
            .and_then(Value::as_array)
            .and_then(|values| values.choose(rng))
        {
            return Ok(choice.clone());
        }

        if let Some(parts) = obj.get("allOf").and_then(Value::as_array) {
            let merged = merge_all_of(obj, parts, refs)?;
            return self.value(&merged, refs, rng, depth + 1);
        }

        for keyword in ["oneOf", "anyOf"] {
            if let Some(choice) = obj
                .get(keyword)
                .and_then(Value::as_array)
                .and_then(|variants| variants.choose(rng))
            {
                return self.value(choice, refs, rng, depth + 1);
            }
        }

        let kind = match obj.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(Value::Array(kinds)) => kinds
                .choose(rng)
                .and_then(Value::as_str)
                .unwrap_or("null")
                .to_string(),
            _ => infer_type(obj).to_string(),
        };

        match kind.as_str() {
            "object" => self.object(obj, refs, rng, depth),
            "array" => self.array(obj, refs, rng, depth),
            "string" => self.string(obj, rng),
            "integer" => integer(obj, rng),
            "number" => number(obj, rng),
            "boolean" => Ok(Value::Bool(rng.gen())),
            "null" => Ok(Value::Null),
            other => Err(GenerationError::Unsupported(format!("type '{other}'"))),
        }
    }

    fn object(
        &self,
        obj: &Map<String, Value>,
        refs: &RefTable,
        rng: &mut ThreadRng,
        depth: usize,
    ) -> Result<Value, GenerationError> {
        let required: Vec<&str> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut out = Map::new();
        if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                let emit = required.contains(&name.as_str())
                    || rng.gen_bool(self.optional_probability);
                if emit {
                    out.insert(name.clone(), self.value(property, refs, rng, depth + 1)?);
                }
            }
        }
        Ok(Value::Object(out))
    }

    fn array(
        &self,
        obj: &Map<String, Value>,
        refs: &RefTable,
        rng: &mut ThreadRng,
        depth: usize,
    ) -> Result<Value, GenerationError> {
        if let Some(Value::Array(tuple)) = obj.get("items") {
            return tuple
                .iter()
                .map(|item| self.value(item, refs, rng, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array);
        }

        let min = obj.get("minItems").and_then(Value::as_u64).unwrap_or(1);
        let max = obj.get("maxItems").and_then(Value::as_u64).unwrap_or(min.saturating_add(4));
        if min > max {
            return Err(GenerationError::InvalidRange {
                keyword: "items",
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        let count = rng.gen_range(min..=max);

        let item_schema = obj
            .get("items")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({"type": "string"}));
        (0..count)
            .map(|_| self.value(&item_schema, refs, rng, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn string(
        &self,
        obj: &Map<String, Value>,
        rng: &mut ThreadRng,
    ) -> Result<Value, GenerationError> {
        if let Some(format) = obj.get("format").and_then(Value::as_str) {
            if let Some(candidate) = self.formats.get(format).and_then(|c| c.choose(rng)) {
                return Ok(candidate.clone());
            }
            if let Some(text) = builtin_format(format, rng) {
                return Ok(Value::String(text));
            }
        }

        let min = obj.get("minLength").and_then(Value::as_u64).unwrap_or(0) as usize;
        let max = obj.get("maxLength").and_then(Value::as_u64).map(|m| m as usize);
        if let Some(max) = max {
            if min > max {
                return Err(GenerationError::InvalidRange {
                    keyword: "length",
                    min: min.to_string(),
                    max: max.to_string(),
                });
            }
        }

        let mut text: String = Sentence(1..6).fake_with_rng(rng);
        while text.chars().count() < min {
            let word: String = Word().fake_with_rng(rng);
            text.push(' ');
            text.push_str(&word);
        }
        if let Some(max) = max {
            text = text.chars().take(max).collect();
        }
        Ok(Value::String(text))
    }
}

impl SchemaValueGenerator for FakerGenerator {
    fn generate(&self, schema: &Value, refs: &RefTable) -> Result<Value, GenerationError> {
        let mut rng = rand::thread_rng();
        self.value(schema, refs, &mut rng, 0)
    }
}

fn infer_type(obj: &Map<String, Value>) -> &'static str {
    if obj.contains_key("properties") || obj.contains_key("required") {
        "object"
    } else if obj.contains_key("items") {
        "array"
    } else if obj.contains_key("minimum") || obj.contains_key("maximum") {
        "number"
    } else {
        "string"
    }
}

/// Fold `allOf` members (following references) into one schema.
fn merge_all_of(
    obj: &Map<String, Value>,
    parts: &[Value],
    refs: &RefTable,
) -> Result<Value, GenerationError> {
    let mut merged = obj.clone();
    merged.remove("allOf");

    for part in parts {
        let mut part = part;
        while let Some(reference) = part.get("$ref").and_then(Value::as_str) {
            part = refs
                .get(reference)
                .ok_or_else(|| GenerationError::UnresolvedReference(reference.to_string()))?;
        }
        let Some(part) = part.as_object() else {
            continue;
        };

        for (key, value) in part {
            match (key.as_str(), merged.get_mut(key)) {
                ("properties", Some(Value::Object(existing))) => {
                    if let Value::Object(extra) = value {
                        existing.extend(extra.clone());
                    }
                }
                ("required", Some(Value::Array(existing))) => {
                    if let Value::Array(extra) = value {
                        existing.extend(extra.iter().cloned());
                    }
                }
                _ => {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
    }

    Ok(Value::Object(merged))
}

fn builtin_format(format: &str, rng: &mut ThreadRng) -> Option<String> {
    let text = match format {
        "email" => SafeEmail().fake_with_rng(rng),
        "uuid" => uuid::Uuid::new_v4().to_string(),
        "date-time" => {
            let at: chrono::DateTime<chrono::Utc> = DateTime().fake_with_rng(rng);
            at.to_rfc3339()
        }
        "date" => {
            let at: chrono::DateTime<chrono::Utc> = DateTime().fake_with_rng(rng);
            at.date_naive().to_string()
        }
        "time" => {
            let at: chrono::DateTime<chrono::Utc> = DateTime().fake_with_rng(rng);
            at.format("%H:%M:%S").to_string()
        }
        "hostname" => host(rng),
        "uri" | "url" => format!("https://{}/{}", host(rng), Word().fake_with_rng::<String, _>(rng)),
        "ipv4" => IPv4().fake_with_rng(rng),
        "ipv6" => IPv6().fake_with_rng(rng),
        _ => return None,
    };
    Some(text)
}

fn host(rng: &mut ThreadRng) -> String {
    let name: String = Word().fake_with_rng(rng);
    let suffix: String = DomainSuffix().fake_with_rng(rng);
    format!("{name}.{suffix}")
}

/// Integer bounds, honouring draft-04 boolean and draft-06 numeric exclusivity.
///
/// An exclusive bound at the edge of `i64` leaves nothing to draw from.
fn integer_bounds(
    obj: &Map<String, Value>,
) -> Result<(Option<i64>, Option<i64>), GenerationError> {
    let mut low = obj.get("minimum").and_then(as_i64_floor);
    let mut high = obj.get("maximum").and_then(as_i64_floor);
    let empty = |min: String, max: String| GenerationError::InvalidRange {
        keyword: "integer",
        min,
        max,
    };

    match obj.get("exclusiveMinimum") {
        Some(Value::Bool(true)) => {
            low = low
                .map(|v| v.checked_add(1).ok_or_else(|| empty(format!("> {v}"), v.to_string())))
                .transpose()?;
        }
        Some(v) => {
            if let Some(bound) = as_i64_floor(v) {
                let next = bound
                    .checked_add(1)
                    .ok_or_else(|| empty(format!("> {bound}"), bound.to_string()))?;
                low = Some(next);
            }
        }
        None => {}
    }
    match obj.get("exclusiveMaximum") {
        Some(Value::Bool(true)) => {
            high = high
                .map(|v| v.checked_sub(1).ok_or_else(|| empty(v.to_string(), format!("< {v}"))))
                .transpose()?;
        }
        Some(v) => {
            if let Some(bound) = as_i64_floor(v) {
                let next = bound
                    .checked_sub(1)
                    .ok_or_else(|| empty(bound.to_string(), format!("< {bound}")))?;
                high = Some(next);
            }
        }
        None => {}
    }
    Ok((low, high))
}

fn as_i64_floor(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.floor() as i64))
}

fn span(low: Option<i64>, high: Option<i64>) -> (i64, i64) {
    match (low, high) {
        (Some(low), Some(high)) => (low, high),
        (Some(low), None) => (low, low.saturating_add(DEFAULT_SPAN)),
        (None, Some(high)) => (high.saturating_sub(DEFAULT_SPAN), high),
        (None, None) => (0, DEFAULT_SPAN),
    }
}

fn integer(obj: &Map<String, Value>, rng: &mut ThreadRng) -> Result<Value, GenerationError> {
    let (low, high) = integer_bounds(obj)?;
    let (low, high) = span(low, high);

    let step = obj
        .get("multipleOf")
        .and_then(Value::as_i64)
        .filter(|m| *m > 0)
        .unwrap_or(1);
    // Smallest and largest multiples of `step` inside [low, high]
    let first = low.div_euclid(step) + i64::from(low.rem_euclid(step) != 0);
    let last = high.div_euclid(step);
    if first > last {
        return Err(GenerationError::InvalidRange {
            keyword: "integer",
            min: low.to_string(),
            max: high.to_string(),
        });
    }
    Ok(Value::from(rng.gen_range(first..=last) * step))
}

fn number(obj: &Map<String, Value>, rng: &mut ThreadRng) -> Result<Value, GenerationError> {
    if let Some(step) = obj
        .get("multipleOf")
        .and_then(Value::as_f64)
        .filter(|m| *m > 0.0)
    {
        let low = obj.get("minimum").and_then(Value::as_f64).unwrap_or(0.0);
        let high = obj
            .get("maximum")
            .and_then(Value::as_f64)
            .unwrap_or(low + DEFAULT_SPAN as f64);
        let first = (low / step).ceil() as i64;
        let last = (high / step).floor() as i64;
        if first > last {
            return Err(GenerationError::InvalidRange {
                keyword: "number",
                min: low.to_string(),
                max: high.to_string(),
            });
        }
        let value = rng.gen_range(first..=last) as f64 * step;
        return Ok(serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null));
    }

    let low = obj.get("minimum").and_then(Value::as_f64);
    let high = obj.get("maximum").and_then(Value::as_f64);
    let span = DEFAULT_SPAN as f64;
    let (low, high) = match (low, high) {
        (Some(low), Some(high)) => (low, high),
        (Some(low), None) => (low, (low + span).min(f64::MAX)),
        (None, Some(high)) => ((high - span).max(f64::MIN), high),
        (None, None) => (0.0, span),
    };
    if low > high {
        return Err(GenerationError::InvalidRange {
            keyword: "number",
            min: low.to_string(),
            max: high.to_string(),
        });
    }
    // Interpolating keeps the draw finite even when `high - low` overflows.
    let t: f64 = rng.gen();
    let value = (low * (1.0 - t) + high * t).clamp(low, high);
    Ok(serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null))
}

/// Load custom formats from a JSON or YAML file mapping a format name to a list
/// of values (a single scalar is treated as a one-element list).
pub fn load_formats<P: AsRef<Path>>(path: P) -> Result<FormatMap, StartupError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| StartupError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |message: String| StartupError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?;
    let Value::Object(entries) = yaml_to_json(yaml).map_err(parse_error)? else {
        return Err(parse_error("expected a mapping of format names".to_string()));
    };

    Ok(entries
        .into_iter()
        .map(|(name, values)| match values {
            Value::Array(values) => (name, values),
            single => (name, vec![single]),
        })
        .collect())
}
