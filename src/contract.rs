//! Output contracts
//!
//! A contract is the declared shape a specialist's answer must satisfy. The
//! same declaration drives four things:
//! - the `responseSchema` attached to structured generation requests
//! - the JSON skeleton appended to prompts for text-only generators
//! - validation + normalization of whatever the model returned
//! - the safe empty defaults used in failure envelopes

use serde_json::{json, Map, Value};

use crate::error::OrchestrationError;
use crate::models::{now_timestamp, SpecialistResult};
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    String,
    Number,
    Integer,
    Boolean,
    /// Closed set of strings; the first variant is the failure default
    Enum(&'static [&'static str]),
    List(Box<Shape>),
    Object(Vec<Field>),
}

impl Shape {
    pub fn list(item: Shape) -> Shape {
        Shape::List(Box::new(item))
    }

    pub fn strings() -> Shape {
        Shape::list(Shape::String)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub shape: Shape,
    pub required: bool,
    pub description: Option<&'static str>,
}

impl Field {
    pub fn required(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            required: false,
            description: None,
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputContract {
    name: &'static str,
    fields: Vec<Field>,
    summary_field: Option<&'static str>,
}

impl OutputContract {
    pub fn new(name: &'static str, fields: Vec<Field>) -> Self {
        Self {
            name,
            fields,
            summary_field: None,
        }
    }

    /// Field that carries the explanatory text in a failure envelope
    pub fn with_summary_field(mut self, field: &'static str) -> Self {
        self.summary_field = Some(field);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Validate a model answer and return the normalized object.
    ///
    /// Unknown keys are dropped; absent optional fields are filled with
    /// their defaults.
    pub fn validate(&self, value: &Value) -> Result<Map<String, Value>> {
        match validate_object(&self.fields, value, "")? {
            Value::Object(map) => Ok(map),
            _ => Err(violation("", "expected object")),
        }
    }

    /// Every field present, lists empty, numbers zeroed
    pub fn empty_object(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|f| (f.name.to_string(), default_for(&f.shape)))
            .collect()
    }

    /// A populated object that satisfies the contract
    pub fn sample_object(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|f| (f.name.to_string(), sample_for(f.name, &f.shape)))
            .collect()
    }

    /// Wrap a model answer in a success envelope, or explain why it is invalid
    pub fn success(&self, value: &Value) -> Result<SpecialistResult> {
        let fields = self.validate(value)?;
        Ok(SpecialistResult {
            success: true,
            message: None,
            timestamp: now_timestamp(),
            fields,
        })
    }

    /// Canonical failure envelope: contract-shaped defaults plus a message
    pub fn failure(&self, message: impl Into<String>) -> SpecialistResult {
        let message = message.into();
        let mut fields = self.empty_object();

        if let Some(summary) = self.summary_field {
            fields.insert(
                summary.to_string(),
                Value::String(format!("Analysis unavailable: {}", message)),
            );
        }

        SpecialistResult {
            success: false,
            message: Some(message),
            timestamp: now_timestamp(),
            fields,
        }
    }

    /// Schema in the OpenAPI subset Gemini accepts for `responseSchema`
    pub fn response_schema(&self) -> Value {
        object_schema(&self.fields)
    }

    /// Example JSON used to describe the shape inside a prompt
    pub fn skeleton(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|f| (f.name.to_string(), skeleton_for(f)))
                .collect(),
        )
    }
}

fn violation(path: &str, reason: &str) -> OrchestrationError {
    let at = if path.is_empty() { "<root>" } else { path };
    OrchestrationError::ContractViolation(format!("{}: {}", at, reason))
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn validate_object(fields: &[Field], value: &Value, path: &str) -> Result<Value> {
    let obj = value
        .as_object()
        .ok_or_else(|| violation(path, "expected object"))?;

    let mut normalized = Map::with_capacity(fields.len());

    for field in fields {
        let field_path = join_path(path, field.name);
        match obj.get(field.name) {
            Some(v) if !v.is_null() => {
                normalized.insert(
                    field.name.to_string(),
                    validate_shape(&field.shape, v, &field_path)?,
                );
            }
            _ if field.required => return Err(violation(&field_path, "missing required field")),
            _ => {
                normalized.insert(field.name.to_string(), default_for(&field.shape));
            }
        }
    }

    Ok(Value::Object(normalized))
}

fn validate_shape(shape: &Shape, value: &Value, path: &str) -> Result<Value> {
    match shape {
        Shape::String => value
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| violation(path, "expected string")),
        Shape::Number => {
            if value.is_number() {
                Ok(value.clone())
            } else {
                Err(violation(path, "expected number"))
            }
        }
        Shape::Integer => {
            if let Some(i) = value.as_i64() {
                return Ok(json!(i));
            }
            match value.as_f64() {
                Some(f) if f.fract() == 0.0 => Ok(json!(f as i64)),
                _ => Err(violation(path, "expected integer")),
            }
        }
        Shape::Boolean => value
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| violation(path, "expected boolean")),
        Shape::Enum(variants) => {
            let s = value
                .as_str()
                .ok_or_else(|| violation(path, "expected enumerated string"))?;
            variants
                .iter()
                .find(|v| v.eq_ignore_ascii_case(s.trim()))
                .map(|v| Value::String(v.to_string()))
                .ok_or_else(|| {
                    violation(path, &format!("'{}' is not one of {:?}", s, variants))
                })
        }
        Shape::List(item) => {
            let items = value
                .as_array()
                .ok_or_else(|| violation(path, "expected list"))?;
            items
                .iter()
                .enumerate()
                .map(|(i, v)| validate_shape(item, v, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        Shape::Object(fields) => validate_object(fields, value, path),
    }
}

fn default_for(shape: &Shape) -> Value {
    match shape {
        Shape::String => json!(""),
        Shape::Number => json!(0.0),
        Shape::Integer => json!(0),
        Shape::Boolean => json!(false),
        Shape::Enum(variants) => json!(variants.first().copied().unwrap_or_default()),
        Shape::List(_) => json!([]),
        Shape::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|f| (f.name.to_string(), default_for(&f.shape)))
                .collect(),
        ),
    }
}

fn sample_for(name: &str, shape: &Shape) -> Value {
    match shape {
        Shape::String => json!(format!("Sample {}", name)),
        Shape::Number => json!(1.0),
        Shape::Integer => json!(1),
        Shape::Boolean => json!(true),
        Shape::Enum(variants) => json!(variants.first().copied().unwrap_or_default()),
        Shape::List(item) => json!([sample_for(name, item)]),
        Shape::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|f| (f.name.to_string(), sample_for(f.name, &f.shape)))
                .collect(),
        ),
    }
}

fn object_schema(fields: &[Field]) -> Value {
    let mut properties = Map::new();
    for field in fields {
        let mut schema = shape_schema(&field.shape);
        if let (Some(desc), Value::Object(obj)) = (field.description, &mut schema) {
            obj.insert("description".to_string(), json!(desc));
        }
        properties.insert(field.name.to_string(), schema);
    }

    let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();
    let ordering: Vec<&str> = fields.iter().map(|f| f.name).collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
        "propertyOrdering": ordering,
    })
}

fn shape_schema(shape: &Shape) -> Value {
    match shape {
        Shape::String => json!({ "type": "STRING" }),
        Shape::Number => json!({ "type": "NUMBER" }),
        Shape::Integer => json!({ "type": "INTEGER" }),
        Shape::Boolean => json!({ "type": "BOOLEAN" }),
        Shape::Enum(variants) => json!({ "type": "STRING", "enum": variants }),
        Shape::List(item) => json!({ "type": "ARRAY", "items": shape_schema(item) }),
        Shape::Object(fields) => object_schema(fields),
    }
}

fn skeleton_for(field: &Field) -> Value {
    let value = skeleton_shape(&field.shape);
    if !field.required {
        if let Value::String(hint) = &value {
            return json!(format!("{} (optional)", hint));
        }
    }
    value
}

fn skeleton_shape(shape: &Shape) -> Value {
    match shape {
        Shape::String => json!("<string>"),
        Shape::Number => json!("<number>"),
        Shape::Integer => json!("<integer>"),
        Shape::Boolean => json!("<true|false>"),
        Shape::Enum(variants) => json!(format!("<{}>", variants.join("|"))),
        Shape::List(item) => json!([skeleton_shape(item)]),
        Shape::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|f| (f.name.to_string(), skeleton_for(f)))
                .collect(),
        ),
    }
}

/// Pull a JSON value out of raw model text.
///
/// Handles bare JSON, ```json fenced blocks, and prose wrapped around a
/// single `{ ... }` object.
pub fn extract_json(text: &str) -> Result<Value> {
    let trimmed = text.trim();

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Ok(v);
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            if let Ok(v) = serde_json::from_str::<Value>(body[..end].trim()) {
                return Ok(v);
            }
        }
    }

    if let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if open < close {
            if let Ok(v) = serde_json::from_str::<Value>(&trimmed[open..=close]) {
                return Ok(v);
            }
        }
    }

    Err(OrchestrationError::LlmError(format!(
        "model response is not valid JSON: {}",
        truncate(trimmed, 200)
    )))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
