// schema.rs: Parameter schemas for tools.
//
// A small closed schema language (object, array, enum, string, integer,
// number, boolean) instead of free-form JSON Schema maps. Tools describe
// their inputs with it, the registry renders it as JSON Schema for the
// agent's tool menu, and `validate()` checks incoming params structurally
// before a tool touches anything.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// One node in a parameter schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSchema {
    Object {
        description: Option<String>,
        /// BTreeMap keeps rendering and validation order stable.
        properties: BTreeMap<String, ParamSchema>,
        required: Vec<String>,
    },
    Array {
        description: Option<String>,
        items: Box<ParamSchema>,
    },
    Enum {
        description: Option<String>,
        values: Vec<String>,
    },
    String {
        description: Option<String>,
    },
    Integer {
        description: Option<String>,
        minimum: Option<i64>,
        maximum: Option<i64>,
    },
    Number {
        description: Option<String>,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Boolean {
        description: Option<String>,
    },
}

/// A single structural problem found by [`ParamSchema::validate`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Location of the offending value, e.g. `$.filter.environment`.
    pub path: String,
    pub message: String,
}

impl ParamSchema {
    /// An object with no properties (tools that take no parameters).
    pub fn object() -> Self {
        ParamSchema::Object {
            description: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn array(items: ParamSchema) -> Self {
        ParamSchema::Array {
            description: None,
            items: Box::new(items),
        }
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParamSchema::Enum {
            description: None,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn string() -> Self {
        ParamSchema::String { description: None }
    }

    pub fn integer() -> Self {
        ParamSchema::Integer {
            description: None,
            minimum: None,
            maximum: None,
        }
    }

    pub fn number() -> Self {
        ParamSchema::Number {
            description: None,
            minimum: None,
            maximum: None,
        }
    }

    pub fn boolean() -> Self {
        ParamSchema::Boolean { description: None }
    }

    /// Set the description on any node.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        let slot = match &mut self {
            ParamSchema::Object { description, .. }
            | ParamSchema::Array { description, .. }
            | ParamSchema::Enum { description, .. }
            | ParamSchema::String { description }
            | ParamSchema::Integer { description, .. }
            | ParamSchema::Number { description, .. }
            | ParamSchema::Boolean { description } => description,
        };
        *slot = Some(text.into());
        self
    }

    /// Add a property to an object node. No-op on other node kinds.
    pub fn property(mut self, name: &str, schema: ParamSchema, is_required: bool) -> Self {
        if let ParamSchema::Object {
            properties,
            required,
            ..
        } = &mut self
        {
            properties.insert(name.to_string(), schema);
            if is_required && !required.iter().any(|r| r == name) {
                required.push(name.to_string());
            }
        }
        self
    }

    /// Inclusive integer bounds. No-op on non-integer nodes.
    pub fn int_range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        if let ParamSchema::Integer {
            minimum, maximum, ..
        } = &mut self
        {
            *minimum = min;
            *maximum = max;
        }
        self
    }

    /// Inclusive number bounds. No-op on non-number nodes.
    pub fn num_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        if let ParamSchema::Number {
            minimum, maximum, ..
        } = &mut self
        {
            *minimum = min;
            *maximum = max;
        }
        self
    }

    /// Render as a JSON Schema document.
    pub fn to_json_schema(&self) -> Value {
        let (mut doc, description) = match self {
            ParamSchema::Object {
                description,
                properties,
                required,
            } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
                    .collect();
                (
                    json!({
                        "type": "object",
                        "properties": props,
                        "required": required,
                        "additionalProperties": false,
                    }),
                    description,
                )
            }
            ParamSchema::Array { description, items } => (
                json!({ "type": "array", "items": items.to_json_schema() }),
                description,
            ),
            ParamSchema::Enum {
                description,
                values,
            } => (json!({ "type": "string", "enum": values }), description),
            ParamSchema::String { description } => (json!({ "type": "string" }), description),
            ParamSchema::Integer {
                description,
                minimum,
                maximum,
            } => {
                let mut doc = json!({ "type": "integer" });
                if let Some(min) = minimum {
                    doc["minimum"] = json!(min);
                }
                if let Some(max) = maximum {
                    doc["maximum"] = json!(max);
                }
                (doc, description)
            }
            ParamSchema::Number {
                description,
                minimum,
                maximum,
            } => {
                let mut doc = json!({ "type": "number" });
                if let Some(min) = minimum {
                    doc["minimum"] = json!(min);
                }
                if let Some(max) = maximum {
                    doc["maximum"] = json!(max);
                }
                (doc, description)
            }
            ParamSchema::Boolean { description } => (json!({ "type": "boolean" }), description),
        };
        if let Some(text) = description {
            doc["description"] = json!(text);
        }
        doc
    }

    /// Check `value` against this schema, collecting every violation.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<SchemaViolation>> {
        let mut violations = Vec::new();
        self.check("$", value, &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn check(&self, path: &str, value: &Value, out: &mut Vec<SchemaViolation>) {
        let mut fail = |message: String| {
            out.push(SchemaViolation {
                path: path.to_string(),
                message,
            })
        };
        match self {
            ParamSchema::Object {
                properties,
                required,
                ..
            } => {
                let Some(map) = value.as_object() else {
                    fail(format!("expected object, got {}", kind_of(value)));
                    return;
                };
                for name in required {
                    if !map.contains_key(name) {
                        out.push(SchemaViolation {
                            path: format!("{}.{}", path, name),
                            message: "required property is missing".to_string(),
                        });
                    }
                }
                for (name, field) in map {
                    let field_path = format!("{}.{}", path, name);
                    match properties.get(name) {
                        Some(schema) => schema.check(&field_path, field, out),
                        None => out.push(SchemaViolation {
                            path: field_path,
                            message: "unknown property".to_string(),
                        }),
                    }
                }
            }
            ParamSchema::Array { items, .. } => {
                let Some(elements) = value.as_array() else {
                    fail(format!("expected array, got {}", kind_of(value)));
                    return;
                };
                for (i, element) in elements.iter().enumerate() {
                    items.check(&format!("{}[{}]", path, i), element, out);
                }
            }
            ParamSchema::Enum { values, .. } => match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => {}
                Some(s) => fail(format!(
                    "'{}' is not one of [{}]",
                    s,
                    values.join(", ")
                )),
                None => fail(format!("expected string, got {}", kind_of(value))),
            },
            ParamSchema::String { .. } => {
                if !value.is_string() {
                    fail(format!("expected string, got {}", kind_of(value)));
                }
            }
            ParamSchema::Integer {
                minimum, maximum, ..
            } => match value.as_i64() {
                Some(n) => {
                    if minimum.is_some_and(|min| n < min) {
                        fail(format!("{} is below minimum {}", n, minimum.unwrap_or_default()));
                    }
                    if maximum.is_some_and(|max| n > max) {
                        fail(format!("{} is above maximum {}", n, maximum.unwrap_or_default()));
                    }
                }
                None => fail(format!("expected integer, got {}", kind_of(value))),
            },
            ParamSchema::Number {
                minimum, maximum, ..
            } => match value.as_f64() {
                Some(n) => {
                    if minimum.is_some_and(|min| n < min) {
                        fail(format!("{} is below minimum {}", n, minimum.unwrap_or_default()));
                    }
                    if maximum.is_some_and(|max| n > max) {
                        fail(format!("{} is above maximum {}", n, maximum.unwrap_or_default()));
                    }
                }
                None => fail(format!("expected number, got {}", kind_of(value))),
            },
            ParamSchema::Boolean { .. } => {
                if !value.is_boolean() {
                    fail(format!("expected boolean, got {}", kind_of(value)));
                }
            }
        }
    }
}

/// Serializes as the rendered JSON Schema document.
impl Serialize for ParamSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_schema().serialize(serializer)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
