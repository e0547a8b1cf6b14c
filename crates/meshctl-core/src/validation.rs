//! Shape and semantic checks on the merged config tree.
//!
//! Validation never stops at the first problem: every issue is collected and
//! the offending field is removed from the returned tree, so a forced run can
//! continue with the remaining, well-formed values.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::revision::validate_revision;
use crate::spec::{KNOWN_COMPONENTS, SPEC_FIELDS, STRING_FIELDS};

/// A single problem found in the merged configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending field, e.g. `components.pilot.replicas`.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Result of validating a tree: the cleaned tree plus everything removed.
#[derive(Debug, Clone)]
pub struct Validated {
    pub tree: Value,
    pub issues: Vec<ValidationIssue>,
}

const MAP_FIELDS: &[&str] = &["meshConfig", "values"];

pub fn validate(tree: Value) -> Validated {
    let mut issues = Vec::new();

    let mut root = match tree {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            issues.push(ValidationIssue::new("spec", format!("expected a map, got {}", kind_of(&other))));
            Map::new()
        }
    };

    root.retain(|key, value| {
        if !SPEC_FIELDS.contains(&key.as_str()) {
            issues.push(ValidationIssue::new(key.as_str(), "unknown field"));
            return false;
        }
        if STRING_FIELDS.contains(&key.as_str()) {
            if let Some(text) = scalar_text(value) {
                *value = Value::String(text);
            }
        }
        if STRING_FIELDS.contains(&key.as_str()) && !value.is_string() {
            issues.push(ValidationIssue::new(
                key.as_str(),
                format!("expected a string, got {}", kind_of(value)),
            ));
            return false;
        }
        if MAP_FIELDS.contains(&key.as_str()) && !value.is_object() {
            issues.push(ValidationIssue::new(
                key.as_str(),
                format!("expected a map, got {}", kind_of(value)),
            ));
            return false;
        }
        true
    });

    let bad_revision = match root.get("revision") {
        Some(Value::String(revision)) => validate_revision(revision).err(),
        _ => None,
    };
    if let Some(e) = bad_revision {
        issues.push(ValidationIssue::new("revision", e.to_string()));
        root.remove("revision");
    }

    if let Some(components) = root.remove("components") {
        match components {
            Value::Object(map) => {
                let cleaned = validate_components(map, &mut issues);
                root.insert("components".into(), Value::Object(cleaned));
            }
            other => issues.push(ValidationIssue::new(
                "components",
                format!("expected a map, got {}", kind_of(&other)),
            )),
        }
    }

    Validated {
        tree: Value::Object(root),
        issues,
    }
}

fn validate_components(
    components: Map<String, Value>,
    issues: &mut Vec<ValidationIssue>,
) -> Map<String, Value> {
    let mut cleaned = Map::new();

    for (name, component) in components {
        let path = format!("components.{name}");
        if !KNOWN_COMPONENTS.contains(&name.as_str()) {
            issues.push(ValidationIssue::new(path, "unknown component"));
            continue;
        }
        let mut fields = match component {
            Value::Object(fields) => fields,
            other => {
                issues.push(ValidationIssue::new(
                    path,
                    format!("expected a map, got {}", kind_of(&other)),
                ));
                continue;
            }
        };

        fields.retain(|field, value| {
            let field_path = format!("{path}.{field}");
            let ok = match field.as_str() {
                "enabled" => value.is_boolean(),
                "replicas" => value.as_u64().is_some_and(|n| u32::try_from(n).is_ok()),
                "namespace" => value.is_string(),
                _ => {
                    issues.push(ValidationIssue::new(field_path, "unknown field"));
                    return false;
                }
            };
            if !ok {
                issues.push(ValidationIssue::new(
                    field_path,
                    format!("unexpected {}", kind_of(value)),
                ));
            }
            ok
        });

        let enabled = fields.get("enabled").and_then(Value::as_bool).unwrap_or(false);
        let zero_replicas = fields.get("replicas").and_then(Value::as_u64) == Some(0);
        if enabled && zero_replicas {
            issues.push(ValidationIssue::new(
                format!("{path}.replicas"),
                "enabled component must have at least one replica",
            ));
            fields.remove("replicas");
        }

        cleaned.insert(name, Value::Object(fields));
    }

    cleaned
}

/// Numbers and bools written where text is expected, e.g. `tag: 1.6` in YAML.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
