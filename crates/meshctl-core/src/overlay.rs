use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::spec::STRING_FIELDS;

/// A dotted path into the install spec, e.g. `values.grafana.enabled`.
///
/// A literal dot inside a segment is written `\.`, so
/// `values.annotations.container\.apparmor` has three segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'.') => {
                    current.push('.');
                    chars.next();
                }
                '.' => segments.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        segments.push(current);

        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(CoreError::InvalidPath {
                path: raw.to_string(),
                reason: "empty path segment".into(),
            });
        }

        Ok(Self(segments.into_iter().map(|s| s.trim().to_string()).collect()))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// First segment: the top-level field this path writes into.
    pub fn root(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    /// True for paths whose value is always text: the top-level string
    /// fields and `components.<name>.namespace`.
    pub fn targets_string_field(&self) -> bool {
        match self.0.as_slice() {
            [field] => STRING_FIELDS.contains(&field.as_str()),
            [components, _, field] => components.as_str() == "components" && field.as_str() == "namespace",
            _ => false,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let escaped: Vec<String> = self.0.iter().map(|s| s.replace('.', "\\.")).collect();
        write!(f, "{}", escaped.join("."))
    }
}

/// Scalar assigned by an overlay. Inferred from the raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    pub fn infer(raw: &str) -> Self {
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Int(i);
        }
        // Only accept plain decimal floats; "inf" and "NaN" stay strings.
        if raw.contains('.') && raw.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
            if let Ok(f) = raw.parse::<f64>() {
                return Self::Float(f);
            }
        }
        Self::String(raw.to_string())
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

/// One `path=value` assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetOverlay {
    pub path: FieldPath,
    pub value: ScalarValue,
}

impl SetOverlay {
    /// Parse `path=value`. Only the first `=` separates, so values may
    /// contain `=` themselves.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let (path, value) = input.split_once('=').ok_or_else(|| CoreError::InvalidOverlay {
            input: input.to_string(),
            reason: "expected path=value".into(),
        })?;

        let path = FieldPath::parse(path).map_err(|e| CoreError::InvalidOverlay {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

        let value = if path.targets_string_field() {
            ScalarValue::String(value.trim().to_string())
        } else {
            ScalarValue::infer(value.trim())
        };
        Ok(Self { path, value })
    }
}

/// Ordered overlays. Later entries win over earlier ones at the same path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayList(Vec<SetOverlay>);

impl OverlayList {
    pub fn parse_all<S: AsRef<str>>(inputs: &[S]) -> Result<Self, CoreError> {
        inputs
            .iter()
            .map(|s| SetOverlay::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn push(&mut self, overlay: SetOverlay) {
        self.0.push(overlay);
    }

    pub fn iter(&self) -> impl Iterator<Item = &SetOverlay> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of the last overlay assigning exactly `path`, if any.
    pub fn last_value_at(&self, path: &str) -> Option<&ScalarValue> {
        self.0
            .iter()
            .rev()
            .find(|o| o.path.segments().len() == 1 && o.path.root() == path)
            .map(|o| &o.value)
    }

    /// Write every overlay into `tree` in order.
    pub fn apply_to(&self, tree: &mut Value) {
        for overlay in &self.0 {
            crate::tree::set_path(tree, &overlay.path, overlay.value.to_json());
        }
    }
}
