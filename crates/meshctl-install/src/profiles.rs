//! Built-in install profiles and lookup in an install package directory.

use std::path::Path;

use serde_json::Value;

use crate::error::InstallError;

const BUILTIN: &[(&str, &str)] = &[
    ("default", include_str!("../profiles/default.yaml")),
    ("demo", include_str!("../profiles/demo.yaml")),
    ("minimal", include_str!("../profiles/minimal.yaml")),
    ("empty", include_str!("../profiles/empty.yaml")),
    ("remote", include_str!("../profiles/remote.yaml")),
];

pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}

/// Load the spec tree for `name`.
///
/// `<package>/profiles/<name>.yaml` wins over the built-in profile of the
/// same name. Returns `Ok(None)` for an unknown profile.
pub fn load(name: &str, package: Option<&Path>) -> Result<Option<Value>, InstallError> {
    if let Some(package) = package {
        if !package.is_dir() {
            return Err(InstallError::Input {
                path: package.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "install package directory does not exist",
                ),
            });
        }
        let path = package.join("profiles").join(format!("{name}.yaml"));
        if path.is_file() {
            let text = std::fs::read_to_string(&path).map_err(|source| InstallError::Input {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(profile = %name, path = %path.display(), "using profile from install package");
            return parse_spec(&text, &path.display().to_string()).map(Some);
        }
    }

    match BUILTIN.iter().find(|(n, _)| *n == name) {
        Some((_, text)) => parse_spec(text, &format!("built-in profile {name}")).map(Some),
        None => Ok(None),
    }
}

/// Parse a config document. A full document (`apiVersion`/`kind`/`spec`)
/// yields its `spec`; anything else is taken as a bare spec map.
pub fn parse_spec(text: &str, origin: &str) -> Result<Value, InstallError> {
    let document: Value = serde_yaml::from_str(text).map_err(|e| InstallError::InvalidInput {
        origin: origin.to_string(),
        reason: e.to_string(),
    })?;

    match document {
        Value::Null => Ok(Value::Object(serde_json::Map::new())),
        Value::Object(mut map) if map.contains_key("kind") || map.contains_key("apiVersion") => {
            match map.remove("spec") {
                None | Some(Value::Null) => Ok(Value::Object(serde_json::Map::new())),
                Some(spec) => Ok(spec),
            }
        }
        Value::Object(map) => Ok(Value::Object(map)),
        other => Err(InstallError::InvalidInput {
            origin: origin.to_string(),
            reason: format!("expected a map at the top level, got {other}"),
        }),
    }
}
