//! Config resolution: profile → files → `--set` overlays → validated spec.

use std::path::{Path, PathBuf};

use meshctl_core::spec::DEFAULT_PROFILE;
use meshctl_core::tree::deep_merge;
use meshctl_core::validation::validate;
use meshctl_core::{InstallSpec, OverlayList, ResolvedConfig, ValidationIssue};
use serde_json::{Map, Value};

use crate::error::InstallError;
use crate::profiles;

/// Output of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: ResolvedConfig,
    /// Issues tolerated because the run was forced. Empty otherwise.
    pub warnings: Vec<ValidationIssue>,
}

/// Merges config inputs into one [`ResolvedConfig`].
///
/// Deterministic: the same files, overlays and profile directory always
/// produce the same config. Nothing here reads the clock or the environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigResolver;

impl ConfigResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        files: &[PathBuf],
        overlays: &OverlayList,
        force: bool,
    ) -> Result<Resolution, InstallError> {
        // User layers first, so the profile they select is known.
        let mut user = Value::Object(Map::new());
        for path in files {
            deep_merge(&mut user, read_spec_file(path)?);
        }
        overlays.apply_to(&mut user);

        let mut issues = Vec::new();
        let profile = match user.get("profile") {
            None => DEFAULT_PROFILE.to_string(),
            Some(Value::String(p)) if !p.is_empty() => p.clone(),
            Some(Value::String(_)) => DEFAULT_PROFILE.to_string(),
            Some(other) => {
                issues.push(ValidationIssue::new("profile", format!("expected a string, got {other}")));
                DEFAULT_PROFILE.to_string()
            }
        };
        let package = user
            .get("installPackagePath")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let (profile, mut merged) = match profiles::load(&profile, package.as_deref())? {
            Some(base) => (profile, base),
            None => {
                let known: Vec<_> = profiles::builtin_names().collect();
                issues.push(ValidationIssue::new(
                    "profile",
                    format!("unknown profile {profile:?} (known: {})", known.join(", ")),
                ));
                let base = profiles::load(DEFAULT_PROFILE, package.as_deref())?
                    .unwrap_or_else(|| Value::Object(Map::new()));
                (DEFAULT_PROFILE.to_string(), base)
            }
        };
        deep_merge(&mut merged, user);
        if let Value::Object(map) = &mut merged {
            map.insert("profile".into(), Value::String(profile.clone()));
        }

        let validated = validate(merged);
        issues.extend(validated.issues);

        if !issues.is_empty() {
            if !force {
                return Err(InstallError::Validation { issues });
            }
            for issue in &issues {
                tracing::warn!(path = %issue.path, "validation issue ignored (--force): {}", issue.message);
            }
        }

        let spec: InstallSpec =
            serde_json::from_value(validated.tree).map_err(|e| InstallError::Validation {
                issues: vec![ValidationIssue::new("spec", e.to_string())],
            })?;

        tracing::info!(
            profile = %spec.profile,
            revision = %spec.revision,
            namespace = %spec.effective_namespace(),
            warnings = issues.len(),
            "configuration resolved"
        );

        Ok(Resolution {
            config: ResolvedConfig::new(spec),
            warnings: issues,
        })
    }
}

fn read_spec_file(path: &Path) -> Result<Value, InstallError> {
    let text = std::fs::read_to_string(path).map_err(|source| InstallError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    profiles::parse_spec(&text, &path.display().to_string())
}
