use crate::error::CoreError;

/// Prefix of the record that stores the spec used by the last apply.
pub const INSTALLED_STATE_PREFIX: &str = "installed-state";

/// Label value used where an empty revision needs a name.
pub const DEFAULT_REVISION_LABEL: &str = "default";

/// Record name for a revision: `installed-state` for the unversioned
/// install, `installed-state-<revision>` otherwise.
pub fn installed_state_name(revision: &str) -> String {
    if revision.is_empty() {
        INSTALLED_STATE_PREFIX.to_string()
    } else {
        format!("{INSTALLED_STATE_PREFIX}-{revision}")
    }
}

/// Revisions end up in object names, so they must be DNS labels.
pub fn validate_revision(revision: &str) -> Result<(), CoreError> {
    let fail = |reason: &str| CoreError::InvalidRevision {
        revision: revision.to_string(),
        reason: reason.to_string(),
    };

    if revision.is_empty() {
        return Ok(());
    }
    if revision.len() > 63 {
        return Err(fail("longer than 63 characters"));
    }
    if !revision
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(fail("only lowercase letters, digits and '-' are allowed"));
    }
    if revision.starts_with('-') || revision.ends_with('-') {
        return Err(fail("must start and end with an alphanumeric character"));
    }
    Ok(())
}

/// Value for the `meshctl.io/rev` label.
pub fn revision_label(revision: &str) -> &str {
    if revision.is_empty() {
        DEFAULT_REVISION_LABEL
    } else {
        revision
    }
}
