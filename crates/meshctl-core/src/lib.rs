//! meshctl-core
//!
//! Pure domain types for the install pipeline: the install spec, typed
//! `--set` overlays, revision naming and validation.
//! No cluster or filesystem dependency; this is the shared vocabulary of
//! the meshctl crates.

pub mod config;
pub mod error;
pub mod overlay;
pub mod revision;
pub mod spec;
pub mod tree;
pub mod validation;

pub use crate::config::ResolvedConfig;
pub use crate::error::CoreError;
pub use crate::overlay::{FieldPath, OverlayList, ScalarValue, SetOverlay};
pub use crate::revision::installed_state_name;
pub use crate::spec::{ComponentSpec, InstallSpec};
pub use crate::validation::ValidationIssue;
