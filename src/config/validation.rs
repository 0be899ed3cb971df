//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check unit identity (non-empty, unique, matrix-safe names)
//! - Check prefixes are repository-relative and free of `..`
//! - Check every unit resolves to a manifest inside the repository and an
//!   image repository
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DeployConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::DeployConfig;
use crate::detect::matcher::prefix_segments;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no units configured")]
    NoUnits,

    #[error("unit #{index} has an empty name")]
    EmptyUnitName { index: usize },

    #[error("unit name {name:?} may only contain letters, digits, '.', '_' and '-'")]
    InvalidUnitName { name: String },

    #[error("unit {name:?} is defined more than once")]
    DuplicateUnit { name: String },

    #[error("unit {unit:?} has invalid path prefix {prefix:?}")]
    InvalidPathPrefix { unit: String, prefix: String },

    #[error("unit {unit:?} has no manifest")]
    MissingManifest { unit: String },

    #[error("unit {unit:?} has manifest {manifest:?} outside the repository")]
    InvalidManifest { unit: String, manifest: String },

    #[error("unit {unit:?} has no image and no registry base is configured")]
    MissingImage { unit: String },

    #[error("patch.{field} must not be empty")]
    EmptyPatchField { field: &'static str },

    #[error("rollout.max_parallel must be at least 1")]
    InvalidParallelism,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &DeployConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.units.is_empty() {
        errors.push(ValidationError::NoUnits);
    }

    let mut seen = HashSet::new();
    for (index, unit) in config.units.iter().enumerate() {
        if unit.name.is_empty() {
            errors.push(ValidationError::EmptyUnitName { index });
        } else if !is_valid_name(&unit.name) {
            errors.push(ValidationError::InvalidUnitName {
                name: unit.name.clone(),
            });
        }
        if !unit.name.is_empty() && !seen.insert(unit.name.as_str()) {
            errors.push(ValidationError::DuplicateUnit {
                name: unit.name.clone(),
            });
        }

        for prefix in unit.prefixes() {
            if prefix_segments(prefix).is_none() {
                errors.push(ValidationError::InvalidPathPrefix {
                    unit: unit.name.clone(),
                    prefix: prefix.to_string(),
                });
            }
        }

        if unit.manifest.trim().is_empty() {
            errors.push(ValidationError::MissingManifest {
                unit: unit.name.clone(),
            });
        } else if unit.manifest_path().is_none() {
            errors.push(ValidationError::InvalidManifest {
                unit: unit.name.clone(),
                manifest: unit.manifest.clone(),
            });
        }
        if unit.image_repository(&config.registry).is_none() {
            errors.push(ValidationError::MissingImage {
                unit: unit.name.clone(),
            });
        }
    }

    if config.patch.section.is_empty() {
        errors.push(ValidationError::EmptyPatchField { field: "section" });
    }
    if config.patch.repository_field.is_empty() {
        errors.push(ValidationError::EmptyPatchField {
            field: "repository_field",
        });
    }
    if config.rollout.max_parallel == 0 {
        errors.push(ValidationError::InvalidParallelism);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
