//! Rollout error definitions.

use std::path::PathBuf;

use thiserror::Error;

use crate::patch::PatchError;

/// Errors that abort a rollout. Nothing is written once one occurs.
#[derive(Debug, Error)]
pub enum RolloutError {
    /// The version tag is empty.
    #[error("version tag must not be empty")]
    EmptyTag,

    /// A dirty unit is not present in the configuration.
    #[error("unit {0:?} is not configured")]
    UnknownUnit(String),

    /// A unit has no resolvable image repository.
    #[error("unit {0:?} has no image repository")]
    MissingImage(String),

    /// A unit's manifest path is absolute or leaves the repository.
    #[error("unit {unit:?} has invalid manifest path {manifest:?}")]
    InvalidManifest { unit: String, manifest: String },

    /// Reading or writing a manifest failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest could not be read into the structural model.
    #[error("manifest {}: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: PatchError,
    },

    /// A unit's patch failed.
    #[error("unit {unit:?} ({}): {source}", path.display())]
    Patch {
        unit: String,
        path: PathBuf,
        #[source]
        source: PatchError,
    },

    /// A worker task panicked or was cancelled.
    #[error("rollout task failed: {0}")]
    Task(String),
}
