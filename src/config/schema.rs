//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a
//! repository's deployable units. All types derive Serde traits for
//! deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::detect::matcher::path_segments;
use crate::detect::Detector;
use crate::patch::PatchTarget;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DeployConfig {
    /// Container registry the CI pushes to.
    pub registry: RegistryConfig,

    /// Where in each manifest the image reference lives.
    pub patch: PatchConfig,

    /// Rollout execution settings.
    pub rollout: RolloutConfig,

    /// Deployable units, in registration order.
    pub units: Vec<UnitConfig>,
}

impl DeployConfig {
    /// Compile a detector covering every prefix of every unit.
    pub fn detector(&self) -> Detector {
        Detector::with_prefixes(
            self.units
                .iter()
                .map(|u| (u.name.as_str(), u.prefixes().collect::<Vec<_>>())),
        )
    }

    pub fn unit(&self, name: &str) -> Option<&UnitConfig> {
        self.units.iter().find(|u| u.name == name)
    }
}

/// Registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry host and optional namespace
    /// (e.g. "123456789012.dkr.ecr.us-east-1.amazonaws.com").
    pub base: Option<String>,

    /// Prepended to the unit name to form the repository name.
    pub prefix: String,
}

/// Patch target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Section key holding the image (e.g. "image").
    pub section: String,

    /// Field receiving the repository.
    pub repository_field: String,

    /// Field receiving the tag. Empty means the tag is appended to the
    /// repository field as `repository:tag`.
    pub tag_field: String,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            section: "image".to_string(),
            repository_field: "repository".to_string(),
            tag_field: "tag".to_string(),
        }
    }
}

impl PatchConfig {
    pub fn repository_target(&self) -> PatchTarget {
        PatchTarget::first(&self.section, &self.repository_field)
    }

    /// `None` when the tag is embedded in the repository field.
    pub fn tag_target(&self) -> Option<PatchTarget> {
        (!self.tag_field.is_empty()).then(|| PatchTarget::first(&self.section, &self.tag_field))
    }
}

/// Rollout execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RolloutConfig {
    /// Maximum number of manifests patched concurrently.
    pub max_parallel: usize,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self { max_parallel: 4 }
    }
}

/// Deployable unit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnitConfig {
    /// Unique unit identifier (used in logs and build matrices).
    pub name: String,

    /// Directory owning the unit's sources.
    pub path_prefix: String,

    /// Additional directories that also mark the unit dirty.
    #[serde(default)]
    pub extra_paths: Vec<String>,

    /// Values file to patch, relative to the repository root.
    pub manifest: String,

    /// Explicit image repository. Derived from the registry otherwise.
    #[serde(default)]
    pub image: Option<String>,
}

impl UnitConfig {
    /// Primary prefix followed by the extra ones.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.path_prefix.as_str())
            .chain(self.extra_paths.iter().map(String::as_str))
    }

    /// Manifest path relative to the repository root, with `.` segments and
    /// repeated separators removed. `None` for absolute paths, paths with a
    /// `..` segment, and empty paths.
    pub fn manifest_path(&self) -> Option<PathBuf> {
        path_segments(&self.manifest).map(|segments| segments.into_iter().collect())
    }

    /// Repository this unit's image is pushed to.
    pub fn image_repository(&self, registry: &RegistryConfig) -> Option<String> {
        if let Some(image) = &self.image {
            return Some(image.clone());
        }
        registry.base.as_ref().map(|base| {
            format!(
                "{}/{}{}",
                base.trim_end_matches('/'),
                registry.prefix,
                self.name
            )
        })
    }
}
