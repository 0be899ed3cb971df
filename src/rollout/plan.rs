//! Rollout planning.
//!
//! # Responsibilities
//! - Turn a dirty set and a version tag into concrete patches
//! - Group patches by manifest so one document is never patched twice
//!   concurrently
//!
//! # Design Decisions
//! - The tag is an explicit argument (e.g. the commit hash), never read
//!   from the environment
//! - Planning is pure: no filesystem access

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::DeployConfig;
use crate::detect::DirtySet;
use crate::patch::PatchTarget;
use crate::rollout::types::RolloutError;

/// One value to write for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPatch {
    pub unit: String,
    pub target: PatchTarget,
    pub value: String,
}

/// Every patch that touches one manifest, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPlan {
    pub path: PathBuf,
    pub patches: Vec<PlannedPatch>,
}

impl DocumentPlan {
    /// Units contributing patches to this document, without repeats.
    pub fn units(&self) -> Vec<String> {
        let mut units: Vec<String> = Vec::new();
        for patch in &self.patches {
            if !units.contains(&patch.unit) {
                units.push(patch.unit.clone());
            }
        }
        units
    }
}

/// Full set of document updates for one rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutPlan {
    pub tag: String,
    pub units: DirtySet,
    pub documents: Vec<DocumentPlan>,
}

impl RolloutPlan {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Build the patches needed to point every dirty unit at `tag`.
///
/// Manifest paths are resolved against `root`.
pub fn plan_rollout(
    config: &DeployConfig,
    dirty: &DirtySet,
    tag: &str,
    root: &Path,
) -> Result<RolloutPlan, RolloutError> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(RolloutError::EmptyTag);
    }

    let mut documents: BTreeMap<PathBuf, Vec<PlannedPatch>> = BTreeMap::new();

    for name in dirty {
        let unit = config
            .unit(name)
            .ok_or_else(|| RolloutError::UnknownUnit(name.clone()))?;
        let repository = unit
            .image_repository(&config.registry)
            .ok_or_else(|| RolloutError::MissingImage(name.clone()))?;

        let relative = unit
            .manifest_path()
            .ok_or_else(|| RolloutError::InvalidManifest {
                unit: name.clone(),
                manifest: unit.manifest.clone(),
            })?;
        let path = root.join(relative);
        let patches = documents.entry(path.clone()).or_default();
        if patches.iter().any(|p| p.unit != *name) {
            tracing::warn!(
                unit = %name,
                path = %path.display(),
                "Manifest shared with another unit; later patches overwrite earlier ones"
            );
        }

        match config.patch.tag_target() {
            Some(tag_target) => {
                patches.push(PlannedPatch {
                    unit: name.clone(),
                    target: config.patch.repository_target(),
                    value: repository,
                });
                patches.push(PlannedPatch {
                    unit: name.clone(),
                    target: tag_target,
                    value: tag.to_string(),
                });
            }
            None => patches.push(PlannedPatch {
                unit: name.clone(),
                target: config.patch.repository_target(),
                value: format!("{repository}:{tag}"),
            }),
        }
    }

    let documents = documents
        .into_iter()
        .map(|(path, patches)| DocumentPlan { path, patches })
        .collect::<Vec<_>>();

    tracing::info!(
        tag = %tag,
        units = dirty.len(),
        documents = documents.len(),
        "Rollout planned"
    );

    Ok(RolloutPlan {
        tag: tag.to_string(),
        units: dirty.clone(),
        documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn config(extra: &str) -> DeployConfig {
        parse_config(&format!(
            r#"
[registry]
base = "1234.dkr.ecr.eu-west-1.amazonaws.com"
{extra}

[[units]]
name = "ui"
path_prefix = "src/ui"
manifest = "charts/ui/values.yaml"

[[units]]
name = "cart"
path_prefix = "src/cart"
manifest = "charts/cart/values.yaml"
"#
        ))
        .unwrap()
    }

    fn dirty(names: &[&str]) -> DirtySet {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_repository_and_tag_patches() {
        let root = Path::new("/repo");
        let plan = plan_rollout(&config(""), &dirty(&["ui"]), "a1b2c3d", root).unwrap();

        assert_eq!(plan.documents.len(), 1);
        let doc = &plan.documents[0];
        assert_eq!(doc.path, PathBuf::from("/repo/charts/ui/values.yaml"));
        assert_eq!(
            doc.patches,
            vec![
                PlannedPatch {
                    unit: "ui".into(),
                    target: PatchTarget::first("image", "repository"),
                    value: "1234.dkr.ecr.eu-west-1.amazonaws.com/ui".into(),
                },
                PlannedPatch {
                    unit: "ui".into(),
                    target: PatchTarget::first("image", "tag"),
                    value: "a1b2c3d".into(),
                },
            ]
        );
    }

    #[test]
    fn test_embedded_tag() {
        let plan = plan_rollout(
            &config("[patch]\ntag_field = \"\""),
            &dirty(&["cart"]),
            "v2",
            Path::new("."),
        )
        .unwrap();

        let patches = &plan.documents[0].patches;
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].value, "1234.dkr.ecr.eu-west-1.amazonaws.com/cart:v2");
    }

    #[test]
    fn test_empty_dirty_set() {
        let plan = plan_rollout(&config(""), &DirtySet::new(), "v1", Path::new(".")).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_rejects_unknown_unit_and_empty_tag() {
        let root = Path::new(".");
        let err = plan_rollout(&config(""), &dirty(&["payments"]), "v1", root).unwrap_err();
        assert!(matches!(err, RolloutError::UnknownUnit(name) if name == "payments"));

        let err = plan_rollout(&config(""), &dirty(&["ui"]), "  ", root).unwrap_err();
        assert!(matches!(err, RolloutError::EmptyTag));
    }

    #[test]
    fn test_shared_manifest_is_one_document() {
        let config = parse_config(
            r#"
[registry]
base = "registry.local"

[[units]]
name = "web"
path_prefix = "src/web"
manifest = "charts/shared/values.yaml"

[[units]]
name = "api"
path_prefix = "src/api"
manifest = "./charts//shared/values.yaml"
"#,
        )
        .unwrap();

        let dirty = dirty(&["web", "api"]);
        let plan = plan_rollout(&config, &dirty, "v5", Path::new("/repo")).unwrap();

        assert_eq!(plan.documents.len(), 1);
        let doc = &plan.documents[0];
        assert_eq!(doc.path, PathBuf::from("/repo/charts/shared/values.yaml"));
        assert_eq!(doc.units(), vec!["api".to_string(), "web".to_string()]);

        let patches: Vec<(&str, String, &str)> = doc
            .patches
            .iter()
            .map(|p| (p.unit.as_str(), p.target.to_string(), p.value.as_str()))
            .collect();
        assert_eq!(
            patches,
            vec![
                ("api", "image[0].repository".to_string(), "registry.local/api"),
                ("api", "image[0].tag".to_string(), "v5"),
                ("web", "image[0].repository".to_string(), "registry.local/web"),
                ("web", "image[0].tag".to_string(), "v5"),
            ]
        );
    }

    #[test]
    fn test_rejects_manifest_outside_repository() {
        let mut config = config("");
        config.units[0].manifest = "/etc/passwd".to_string();

        let err = plan_rollout(&config, &dirty(&["ui"]), "v1", Path::new("/repo")).unwrap_err();
        assert!(matches!(err, RolloutError::InvalidManifest { ref unit, .. } if unit == "ui"));
    }
}
