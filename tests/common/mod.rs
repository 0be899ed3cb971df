//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;

/// Helm values shaped like the retail store sample charts: the service
/// image first, a dependency image further down.
pub const CATALOG_VALUES: &str = "\
replicaCount: 1

image:
  repository: public.ecr.aws/aws-containers/retail-store-sample-catalog
  pullPolicy: IfNotPresent
  # Overrides the image tag whose default is the chart appVersion.
  tag: \"1.2.1\"

mysql:
  create: true
  image:
    repository: public.ecr.aws/docker/library/mysql
    tag: \"8.0\"
";

pub const UI_VALUES: &str = "\
image:
  repository: public.ecr.aws/aws-containers/retail-store-sample-ui
  tag: \"1.2.1\"
endpoints:
  catalog: http://catalog:80
";

pub const DEPLOY_TOML: &str = r#"
[registry]
base = "123456789012.dkr.ecr.us-east-1.amazonaws.com"
prefix = "retail-store-sample-"

[rollout]
max_parallel = 2

[[units]]
name = "ui"
path_prefix = "src/ui"
manifest = "charts/ui/values.yaml"

[[units]]
name = "catalog"
path_prefix = "src/catalog"
manifest = "charts/catalog/values.yaml"

[[units]]
name = "cart"
path_prefix = "src/cart"
manifest = "charts/cart/values.yaml"
"#;

/// Create a temporary repository with the given files.
pub fn write_repo(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, contents) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, contents).unwrap();
    }
    dir
}

/// Repository with the three sample charts and `deploy.toml`.
pub fn sample_repo() -> TempDir {
    write_repo(&[
        ("deploy.toml", DEPLOY_TOML),
        ("charts/ui/values.yaml", UI_VALUES),
        ("charts/catalog/values.yaml", CATALOG_VALUES),
        ("charts/cart/values.yaml", CATALOG_VALUES),
    ])
}

pub fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}
