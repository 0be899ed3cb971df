//! Rollout execution.
//!
//! # Responsibilities
//! - Apply each document's patches in order, in memory
//! - Run independent documents concurrently (bounded)
//! - Write results only after every document succeeded
//!
//! # Design Decisions
//! - One task per document: patches to the same file are serialized
//! - Patching is CPU-bound and synchronous, so it runs on the blocking pool
//! - First failure aborts the rollout before any write
//! - Writes are atomic per file (temp file + rename)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::patch::{patch, StructuredDocument};
use crate::rollout::plan::{DocumentPlan, RolloutPlan};
use crate::rollout::types::RolloutError;

/// A manifest with every planned patch applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedDocument {
    pub path: PathBuf,
    pub units: Vec<String>,
    pub original: String,
    pub patched: String,
}

impl PatchedDocument {
    /// False when every planned value was already in place.
    pub fn is_changed(&self) -> bool {
        self.original != self.patched
    }

    /// `(line number, old line, new line)` for every line that differs.
    pub fn changed_lines(&self) -> Vec<(usize, &str, &str)> {
        self.original
            .lines()
            .zip(self.patched.lines())
            .enumerate()
            .filter(|(_, (old, new))| old != new)
            .map(|(i, (old, new))| (i + 1, old, new))
            .collect()
    }
}

/// Read one manifest and apply its patches in order.
pub fn apply_document(plan: &DocumentPlan) -> Result<PatchedDocument, RolloutError> {
    let original = fs::read_to_string(&plan.path).map_err(|source| RolloutError::Io {
        path: plan.path.clone(),
        source,
    })?;

    let mut doc =
        StructuredDocument::parse(original.as_str()).map_err(|source| RolloutError::Document {
            path: plan.path.clone(),
            source,
        })?;

    for planned in &plan.patches {
        doc = patch(&doc, &planned.target, &planned.value).map_err(|source| RolloutError::Patch {
            unit: planned.unit.clone(),
            path: plan.path.clone(),
            source,
        })?;
        tracing::debug!(
            unit = %planned.unit,
            path = %plan.path.display(),
            target = %planned.target,
            value = %planned.value,
            "Patch applied"
        );
    }

    Ok(PatchedDocument {
        path: plan.path.clone(),
        units: plan.units(),
        original,
        patched: doc.into_string(),
    })
}

/// Apply a plan without touching the filesystem beyond reads.
///
/// At most `max_parallel` documents are processed at once. Results are
/// sorted by path.
pub async fn execute(
    plan: &RolloutPlan,
    max_parallel: usize,
) -> Result<Vec<PatchedDocument>, RolloutError> {
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut tasks: JoinSet<Result<PatchedDocument, RolloutError>> = JoinSet::new();

    for document in plan.documents.iter().cloned() {
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| RolloutError::Task(e.to_string()))?;
            tokio::task::spawn_blocking(move || apply_document(&document))
                .await
                .map_err(|e| RolloutError::Task(e.to_string()))?
        });
    }

    let mut results = Vec::with_capacity(plan.documents.len());
    while let Some(joined) = tasks.join_next().await {
        // Dropping the JoinSet on error aborts the remaining tasks.
        let document = joined.map_err(|e| RolloutError::Task(e.to_string()))??;
        results.push(document);
    }

    results.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(results)
}

/// Write every changed document. Returns the number of files written.
pub fn commit(documents: &[PatchedDocument]) -> Result<usize, RolloutError> {
    let mut written = 0;
    for document in documents.iter().filter(|d| d.is_changed()) {
        write_atomic(&document.path, &document.patched).map_err(|source| RolloutError::Io {
            path: document.path.clone(),
            source,
        })?;
        tracing::info!(
            path = %document.path.display(),
            units = ?document.units,
            "Manifest updated"
        );
        written += 1;
    }
    Ok(written)
}

/// Outcome of a full rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutReport {
    pub documents: Vec<PatchedDocument>,
    pub written: usize,
}

/// Execute `plan` and, unless `dry_run`, write the results.
pub async fn run(
    plan: &RolloutPlan,
    max_parallel: usize,
    dry_run: bool,
) -> Result<RolloutReport, RolloutError> {
    let documents = execute(plan, max_parallel).await?;
    let written = if dry_run { 0 } else { commit(&documents)? };

    tracing::info!(
        tag = %plan.tag,
        documents = documents.len(),
        written,
        dry_run,
        "Rollout complete"
    );
    Ok(RolloutReport { documents, written })
}

/// Replace `path` with `contents` via a temp file in the same directory.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
