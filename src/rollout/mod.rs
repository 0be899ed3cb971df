//! Rollout subsystem.
//!
//! # Data Flow
//! ```text
//! DirtySet + version tag
//!     → plan.rs (PlannedPatch per unit, grouped by manifest)
//!     → executor.rs (one blocking task per manifest, bounded)
//!         → patch::patch per planned value, in order
//!     → all succeeded? write atomically : write nothing
//! ```
//!
//! # Design Decisions
//! - Single writer per document; different documents in parallel
//! - No retries: a failure surfaces to the operator
//! - Committing to version control is left to the CI job

pub mod executor;
pub mod plan;
pub mod types;

pub use executor::{
    apply_document, commit, execute, run, PatchedDocument, RolloutReport,
    write_atomic,
};
pub use plan::{plan_rollout, DocumentPlan, PlannedPatch, RolloutPlan};
pub use types::RolloutError;
