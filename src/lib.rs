//! Selective deploy library.
//!
//! Change detection and image-reference patching for monorepos deployed
//! through GitOps.

pub mod config;
pub mod detect;
pub mod observability;
pub mod patch;
pub mod rollout;

pub use config::DeployConfig;
pub use detect::{detect, detect_all, Detector, DirtySet, Unit};
pub use patch::{patch, PatchError, PatchTarget, StructuredDocument};
