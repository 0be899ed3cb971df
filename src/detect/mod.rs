//! Change detection subsystem.
//!
//! # Data Flow
//! ```text
//! Changed paths (git diff --name-only)
//!     → changes.rs (ChangeSet: trimmed, de-duplicated)
//!     → detector.rs (unit lookup)
//!     → matcher.rs (segment prefix conditions)
//!     → Return: DirtySet (possibly empty)
//!
//! Detector Compilation (at startup):
//!     UnitConfig[]
//!     → Compile matchers (one per prefix, ANY-combined)
//!     → Freeze as immutable Detector
//! ```
//!
//! # Design Decisions
//! - Detection never fails; no match is a valid answer
//! - Deterministic: same input always yields the same set
//! - Force-all is an explicit entry point

pub mod changes;
pub mod detector;
pub mod matcher;

pub use changes::{ChangeSet, OutputFormat};
pub use detector::{detect, detect_all, Detector, DirtySet, Unit};
