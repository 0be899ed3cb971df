//! Structured-document patching subsystem.
//!
//! # Data Flow
//! ```text
//! values.yaml text
//!     → document.rs (validate with serde_yaml, scan key structure)
//!     → patcher.rs (resolve PatchTarget → value span)
//!     → scalar.rs (render replacement in the old quoting style)
//!     → splice span, re-scan
//!     → Return: patched StructuredDocument or PatchError
//! ```
//!
//! # Design Decisions
//! - In-place span substitution: comments, ordering and whitespace survive
//! - First-occurrence tie-break protects dependency images (databases,
//!   brokers) that repeat the `image:` shape further down
//! - All-or-nothing: the caller gets a full document or an error

pub mod document;
pub mod patcher;
pub mod scalar;
pub mod types;

pub use document::StructuredDocument;
pub use patcher::{patch, patch_str};
pub use types::{PatchError, PatchTarget};
