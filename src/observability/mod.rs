//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events on stderr)
//!
//! Consumers:
//!     → CI job log (pretty or JSON)
//! ```

pub mod logging;

pub use logging::init_logging;
