//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! deploy.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DeployConfig (validated, immutable)
//!     → compiled into a Detector and a rollout plan
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All sections have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::DeployConfig;
pub use schema::PatchConfig;
pub use schema::RegistryConfig;
pub use schema::UnitConfig;
