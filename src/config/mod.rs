//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! deployment file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DeploymentConfig (validated, immutable)
//!     → stack::compose (declare → materialize → resolve)
//!
//! In watch mode:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → fresh plan composed from the new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes produce a new plan
//! - Most fields have defaults to allow minimal deployment files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BucketConfig, BucketPolicy, DeploymentConfig, HandlerConfig, RouteConfig};
