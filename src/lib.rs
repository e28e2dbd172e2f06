//! Composition engine for a small storage-backed serverless deployment.
//!
//! Expands declarative routes into a routing surface bound to handlers and
//! resolves the minimal bucket grant each handler needs.

pub mod config;
pub mod error;
pub mod grants;
pub mod integration;
pub mod lifecycle;
pub mod observability;
pub mod provision;
pub mod routing;
pub mod stack;

pub use config::schema::DeploymentConfig;
pub use error::{CompositionError, ProvisionError, StackError};
pub use stack::{compose, DeploymentPlan};
