//! Error types shared across the composition engine.
//!
//! # Design Decisions
//! - Every composition error is fatal to the run; nothing here is retryable
//! - Errors carry the route or handler name so the CLI can point at the config entry
//! - Collaborator failures (`ProvisionError`) are kept apart from composition errors

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::grants::GrantLevel;

/// Errors detected while composing a deployment plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    /// Route name or method list is malformed.
    #[error("invalid route '{route}': {reason}")]
    InvalidRoute { route: String, reason: String },

    /// A child route declares a child of its own.
    #[error("route '{route}' nests deeper than one child level")]
    UnsupportedNesting { route: String },

    /// Two routes would occupy the same root-level segment.
    #[error("duplicate route '{name}'")]
    DuplicateRoute { name: String },

    /// A route references a handler the catalog does not know.
    #[error("route '{route}' references unknown handler '{handler}'")]
    UnknownHandler { route: String, handler: String },

    /// Two manual grant overrides disagree for the same handler.
    #[error("conflicting grant overrides for handler '{handler}': {first} vs {second}")]
    AmbiguousGrant {
        handler: String,
        first: GrantLevel,
        second: GrantLevel,
    },
}

impl CompositionError {
    pub(crate) fn invalid_route(route: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRoute {
            route: route.into(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by a provisioning collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    /// The bucket has not been provisioned yet.
    #[error("bucket '{0}' is not provisioned")]
    UnknownBucket(String),

    /// A grant or route targets a handler that was never provisioned.
    #[error("handler '{0}' is not provisioned")]
    UnknownHandler(String),

    /// The collaborator rejected the request.
    #[error("provisioning rejected: {0}")]
    Rejected(String),
}

/// Umbrella error for the outer surfaces (CLI, watch loop).
#[derive(Debug, Error)]
pub enum StackError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("failed to write template: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize template: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type CompositionResult<T> = Result<T, CompositionError>;
