//! Provisioning collaborators.
//!
//! # Data Flow
//! ```text
//! DeploymentPlan (immutable)
//!     → Provisioner::provision_bucket   (BucketSpec → BucketId)
//!     → Provisioner::provision_handler  (HandlerRef → HandlerId)
//!     → Provisioner::provision_surface  (RoutingSurface)
//!     → Provisioner::apply_grant        (GrantRequirement per handler)
//!
//! template.rs implements Provisioner by rendering a deployable template.
//! ```
//!
//! # Design Decisions
//! - The core never talks to a cloud API; it only calls these traits
//! - Every collaborator call is fallible and reported as ProvisionError
//! - Handler identity is the handler name

pub mod template;

use std::collections::BTreeMap;
use std::time::Duration;

use uuid::Uuid;

use crate::config::schema::{Architecture, BucketConfig, BucketPolicy, HandlerConfig};
use crate::error::ProvisionError;
use crate::grants::GrantRequirement;
use crate::routing::RoutingSurface;

pub use template::{Template, TemplateSynthesizer};

/// A declared compute handler as the composition engine sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRef {
    pub name: String,
    pub description: Option<String>,
    pub timeout: Duration,
    pub environment: BTreeMap<String, String>,
    pub tracing: bool,
    pub architecture: Architecture,
    pub runtime: String,
    pub code_asset: Option<String>,
    /// Variable receiving the bucket reference, if any.
    pub bucket_env: Option<String>,
}

impl HandlerRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            timeout: Duration::from_secs(10),
            environment: BTreeMap::new(),
            tracing: false,
            architecture: Architecture::default(),
            runtime: "provided.al2".to_string(),
            code_asset: None,
            bucket_env: Some("BUCKET_NAME".to_string()),
        }
    }

    pub fn from_config(config: &HandlerConfig) -> Self {
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            environment: config.environment.clone(),
            tracing: config.tracing,
            architecture: config.architecture,
            runtime: config.runtime.clone(),
            code_asset: config.code_asset.clone(),
            bucket_env: Some(config.bucket_env.clone()).filter(|env| !env.is_empty()),
        }
    }
}

/// Resolves handler names to declared handlers.
pub trait HandlerCatalog {
    fn resolve(&self, name: &str) -> Option<HandlerRef>;
}

/// In-memory catalog of declared handlers, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerRegistry {
    handlers: Vec<HandlerRef>,
}

impl HandlerRegistry {
    pub fn from_refs(refs: impl IntoIterator<Item = HandlerRef>) -> Self {
        Self {
            handlers: refs.into_iter().collect(),
        }
    }

    pub fn from_config(configs: &[HandlerConfig]) -> Self {
        Self::from_refs(configs.iter().map(HandlerRef::from_config))
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandlerRef> {
        self.handlers.iter()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl HandlerCatalog for HandlerRegistry {
    fn resolve(&self, name: &str) -> Option<HandlerRef> {
        self.handlers.iter().find(|h| h.name == name).cloned()
    }
}

/// The single storage bucket of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    /// Stable id: `{prefix}-{uuid}-bucket`.
    pub id: String,
    pub bucket_name: Option<String>,
    pub policy: BucketPolicy,
}

impl BucketSpec {
    /// Derive the bucket spec for `stack`.
    ///
    /// The uuid is name-based (v5) so re-planning yields the same id.
    pub fn new(stack: &str, config: &BucketConfig) -> Self {
        let seed = format!("{stack}/{}", config.prefix);
        let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes());
        Self {
            id: format!("{}-{}-bucket", config.prefix, uuid),
            bucket_name: config.name.clone(),
            policy: config.policy,
        }
    }
}

/// Live identity of a provisioned bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId(pub String);

/// Live identity of a provisioned handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub String);

/// The external collaborator that turns a plan into resources.
pub trait Provisioner {
    fn provision_bucket(&mut self, spec: &BucketSpec) -> Result<BucketId, ProvisionError>;

    fn provision_handler(&mut self, handler: &HandlerRef, bucket: &BucketId) -> Result<HandlerId, ProvisionError>;

    fn provision_surface(&mut self, surface: &RoutingSurface) -> Result<(), ProvisionError>;

    fn apply_grant(&mut self, bucket: &BucketId, grant: &GrantRequirement) -> Result<(), ProvisionError>;
}
