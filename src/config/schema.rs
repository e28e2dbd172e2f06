//! Configuration schema definitions.
//!
//! This module defines the complete deployment declaration: the bucket,
//! the handlers, the routes that bind them, and the integration mode.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grants::GrantOverride;
use crate::integration::IntegrationMode;

/// Root configuration for one deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Stack name, used as the root of every logical id.
    pub stack: String,

    /// Integration mode applied to every method.
    pub integration: IntegrationMode,

    /// The single storage bucket.
    pub bucket: BucketConfig,

    /// Routing surface settings.
    pub api: ApiConfig,

    /// Compute handlers available to routes.
    pub handlers: Vec<HandlerConfig>,

    /// Top-level route declarations.
    pub routes: Vec<RouteConfig>,

    /// Manual grants on top of the route-derived ones.
    pub grant_overrides: Vec<GrantOverride>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            stack: "cms-stack".to_string(),
            integration: IntegrationMode::default(),
            bucket: BucketConfig::default(),
            api: ApiConfig::default(),
            handlers: Vec::new(),
            routes: Vec::new(),
            grant_overrides: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Storage bucket configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BucketConfig {
    /// Prefix of the generated bucket id.
    pub prefix: String,

    /// Fixed physical bucket name. Generated by the provider when absent.
    pub name: Option<String>,

    /// Policy flags.
    pub policy: BucketPolicy,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            prefix: "cms-images".to_string(),
            name: None,
            policy: BucketPolicy::default(),
        }
    }
}

/// Bucket policy flags. Defaults are the locked-down profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BucketPolicy {
    /// Block every form of public access.
    pub block_public_access: bool,

    /// Server-side encryption.
    pub encryption: Encryption,

    /// Deny requests that do not use TLS.
    pub enforce_ssl: bool,

    /// Keep object versions.
    pub versioned: bool,

    /// What happens to the bucket when the deployment is torn down.
    pub removal: RemovalPolicy,
}

impl Default for BucketPolicy {
    fn default() -> Self {
        Self {
            block_public_access: true,
            encryption: Encryption::S3Managed,
            enforce_ssl: true,
            versioned: false,
            removal: RemovalPolicy::Destroy,
        }
    }
}

/// Server-side encryption mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encryption {
    S3Managed,
    KmsManaged,
}

/// Teardown behavior of the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    Destroy,
    Retain,
}

/// Routing surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Surface name.
    pub name: String,

    /// Deployment stage name.
    pub stage: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            name: "cms-api-gateway".to_string(),
            stage: "prod".to_string(),
        }
    }
}

/// Compute handler declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HandlerConfig {
    /// Unique handler name (also the function name).
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Invocation timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Static environment variables.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Enable active tracing.
    #[serde(default)]
    pub tracing: bool,

    #[serde(default)]
    pub architecture: Architecture,

    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Path to the packaged handler artifact.
    #[serde(default)]
    pub code_asset: Option<String>,

    /// Environment variable that receives the bucket reference. Empty disables it.
    #[serde(default = "default_bucket_env")]
    pub bucket_env: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_runtime() -> String {
    "provided.al2".to_string()
}

fn default_bucket_env() -> String {
    "BUCKET_NAME".to_string()
}

/// Instruction set of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    #[default]
    X86_64,
    Arm64,
}

impl Architecture {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
        }
    }
}

/// Route declaration. Top-level routes name a handler; children may.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path segment name.
    pub name: String,

    /// HTTP verbs, e.g. `["GET", "PUT"]`.
    pub methods: Vec<String>,

    /// Handler bound to this route.
    #[serde(default)]
    pub handler: Option<String>,

    /// Optional child route.
    #[serde(default)]
    pub child: Option<Box<RouteConfig>>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
