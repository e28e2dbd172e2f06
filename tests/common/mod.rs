//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use cms_stack::config::{load_config, DeploymentConfig};
use cms_stack::error::ProvisionError;
use cms_stack::grants::GrantRequirement;
use cms_stack::provision::{
    BucketId, BucketSpec, HandlerId, HandlerRef, HandlerRegistry, Provisioner,
};
use cms_stack::routing::RoutingSurface;

/// Load one of the bundled deployment profiles.
pub fn profile(name: &str) -> DeploymentConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("profiles")
        .join(format!("{name}.toml"));
    load_config(&path).unwrap()
}

/// Catalog holding handlers `H1` and `H2`.
pub fn catalog() -> HandlerRegistry {
    HandlerRegistry::from_refs([HandlerRef::new("H1"), HandlerRef::new("H2")])
}

/// A collaborator call as seen by [`RecordingProvisioner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Bucket(String),
    Handler(String),
    Surface(String),
    Grant(String, String),
}

/// Provisioner that records calls and can be told to reject one handler.
#[derive(Debug, Default)]
pub struct RecordingProvisioner {
    pub calls: Vec<Call>,
    pub reject_handler: Option<String>,
}

impl Provisioner for RecordingProvisioner {
    fn provision_bucket(&mut self, spec: &BucketSpec) -> Result<BucketId, ProvisionError> {
        self.calls.push(Call::Bucket(spec.id.clone()));
        Ok(BucketId(spec.id.clone()))
    }

    fn provision_handler(&mut self, handler: &HandlerRef, _bucket: &BucketId) -> Result<HandlerId, ProvisionError> {
        if self.reject_handler.as_deref() == Some(handler.name.as_str()) {
            return Err(ProvisionError::Rejected(format!("quota exceeded for {}", handler.name)));
        }
        self.calls.push(Call::Handler(handler.name.clone()));
        Ok(HandlerId(handler.name.clone()))
    }

    fn provision_surface(&mut self, surface: &RoutingSurface) -> Result<(), ProvisionError> {
        self.calls.push(Call::Surface(surface.id.clone()));
        Ok(())
    }

    fn apply_grant(&mut self, _bucket: &BucketId, grant: &GrantRequirement) -> Result<(), ProvisionError> {
        self.calls.push(Call::Grant(grant.handler.name.clone(), grant.level.to_string()));
        Ok(())
    }
}
