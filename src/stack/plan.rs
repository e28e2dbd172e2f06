//! The composed deployment plan and its apply step.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ProvisionError;
use crate::grants::{GrantLevel, GrantMap};
use crate::integration::IntegrationMode;
use crate::provision::{
    BucketId, BucketSpec, HandlerId, HandlerRegistry, Provisioner, Template, TemplateSynthesizer,
};
use crate::routing::RoutingSurface;

/// Immutable output of composition, ready to hand to a provisioner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub stack: String,
    pub stage: String,
    pub integration: IntegrationMode,
    pub bucket: BucketSpec,
    /// Every declared handler, routed or not.
    pub handlers: HandlerRegistry,
    pub surface: RoutingSurface,
    pub grants: GrantMap,
}

/// Identities returned by the provisioner for an applied plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedStack {
    pub bucket: BucketId,
    pub handlers: BTreeMap<String, HandlerId>,
}

impl DeploymentPlan {
    pub fn grant_level(&self, handler: &str) -> Option<GrantLevel> {
        self.grants.get(handler).map(|g| g.level)
    }

    /// Hand the plan to a provisioner: bucket, handlers, surface, then grants.
    pub fn apply<P: Provisioner + ?Sized>(&self, provisioner: &mut P) -> Result<AppliedStack, ProvisionError> {
        let bucket = provisioner.provision_bucket(&self.bucket)?;

        let mut handlers = BTreeMap::new();
        for handler in self.handlers.iter() {
            let id = provisioner.provision_handler(handler, &bucket)?;
            handlers.insert(handler.name.clone(), id);
        }

        provisioner.provision_surface(&self.surface)?;

        for grant in self.grants.values() {
            provisioner.apply_grant(&bucket, grant)?;
        }

        tracing::info!(stack = %self.stack, handlers = handlers.len(), "Plan applied");
        Ok(AppliedStack { bucket, handlers })
    }

    /// Apply the plan to a fresh [`TemplateSynthesizer`].
    pub fn synthesize(&self) -> Result<Template, ProvisionError> {
        let mut synth = TemplateSynthesizer::new(&self.stack, &self.stage);
        self.apply(&mut synth)?;
        Ok(synth.into_template())
    }
}

impl fmt::Display for DeploymentPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "stack:   {}", self.stack)?;
        writeln!(f, "bucket:  {}", self.bucket.id)?;
        writeln!(f, "surface: {} ({:?})", self.surface.id, self.integration)?;
        for binding in &self.surface.bindings {
            for method in &binding.methods {
                writeln!(f, "  {:<7} {:<24} -> {}", method.method, binding.path, method.handler.name)?;
            }
        }
        writeln!(f, "grants:")?;
        for handler in self.handlers.iter() {
            let level = self.grant_level(&handler.name).unwrap_or_default();
            writeln!(f, "  {:<24} {}", handler.name, level)?;
        }
        Ok(())
    }
}
