//! Deployment composition subsystem.
//!
//! # Data Flow
//! ```text
//! DeploymentConfig
//!     → composer.rs
//!         1. declare:     BucketSpec, HandlerRegistry, RouteEntry[]
//!         2. materialize: RoutingSurface + (handler, verb) pairs   (pure)
//!         3. resolve:     GrantMap                                  (pure)
//!     → plan.rs (DeploymentPlan, immutable)
//!     → DeploymentPlan::apply(Provisioner)                          (effectful)
//! ```
//!
//! # Design Decisions
//! - Composition never calls a collaborator; only `apply` does
//! - Two compositions share no state and may run side by side

pub mod composer;
pub mod plan;

pub use composer::{compose, route_entries};
pub use plan::{AppliedStack, DeploymentPlan};
