//! Deployment composition.
//!
//! # Responsibilities
//! - Declare the bucket and handlers from configuration
//! - Turn route configs into materializer entries
//! - Run materialization, then grant resolution, on the result
//!
//! # Design Decisions
//! - Pure: no collaborator is called here
//! - Phases run in a fixed order (materialize → resolve); neither reads shared state
//! - Any error aborts the whole plan

use crate::config::schema::{DeploymentConfig, RouteConfig};
use crate::error::{CompositionError, CompositionResult};
use crate::grants::resolve_with_overrides;
use crate::provision::{BucketSpec, HandlerRegistry};
use crate::routing::{Materializer, RouteEntry, RouteSpec};
use crate::stack::plan::DeploymentPlan;

/// Compose an immutable deployment plan from configuration.
pub fn compose(config: &DeploymentConfig) -> CompositionResult<DeploymentPlan> {
    let _span = tracing::info_span!("compose", stack = %config.stack).entered();

    let bucket = BucketSpec::new(&config.stack, &config.bucket);
    let handlers = HandlerRegistry::from_config(&config.handlers);
    let entries = route_entries(&config.routes)?;

    let materialization = Materializer::new(&handlers, config.integration)
        .materialize(&config.api.name, &entries)?;

    let grants = resolve_with_overrides(&materialization.pairs, &config.grant_overrides, &handlers)?;
    tracing::info!(
        handlers = handlers.len(),
        grants = grants.len(),
        "Grants resolved"
    );

    Ok(DeploymentPlan {
        stack: config.stack.clone(),
        stage: config.api.stage.clone(),
        integration: config.integration,
        bucket,
        handlers,
        surface: materialization.surface,
        grants,
    })
}

/// Build materializer entries from route configs.
pub fn route_entries(routes: &[RouteConfig]) -> CompositionResult<Vec<RouteEntry>> {
    routes
        .iter()
        .map(|route| {
            let handler = route.handler.clone().ok_or_else(|| {
                CompositionError::invalid_route(&route.name, "no handler bound")
            })?;
            Ok(RouteEntry {
                spec: RouteSpec::from_config(route)?,
                handler,
                child_handler: route.child.as_ref().and_then(|child| child.handler.clone()),
            })
        })
        .collect()
}
