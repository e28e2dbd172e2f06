//! Route tree materialization.
//!
//! # Responsibilities
//! - Validate every route entry before touching the surface
//! - Reject duplicate root segments and unresolvable handlers
//! - Register one method per declared verb, in declared order
//! - Emit the (handler, verb) pairs consumed by grant resolution
//!
//! # Design Decisions
//! - All-or-nothing: every check runs before the first segment is created
//! - A child segment is placed beside its parent under the root (`/child`),
//!   not below it
//! - Children reuse the parent's handler unless they name their own
//! - Output depends only on input, so re-materializing is safe

use std::collections::BTreeSet;

use crate::error::{CompositionError, CompositionResult};
use crate::integration::{build_integration, IntegrationMode};
use crate::provision::{HandlerCatalog, HandlerRef};
use crate::routing::resource::{HttpMethod, RouteSpec};
use crate::routing::surface::{MethodBinding, RouteBinding, RoutingSurface};

/// A top-level route bound to handler names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub spec: RouteSpec,
    pub handler: String,
    /// Handler for the child segment; falls back to `handler`.
    pub child_handler: Option<String>,
}

impl RouteEntry {
    pub fn new(spec: RouteSpec, handler: impl Into<String>) -> Self {
        Self {
            spec,
            handler: handler.into(),
            child_handler: None,
        }
    }

    pub fn with_child_handler(mut self, handler: impl Into<String>) -> Self {
        self.child_handler = Some(handler.into());
        self
    }
}

/// Result of one materialization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialization {
    pub surface: RoutingSurface,
    /// One pair per realized method, in registration order.
    pub pairs: Vec<(HandlerRef, HttpMethod)>,
}

/// Builds routing surfaces against a handler catalog.
pub struct Materializer<'a, C: HandlerCatalog + ?Sized> {
    catalog: &'a C,
    mode: IntegrationMode,
}

/// A segment that passed every check and is ready to register.
struct PlannedSegment<'s> {
    spec: &'s RouteSpec,
    handler: HandlerRef,
}

impl<'a, C: HandlerCatalog + ?Sized> Materializer<'a, C> {
    pub fn new(catalog: &'a C, mode: IntegrationMode) -> Self {
        Self { catalog, mode }
    }

    pub fn materialize(&self, surface_id: &str, entries: &[RouteEntry]) -> CompositionResult<Materialization> {
        let planned = self.plan(entries)?;

        let mut surface = RoutingSurface::new(surface_id);
        let mut pairs = Vec::new();
        for segment in planned {
            let binding = self.register(&segment, &mut pairs);
            surface.bindings.push(binding);
        }

        tracing::info!(
            surface = %surface.id,
            segments = surface.bindings.len(),
            methods = surface.method_count(),
            "Routing surface materialized"
        );

        Ok(Materialization { surface, pairs })
    }

    fn plan<'s>(&self, entries: &'s [RouteEntry]) -> CompositionResult<Vec<PlannedSegment<'s>>> {
        for entry in entries {
            entry.spec.validate()?;
        }

        let mut top_level = BTreeSet::new();
        for entry in entries {
            if !top_level.insert(entry.spec.name.as_str()) {
                return Err(CompositionError::DuplicateRoute {
                    name: entry.spec.name.clone(),
                });
            }
        }

        let mut occupied = top_level;
        for entry in entries {
            if let Some(child) = &entry.spec.child {
                if !occupied.insert(child.name.as_str()) {
                    return Err(CompositionError::DuplicateRoute {
                        name: child.name.clone(),
                    });
                }
            }
        }

        let mut planned = Vec::new();
        for entry in entries {
            let handler = self.lookup(&entry.spec.name, &entry.handler)?;
            planned.push(PlannedSegment {
                spec: &entry.spec,
                handler: handler.clone(),
            });

            if let Some(child) = &entry.spec.child {
                let child_handler = match &entry.child_handler {
                    Some(name) => self.lookup(&child.name, name)?,
                    None => handler,
                };
                planned.push(PlannedSegment {
                    spec: child,
                    handler: child_handler,
                });
            }
        }
        Ok(planned)
    }

    fn lookup(&self, route: &str, handler: &str) -> CompositionResult<HandlerRef> {
        self.catalog
            .resolve(handler)
            .ok_or_else(|| CompositionError::UnknownHandler {
                route: route.to_string(),
                handler: handler.to_string(),
            })
    }

    fn register(&self, segment: &PlannedSegment<'_>, pairs: &mut Vec<(HandlerRef, HttpMethod)>) -> RouteBinding {
        let path = format!("/{}", segment.spec.name);
        let methods = segment
            .spec
            .methods
            .iter()
            .map(|&method| {
                tracing::debug!(%path, %method, handler = %segment.handler.name, "Registering method");
                pairs.push((segment.handler.clone(), method));
                MethodBinding {
                    method,
                    handler: segment.handler.clone(),
                    integration: build_integration(self.mode, &segment.handler, method),
                }
            })
            .collect();

        RouteBinding {
            path_part: segment.spec.name.clone(),
            path,
            methods,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::HandlerRegistry;
    use HttpMethod::*;

    fn catalog() -> HandlerRegistry {
        HandlerRegistry::from_refs(["h1", "h2"].map(HandlerRef::new))
    }

    #[test]
    fn test_methods_registered_in_declared_order() {
        let catalog = catalog();
        let entries = [RouteEntry::new(RouteSpec::new("resources", [Delete, Get, Put]), "h1")];
        let out = Materializer::new(&catalog, IntegrationMode::PassThrough)
            .materialize("api", &entries)
            .unwrap();

        assert_eq!(out.surface.binding("/resources").unwrap().verbs(), vec![Delete, Get, Put]);
        let verbs: Vec<_> = out.pairs.iter().map(|(_, m)| *m).collect();
        assert_eq!(verbs, vec![Delete, Get, Put]);
    }

    #[test]
    fn test_child_is_sibling_segment() {
        let catalog = catalog();
        let spec = RouteSpec::new("resources", [Get]).with_child(RouteSpec::new("{key}", [Get, Delete]));
        let out = Materializer::new(&catalog, IntegrationMode::PassThrough)
            .materialize("api", &[RouteEntry::new(spec, "h1")])
            .unwrap();

        let paths: Vec<_> = out.surface.paths().collect();
        assert_eq!(paths, vec!["/resources", "/{key}"]);
        let child = out.surface.binding("/{key}").unwrap();
        assert!(child.methods.iter().all(|m| m.handler.name == "h1"));
        assert_eq!(out.pairs.len(), 3);
    }

    #[test]
    fn test_child_with_own_handler() {
        let catalog = catalog();
        let spec = RouteSpec::new("resources", [Get]).with_child(RouteSpec::new("upload", [Post]));
        let entry = RouteEntry::new(spec, "h1").with_child_handler("h2");
        let out = Materializer::new(&catalog, IntegrationMode::PassThrough)
            .materialize("api", &[entry])
            .unwrap();

        assert_eq!(out.surface.binding("/upload").unwrap().methods[0].handler.name, "h2");
        assert_eq!(out.pairs[1].0.name, "h2");
    }

    #[test]
    fn test_child_colliding_with_top_level() {
        let catalog = catalog();
        let entries = [
            RouteEntry::new(RouteSpec::new("a", [Get]).with_child(RouteSpec::new("b", [Get])), "h1"),
            RouteEntry::new(RouteSpec::new("b", [Put]), "h2"),
        ];
        let err = Materializer::new(&catalog, IntegrationMode::PassThrough)
            .materialize("api", &entries)
            .unwrap_err();
        assert_eq!(err, CompositionError::DuplicateRoute { name: "b".into() });
    }

    #[test]
    fn test_unknown_handler() {
        let catalog = catalog();
        let entries = [RouteEntry::new(RouteSpec::new("resources", [Get]), "missing")];
        let err = Materializer::new(&catalog, IntegrationMode::PassThrough)
            .materialize("api", &entries)
            .unwrap_err();
        assert_eq!(
            err,
            CompositionError::UnknownHandler {
                route: "resources".into(),
                handler: "missing".into(),
            }
        );
    }

    #[test]
    fn test_invalid_entry_aborts_whole_surface() {
        let catalog = catalog();
        let entries = [
            RouteEntry::new(RouteSpec::new("good", [Get]), "h1"),
            RouteEntry::new(RouteSpec::new("bad", []), "h1"),
        ];
        let result = Materializer::new(&catalog, IntegrationMode::PassThrough).materialize("api", &entries);
        assert!(matches!(result, Err(CompositionError::InvalidRoute { .. })));
    }

    #[test]
    fn test_form_encoded_mode_applies_to_every_method() {
        let catalog = catalog();
        let entries = [RouteEntry::new(RouteSpec::new("resources", [Get, Put]), "h1")];
        let out = Materializer::new(&catalog, IntegrationMode::FormEncoded)
            .materialize("api", &entries)
            .unwrap();
        for binding in &out.surface.binding("/resources").unwrap().methods {
            assert_eq!(binding.integration.integration.mode, IntegrationMode::FormEncoded);
            assert_eq!(binding.integration.method_responses.len(), 1);
        }
    }
}
