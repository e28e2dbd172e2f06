//! Realized routing surface.
//!
//! The surface is write-once: the materializer builds it in a single pass
//! and everything downstream only reads it.

use crate::integration::MethodIntegration;
use crate::provision::HandlerRef;
use crate::routing::HttpMethod;

/// A routing surface: the root plus its path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingSurface {
    /// Surface identifier (the API name).
    pub id: String,
    /// Segments in registration order.
    pub bindings: Vec<RouteBinding>,
}

/// One path segment and the methods registered on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBinding {
    /// Segment name as it appears in the path.
    pub path_part: String,
    /// Full path from the root, e.g. `/resources`.
    pub path: String,
    pub methods: Vec<MethodBinding>,
}

/// A method on a segment wired to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBinding {
    pub method: HttpMethod,
    pub handler: HandlerRef,
    pub integration: MethodIntegration,
}

impl RoutingSurface {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bindings: Vec::new(),
        }
    }

    /// Look up a segment by its full path.
    pub fn binding(&self, path: &str) -> Option<&RouteBinding> {
        self.bindings.iter().find(|b| b.path == path)
    }

    /// Total number of registered methods across all segments.
    pub fn method_count(&self) -> usize {
        self.bindings.iter().map(|b| b.methods.len()).sum()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.path.as_str())
    }
}

impl RouteBinding {
    pub fn verbs(&self) -> Vec<HttpMethod> {
        self.methods.iter().map(|m| m.method).collect()
    }
}
