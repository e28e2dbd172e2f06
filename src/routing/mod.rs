//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Declaration (config):
//!     RouteConfig[]
//!     → resource.rs (parse verbs, validate names and nesting)
//!     → RouteEntry (RouteSpec + handler names)
//!
//! Materialization:
//!     RouteEntry[]
//!     → materializer.rs (duplicate check, handler lookup, method registration)
//!     → surface.rs (immutable RoutingSurface)
//!     → (HandlerRef, HttpMethod) pairs for grant resolution
//! ```
//!
//! # Design Decisions
//! - Surfaces are built once and never mutated afterwards
//! - Deterministic: same entries always produce the same surface
//! - Explicit errors rather than silently dropping a route

pub mod materializer;
pub mod resource;
pub mod surface;

pub use materializer::{Materialization, Materializer, RouteEntry};
pub use resource::{HttpMethod, RouteSpec};
pub use surface::{MethodBinding, RouteBinding, RoutingSurface};
