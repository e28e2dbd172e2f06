//! Grant resolution.
//!
//! # Responsibilities
//! - Reduce (handler, verb) pairs to one level per handler
//! - Merge manual overrides without ever lowering a level
//! - Reject contradictory overrides

use std::collections::BTreeMap;

use crate::error::{CompositionError, CompositionResult};
use crate::grants::{GrantLevel, GrantMap, GrantOverride, GrantRequirement};
use crate::provision::{HandlerCatalog, HandlerRef};
use crate::routing::HttpMethod;

/// Level a single verb requires on the bucket.
pub fn required_level(method: HttpMethod) -> GrantLevel {
    if method.is_mutating() {
        GrantLevel::ReadWrite
    } else {
        GrantLevel::Read
    }
}

/// Reduce realized (handler, verb) pairs to the minimal grant per handler.
///
/// Handlers absent from `pairs` are absent from the result.
pub fn resolve_grants<'a, I>(pairs: I) -> GrantMap
where
    I: IntoIterator<Item = &'a (HandlerRef, HttpMethod)>,
{
    let mut grants = GrantMap::new();
    for (handler, method) in pairs {
        let candidate = required_level(*method);
        let entry = grants
            .entry(handler.name.clone())
            .or_insert_with(|| GrantRequirement {
                handler: handler.clone(),
                level: GrantLevel::None,
            });
        entry.level = entry.level.max(candidate);
    }
    grants
}

/// Resolve grants and fold in manual overrides.
///
/// An override raises a handler to at least its level. Two overrides for the
/// same handler with different levels fail with `AmbiguousGrant`.
pub fn resolve_with_overrides<'a, I, C>(
    pairs: I,
    overrides: &[GrantOverride],
    catalog: &C,
) -> CompositionResult<GrantMap>
where
    I: IntoIterator<Item = &'a (HandlerRef, HttpMethod)>,
    C: HandlerCatalog + ?Sized,
{
    let mut grants = resolve_grants(pairs);

    let mut requested: BTreeMap<&str, GrantLevel> = BTreeMap::new();
    for o in overrides {
        match requested.get(o.handler.as_str()) {
            Some(&first) if first != o.level => {
                return Err(CompositionError::AmbiguousGrant {
                    handler: o.handler.clone(),
                    first,
                    second: o.level,
                });
            }
            Some(_) => {}
            None => {
                requested.insert(o.handler.as_str(), o.level);
            }
        }
    }

    for (name, level) in requested {
        let handler = catalog
            .resolve(name)
            .ok_or_else(|| CompositionError::UnknownHandler {
                route: "grant override".to_string(),
                handler: name.to_string(),
            })?;
        // A `none` override on an unrouted handler keeps it out of the map.
        if level == GrantLevel::None && !grants.contains_key(name) {
            continue;
        }
        let entry = grants
            .entry(name.to_string())
            .or_insert_with(|| GrantRequirement {
                handler,
                level: GrantLevel::None,
            });
        if level > entry.level {
            tracing::debug!(handler = %name, from = %entry.level, to = %level, "Grant raised by override");
        }
        entry.level = entry.level.max(level);
    }

    Ok(grants)
}
