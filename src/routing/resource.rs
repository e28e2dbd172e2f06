//! Route declarations and their validation.
//!
//! # Responsibilities
//! - Parse HTTP verbs from configuration strings
//! - Validate segment names against the path-safe alphabet
//! - Reject nesting deeper than a single child
//!
//! # Design Decisions
//! - Validation is pure and runs before anything is materialized
//! - Verbs are an ordered set: declared order is kept, repeats are rejected
//! - Path parameters (`{id}`, `{proxy+}`) are accepted only as a whole segment

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::schema::RouteConfig;
use crate::error::{CompositionError, CompositionResult};

/// HTTP verbs a route may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }

    /// True for verbs that write to storage.
    pub fn is_mutating(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when a verb is outside {GET, PUT, POST, DELETE}.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// A declared route: one path segment, its verbs, and an optional child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub name: String,
    pub methods: Vec<HttpMethod>,
    pub child: Option<Box<RouteSpec>>,
}

impl RouteSpec {
    pub fn new(name: impl Into<String>, methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        Self {
            name: name.into(),
            methods: methods.into_iter().collect(),
            child: None,
        }
    }

    pub fn with_child(mut self, child: RouteSpec) -> Self {
        self.child = Some(Box::new(child));
        self
    }

    /// Build a route from its configuration form, parsing verbs.
    ///
    /// Unknown verbs fail with `InvalidRoute`. The result still needs
    /// [`RouteSpec::validate`].
    pub fn from_config(config: &RouteConfig) -> CompositionResult<Self> {
        let methods = parse_methods(&config.name, &config.methods)?;
        let child = match &config.child {
            Some(child) => Some(Box::new(Self::from_config(child)?)),
            None => None,
        };
        Ok(Self {
            name: config.name.clone(),
            methods,
            child,
        })
    }

    pub fn validate(&self) -> CompositionResult<()> {
        self.validate_node()?;
        if let Some(child) = &self.child {
            if child.child.is_some() {
                return Err(CompositionError::UnsupportedNesting {
                    route: format!("{}/{}", self.name, child.name),
                });
            }
            child.validate_node()?;
        }
        Ok(())
    }

    fn validate_node(&self) -> CompositionResult<()> {
        if self.name.is_empty() {
            return Err(CompositionError::invalid_route(&self.name, "name is empty"));
        }
        if !is_path_safe(&self.name) {
            return Err(CompositionError::invalid_route(
                &self.name,
                "name contains path-unsafe characters",
            ));
        }
        if self.methods.is_empty() {
            return Err(CompositionError::invalid_route(&self.name, "no methods declared"));
        }
        for (i, method) in self.methods.iter().enumerate() {
            if self.methods[..i].contains(method) {
                return Err(CompositionError::invalid_route(
                    &self.name,
                    format!("method {method} declared twice"),
                ));
            }
        }
        Ok(())
    }
}

fn parse_methods(route: &str, raw: &[String]) -> CompositionResult<Vec<HttpMethod>> {
    raw.iter()
        .map(|verb| {
            verb.parse::<HttpMethod>().map_err(|UnknownMethod(verb)| {
                CompositionError::invalid_route(route, format!("unrecognized method '{verb}'"))
            })
        })
        .collect()
}

fn is_path_safe(name: &str) -> bool {
    if let Some(inner) = name.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        let ident = inner.strip_suffix('+').unwrap_or(inner);
        return !ident.is_empty()
            && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use HttpMethod::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<HttpMethod>(), Ok(Get));
        assert_eq!(" DELETE ".parse::<HttpMethod>(), Ok(Delete));
        assert!("PATCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_valid_route_with_child() {
        let spec = RouteSpec::new("resources", [Get, Put]).with_child(RouteSpec::new("{id}", [Get]));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_empty_methods_rejected() {
        let spec = RouteSpec::new("resources", []);
        assert!(matches!(spec.validate(), Err(CompositionError::InvalidRoute { .. })));
    }

    #[test]
    fn test_unsafe_names_rejected() {
        for name in ["", "a/b", "white space", "{}", "{a-b}", "res?x"] {
            let spec = RouteSpec::new(name, [Get]);
            assert!(
                matches!(spec.validate(), Err(CompositionError::InvalidRoute { .. })),
                "{name:?} should be rejected"
            );
        }
        assert!(RouteSpec::new("{proxy+}", [Get]).validate().is_ok());
    }

    #[test]
    fn test_repeated_method_rejected() {
        let spec = RouteSpec::new("resources", [Get, Put, Get]);
        assert!(matches!(spec.validate(), Err(CompositionError::InvalidRoute { .. })));
    }

    #[test]
    fn test_grandchild_rejected() {
        let spec = RouteSpec::new("a", [Get])
            .with_child(RouteSpec::new("b", [Get]).with_child(RouteSpec::new("c", [Get])));
        assert_eq!(
            spec.validate(),
            Err(CompositionError::UnsupportedNesting { route: "a/b".into() })
        );
    }

    #[test]
    fn test_invalid_child_rejected() {
        let spec = RouteSpec::new("a", [Get]).with_child(RouteSpec::new("b", []));
        assert!(matches!(spec.validate(), Err(CompositionError::InvalidRoute { route, .. }) if route == "b"));
    }

    #[test]
    fn test_unknown_verb_from_config() {
        let config = RouteConfig {
            name: "resources".into(),
            methods: vec!["GET".into(), "PATCH".into()],
            handler: Some("h".into()),
            child: None,
        };
        let err = RouteSpec::from_config(&config).unwrap_err();
        assert!(matches!(err, CompositionError::InvalidRoute { reason, .. } if reason.contains("PATCH")));
    }
}
