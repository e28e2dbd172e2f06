//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes and overrides reference declared handlers)
//! - Validate value ranges (timeouts, name lengths)
//! - Validate bucket and handler naming rules
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DeploymentConfig → Result<(), Vec<ValidationError>>
//! - Route shape (verbs, nesting, duplicates) is left to the routing subsystem

use std::collections::BTreeSet;
use std::fmt;

use crate::config::schema::{DeploymentConfig, HandlerConfig, RouteConfig};

pub const MAX_TIMEOUT_SECS: u64 = 900;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `handlers[1].timeout_secs`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &DeploymentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.stack.is_empty() || !config.stack.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        errors.push(ValidationError::new("stack", "must be non-empty and contain only letters, digits and '-'"));
    }
    if config.api.name.trim().is_empty() {
        errors.push(ValidationError::new("api.name", "must not be empty"));
    }
    if config.api.stage.is_empty() || !config.api.stage.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        errors.push(ValidationError::new("api.stage", "must be non-empty alphanumeric"));
    }
    if config.bucket.prefix.is_empty() {
        errors.push(ValidationError::new("bucket.prefix", "must not be empty"));
    }
    if let Some(name) = &config.bucket.name {
        if let Err(message) = check_bucket_name(name) {
            errors.push(ValidationError::new("bucket.name", message));
        }
    }

    let mut declared = BTreeSet::new();
    for (i, handler) in config.handlers.iter().enumerate() {
        validate_handler(&format!("handlers[{i}]"), handler, &mut errors);
        if !declared.insert(handler.name.as_str()) {
            errors.push(ValidationError::new(
                format!("handlers[{i}].name"),
                format!("duplicate handler '{}'", handler.name),
            ));
        }
    }

    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{i}]");
        match &route.handler {
            Some(name) => check_reference(&field, name, &declared, &mut errors),
            None => errors.push(ValidationError::new(
                format!("{field}.handler"),
                "top-level routes must name a handler",
            )),
        }
        if let Some(child) = &route.child {
            check_child(&format!("{field}.child"), child, &declared, &mut errors);
        }
    }

    for (i, o) in config.grant_overrides.iter().enumerate() {
        check_reference(&format!("grant_overrides[{i}]"), &o.handler, &declared, &mut errors);
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_handler(field: &str, handler: &HandlerConfig, errors: &mut Vec<ValidationError>) {
    let name = &handler.name;
    if name.is_empty()
        || name.len() > 64
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        errors.push(ValidationError::new(
            format!("{field}.name"),
            "must be 1-64 characters of letters, digits, '-' or '_'",
        ));
    }
    if handler.timeout_secs == 0 || handler.timeout_secs > MAX_TIMEOUT_SECS {
        errors.push(ValidationError::new(
            format!("{field}.timeout_secs"),
            format!("must be between 1 and {MAX_TIMEOUT_SECS}"),
        ));
    }
    for key in handler.environment.keys() {
        if !is_env_key(key) {
            errors.push(ValidationError::new(
                format!("{field}.environment"),
                format!("invalid variable name '{key}'"),
            ));
        }
    }
    if !handler.bucket_env.is_empty() {
        if !is_env_key(&handler.bucket_env) {
            errors.push(ValidationError::new(
                format!("{field}.bucket_env"),
                format!("invalid variable name '{}'", handler.bucket_env),
            ));
        }
        if handler.environment.contains_key(&handler.bucket_env) {
            errors.push(ValidationError::new(
                format!("{field}.environment"),
                format!("'{}' is reserved for the bucket reference", handler.bucket_env),
            ));
        }
    }
}

// Deeper nesting is reported by the routing subsystem as UnsupportedNesting.
fn check_child(field: &str, child: &RouteConfig, declared: &BTreeSet<&str>, errors: &mut Vec<ValidationError>) {
    if let Some(name) = &child.handler {
        check_reference(field, name, declared, errors);
    }
}

fn check_reference(field: &str, handler: &str, declared: &BTreeSet<&str>, errors: &mut Vec<ValidationError>) {
    if !declared.contains(handler) {
        errors.push(ValidationError::new(
            format!("{field}.handler"),
            format!("unknown handler '{handler}'"),
        ));
    }
}

fn is_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_bucket_name(name: &str) -> Result<(), &'static str> {
    if !(3..=63).contains(&name.len()) {
        return Err("must be 3-63 characters");
    }
    if !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.') {
        return Err("may contain only lowercase letters, digits, '-' and '.'");
    }
    let edges_ok = |c: Option<char>| matches!(c, Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit());
    if !edges_ok(name.chars().next()) || !edges_ok(name.chars().last()) {
        return Err("must start and end with a letter or digit");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grants::{GrantLevel, GrantOverride};

    fn handler(name: &str) -> HandlerConfig {
        toml::from_str(&format!("name = \"{name}\"")).unwrap()
    }

    fn route(name: &str, handler: Option<&str>) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            methods: vec!["GET".into()],
            handler: handler.map(Into::into),
            child: None,
        }
    }

    #[test]
    fn test_valid_config() {
        let mut config = DeploymentConfig::default();
        config.handlers.push(handler("s3-download"));
        config.routes.push(route("downloader", Some("s3-download")));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = DeploymentConfig::default();
        let mut slow = handler("slow");
        slow.timeout_secs = 0;
        config.handlers.push(slow);
        config.handlers.push(handler("slow"));
        config.routes.push(route("a", None));
        config.routes.push(route("b", Some("ghost")));
        config.grant_overrides.push(GrantOverride {
            handler: "phantom".into(),
            level: GrantLevel::Read,
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "handlers[0].timeout_secs",
                "handlers[1].name",
                "routes[0].handler",
                "routes[1].handler",
                "grant_overrides[0].handler",
            ]
        );
    }

    #[test]
    fn test_bucket_env_collision() {
        let mut config = DeploymentConfig::default();
        let mut h = handler("h");
        h.environment.insert("BUCKET_NAME".into(), "literal".into());
        config.handlers.push(h);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("reserved"));
    }

    #[test]
    fn test_bucket_name_rules() {
        assert!(check_bucket_name("cms-images-01").is_ok());
        assert!(check_bucket_name("ab").is_err());
        assert!(check_bucket_name("Upper").is_err());
        assert!(check_bucket_name("-leading").is_err());
    }

    #[test]
    fn test_child_handler_reference() {
        let mut config = DeploymentConfig::default();
        config.handlers.push(handler("h"));
        let mut parent = route("a", Some("h"));
        parent.child = Some(Box::new(route("b", Some("ghost"))));
        config.routes.push(parent);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "routes[0].child.handler");
    }
}
