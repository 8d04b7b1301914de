//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Route patterns compile and are not registered twice
//! - Value ranges (sizes and capacities > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AdapterConfig → Result<(), Vec<ValidationError>>
//! - Group names are checked later, against the registered handler groups

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AdapterConfig;
use crate::routing::RouteTemplate;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
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

/// Check every semantic rule, collecting all failures.
pub fn validate_config(config: &AdapterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }
    if config.body.max_size == 0 {
        errors.push(ValidationError::new("body.max_size", "must be greater than 0"));
    }
    if config.relay.channel_capacity == 0 {
        errors.push(ValidationError::new("relay.channel_capacity", "must be greater than 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", config.observability.metrics_address),
        ));
    }

    let mut seen = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{}]", i);
        if let Err(e) = RouteTemplate::parse(&route.pattern) {
            errors.push(ValidationError::new(&field, e.to_string()));
        }
        if route.group.trim().is_empty() {
            errors.push(ValidationError::new(&field, "group must not be empty"));
        }
        // Two groups behind one pattern: the second could never be reached.
        if !seen.insert(route.pattern.as_str()) {
            errors.push(ValidationError::new(
                &field,
                format!("pattern `{}` is already registered", route.pattern),
            ));
        }
    }

    for (i, prefix) in config.vendor.reserved_prefixes.iter().enumerate() {
        if prefix.is_empty() {
            errors.push(ValidationError::new(
                format!("vendor.reserved_prefixes[{}]", i),
                "empty prefix would strip every header",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AdapterConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AdapterConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.body.max_size = 0;
        config.relay.channel_capacity = 0;
        config.routes.push(RouteConfig {
            pattern: "/express".into(),
            group: "dup".into(),
        });
        config.routes.push(RouteConfig {
            pattern: "relative".into(),
            group: "".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"body.max_size"));
        assert!(fields.contains(&"relay.channel_capacity"));
        assert!(errors.iter().any(|e| e.message.contains("already registered")));
        assert!(errors.iter().any(|e| e.message.contains("must start with")));
        assert!(errors.iter().any(|e| e.message.contains("group must not be empty")));
    }
}
