//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check backend names are unique and addresses are absolute http(s) URLs
//! - Validate value ranges (timeouts > 0, capacities > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
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

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut names = HashSet::new();
    for (i, backend) in config.backends.iter().enumerate() {
        let field = format!("backends[{}]", i);
        if backend.name.trim().is_empty() {
            errors.push(ValidationError::new(&field, "name must not be empty"));
        } else if !names.insert(backend.name.as_str()) {
            errors.push(ValidationError::new(
                &field,
                format!("duplicate backend name {}", backend.name),
            ));
        }
        if backend.routing_group.trim().is_empty() {
            errors.push(ValidationError::new(&field, "routing_group must not be empty"));
        }
        match Url::parse(&backend.address) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::new(
                &field,
                format!("unsupported scheme {}", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                &field,
                format!("invalid address {}: {}", backend.address, e),
            )),
        }
    }

    let mut groups = HashSet::new();
    for (i, group) in config.routing_groups.iter().enumerate() {
        if group.name.trim().is_empty() || !groups.insert(group.name.as_str()) {
            errors.push(ValidationError::new(
                format!("routing_groups[{}]", i),
                "name must be non-empty and unique",
            ));
        }
    }

    let positive = [
        ("monitor.interval_secs", config.monitor.interval_secs),
        ("monitor.timeout_secs", config.monitor.timeout_secs),
        ("discovery.connect_timeout_ms", config.discovery.connect_timeout_ms),
        ("discovery.read_timeout_ms", config.discovery.read_timeout_ms),
        ("discovery.deadline_ms", config.discovery.deadline_ms),
        ("affinity_cache.idle_ttl_secs", config.affinity_cache.idle_ttl_secs),
        ("refresh.interval_secs", config.refresh.interval_secs),
        ("listener.request_timeout_secs", config.listener.request_timeout_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }
    if config.discovery.max_concurrent_probes == 0 {
        errors.push(ValidationError::new(
            "discovery.max_concurrent_probes",
            "must be greater than zero",
        ));
    }
    if config.affinity_cache.capacity == 0 {
        errors.push(ValidationError::new("affinity_cache.capacity", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
