//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and header values before anything binds
//! - Validate value ranges (capacities > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FilterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::config::schema::{FilterConfig, PLACEHOLDER_TOKEN};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("reporting.endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("reporting.token: a real token is required while reporting is enabled")]
    MissingToken,

    #[error("reporting.token: not a valid header value")]
    InvalidToken,

    #[error("filter.ignored_path_prefixes: {0:?} must start with '/'")]
    RelativePrefix(String),

    #[error("filter.disallowed_agents: empty fragment would match every client")]
    EmptyAgentFragment,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &FilterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.upstream.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "upstream.address",
            value: config.upstream.address.clone(),
        });
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("upstream.request_timeout_secs"));
    }

    for prefix in &config.filter.ignored_path_prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::RelativePrefix(prefix.clone()));
        }
    }
    if config.filter.disallowed_agents.iter().any(|a| a.is_empty()) {
        errors.push(ValidationError::EmptyAgentFragment);
    }

    let reporting = &config.reporting;
    if reporting.enabled {
        match Url::parse(&reporting.endpoint) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::InvalidEndpoint(format!(
                "unsupported scheme {:?}",
                url.scheme()
            ))),
            Err(e) => errors.push(ValidationError::InvalidEndpoint(e.to_string())),
        }

        if reporting.token.is_empty() || reporting.token == PLACEHOLDER_TOKEN {
            errors.push(ValidationError::MissingToken);
        } else if HeaderValue::from_str(&format!("Bearer {}", reporting.token)).is_err() {
            errors.push(ValidationError::InvalidToken);
        }

        if reporting.queue_capacity == 0 {
            errors.push(ValidationError::Zero("reporting.queue_capacity"));
        }
        if reporting.max_in_flight == 0 {
            errors.push(ValidationError::Zero("reporting.max_in_flight"));
        }
        if reporting.timeout_secs == 0 {
            errors.push(ValidationError::Zero("reporting.timeout_secs"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
