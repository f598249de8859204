//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the filter.
//! All types derive Serde traits for deserialization from config files, and
//! every default matches the values the middleware ships with.

use serde::{Deserialize, Serialize};

use crate::filter::classifier::{DEFAULT_DISALLOWED_AGENTS, DEFAULT_IGNORED_PREFIXES};

/// Analytics endpoint reports are posted to.
pub const DEFAULT_ENDPOINT: &str = "https://api.darkvisitors.com/visits";

/// Placeholder token. Validation refuses it while reporting is enabled.
pub const PLACEHOLDER_TOKEN: &str = "paste token here";

/// Root configuration for the filter and its host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Site the host forwards accepted requests to.
    pub upstream: UpstreamConfig,

    /// Classification rules.
    pub filter: RulesConfig,

    /// Analytics reporting.
    pub reporting: ReportingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream site configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Classification rules shared by the rejection hook and the reporter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Answer 404 to disallowed crawlers before the site sees them.
    pub reject_disallowed_agents: bool,

    /// User-Agent fragments matched case-insensitively.
    pub disallowed_agents: Vec<String>,

    /// Path prefixes never reported, matched case-insensitively.
    pub ignored_path_prefixes: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            reject_disallowed_agents: true,
            disallowed_agents: DEFAULT_DISALLOWED_AGENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignored_path_prefixes: DEFAULT_IGNORED_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Analytics reporting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Send reports at all.
    pub enabled: bool,

    /// Endpoint receiving the JSON reports.
    pub endpoint: String,

    /// Bearer token sent in the Authorization header.
    pub token: String,

    /// Reports waiting to be sent. Further reports are dropped.
    pub queue_capacity: usize,

    /// Maximum concurrent outbound POSTs.
    pub max_in_flight: usize,

    /// Per-POST timeout in seconds.
    pub timeout_secs: u64,

    /// How long shutdown waits for queued reports, in seconds.
    pub drain_secs: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: PLACEHOLDER_TOKEN.to_string(),
            queue_capacity: 1024,
            max_in_flight: 32,
            timeout_secs: 10,
            drain_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
