//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the adapter.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::decode::{NumericCoercion, MAX_BODY_SIZE};

/// Root configuration for the adapter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Route templates in match order.
    pub routes: Vec<RouteConfig>,

    /// Request body limits.
    pub body: BodyConfig,

    /// Query decoding behavior.
    pub query: QueryConfig,

    /// Response relay settings.
    pub relay: RelayConfig,

    /// Vendor header names consumed from the edge.
    pub vendor: VendorConfig,

    /// Environment snapshot handed to handler groups.
    pub env: EnvConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            routes: vec![
                RouteConfig {
                    pattern: "/express/:rest*".to_string(),
                    group: "express".to_string(),
                },
                RouteConfig {
                    pattern: "/express".to_string(),
                    group: "express-index".to_string(),
                },
            ],
            body: BodyConfig::default(),
            query: QueryConfig::default(),
            relay: RelayConfig::default(),
            vendor: VendorConfig::default(),
            env: EnvConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// A route template bound to a named handler group.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path pattern, e.g. `/express/:rest*`.
    pub pattern: String,

    /// Name of the registered handler group.
    pub group: String,
}

/// Request body configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Maximum body size in bytes.
    pub max_size: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            max_size: MAX_BODY_SIZE,
        }
    }
}

/// Query decoding configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Convert digit-only values to numbers. Off keeps values as strings.
    pub numeric_coercion: bool,
}

impl QueryConfig {
    pub fn coercion(&self) -> NumericCoercion {
        if self.numeric_coercion {
            NumericCoercion::Digits
        } else {
            NumericCoercion::Literal
        }
    }
}

/// Response relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Chunks buffered between the relay and the socket writer.
    pub channel_capacity: usize,

    /// Response headers never forwarded to the client.
    pub strip_headers: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 8,
            strip_headers: vec!["eop-client-geo".to_string()],
        }
    }
}

/// Edge-provided header names.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VendorConfig {
    pub geo_header: String,
    pub client_ip_header: String,
    pub uuid_header: String,
    pub region_header: String,
    pub request_id_header: String,

    /// Name the vendor request id is exposed under (request and response).
    pub forwarded_request_id_header: String,

    /// Request headers with these prefixes are removed before dispatch.
    pub reserved_prefixes: Vec<String>,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            geo_header: "eo-connecting-geo".to_string(),
            client_ip_header: "eo-connecting-ip".to_string(),
            uuid_header: "eo-log-uuid".to_string(),
            region_header: "x-scf-region".to_string(),
            request_id_header: "x-scf-request-id".to_string(),
            forwarded_request_id_header: "functions-request-id".to_string(),
            reserved_prefixes: vec!["x-scf-".to_string(), "x-cube-".to_string()],
        }
    }
}

/// Environment snapshot configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Variables never exposed to handler groups.
    pub excluded: Vec<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            excluded: vec![
                "TENCENTCLOUD_UIN".to_string(),
                "TENCENTCLOUD_APPID".to_string(),
            ],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
