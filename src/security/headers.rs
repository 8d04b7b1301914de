//! Vendor header handling.
//!
//! # Responsibilities
//! - Read the edge-provided identity headers before anything else touches them
//! - Strip reserved vendor headers so handler groups never see them
//! - Re-expose the vendor request id under its public name
//!
//! # Design Decisions
//! - Extraction runs on the untouched header map, sanitizing runs after
//! - Prefix matching is on lowercase names (header names are normalized)

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::VendorConfig;

/// Identity values the edge attaches to every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorHeaders {
    /// `None` when the edge did not report a client address.
    pub client_ip: Option<String>,
    pub uuid: String,
    pub region: String,
    pub request_id: String,
}

/// Reads and strips vendor headers.
#[derive(Debug, Clone)]
pub struct HeaderSanitizer {
    config: VendorConfig,
    prefixes: Vec<String>,
    forwarded: Option<HeaderName>,
}

impl HeaderSanitizer {
    pub fn new(config: &VendorConfig) -> Self {
        let forwarded = match HeaderName::from_bytes(config.forwarded_request_id_header.as_bytes()) {
            Ok(name) => Some(name),
            Err(_) => {
                tracing::warn!(
                    header = %config.forwarded_request_id_header,
                    "Invalid forwarded request id header name, request id will not be forwarded"
                );
                None
            }
        };

        Self {
            config: config.clone(),
            prefixes: config
                .reserved_prefixes
                .iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
            forwarded,
        }
    }

    /// Read the identity headers.
    pub fn extract(&self, headers: &HeaderMap) -> VendorHeaders {
        VendorHeaders {
            client_ip: header_string(headers, &self.config.client_ip_header)
                .filter(|ip| !ip.is_empty()),
            uuid: header_string(headers, &self.config.uuid_header).unwrap_or_default(),
            region: header_string(headers, &self.config.region_header).unwrap_or_default(),
            request_id: header_string(headers, &self.config.request_id_header).unwrap_or_default(),
        }
    }

    /// Remove reserved headers and add the public request id header.
    pub fn sanitize(&self, headers: &mut HeaderMap, request_id: &str) {
        let reserved: Vec<HeaderName> = headers
            .keys()
            .filter(|name| self.is_reserved(name.as_str()))
            .cloned()
            .collect();
        for name in reserved {
            headers.remove(&name);
        }

        if let Some(value) = self.request_id_header(request_id) {
            headers.insert(value.0, value.1);
        }
    }

    /// Public request id header as a (name, value) pair.
    pub fn request_id_header(&self, request_id: &str) -> Option<(HeaderName, HeaderValue)> {
        let name = self.forwarded.clone()?;
        let value = HeaderValue::from_str(request_id).ok()?;
        Some((name, value))
    }

    pub fn geo_header(&self) -> &str {
        &self.config.geo_header
    }

    fn is_reserved(&self, name: &str) -> bool {
        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}
