//! Per-request context handed to handler groups.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::decode::GeoRecord;
use crate::routing::Params;

/// Edge server identity for the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub region: String,
    pub request_id: String,
}

/// Immutable record built once by the dispatcher before handler invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub geo: GeoRecord,
    pub client_ip: String,
    pub uuid: String,
    pub server: ServerInfo,
    pub params: Params,
    /// Never serialized: it may hold deployment secrets.
    #[serde(skip)]
    pub env: Arc<EnvSnapshot>,
}

/// Process environment captured once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Snapshot the current process environment minus `excluded`.
    ///
    /// Variables that are not valid unicode are skipped.
    pub fn capture(excluded: &[String]) -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::from_vars(vars, excluded)
    }

    pub fn from_vars<I>(vars: I, excluded: &[String]) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars = vars
            .into_iter()
            .filter(|(k, _)| !excluded.iter().any(|e| e == k))
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
