//! Vendor geo header decoding.
//!
//! The edge attaches a header such as
//! `asn=4134,nation_name="China",region_code=CN-GD,city_name="深圳"` which is
//! tokenized and remapped onto the fixed `GeoRecord` field set.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::decode_component;

static GEO_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[a-z_]+="[^"]*"|[a-z_]+=[A-Za-z0-9.-]+"#).expect("static pattern")
});

/// Client location as reported by the edge. Absent fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code_alpha2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code_numeric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    /// Network operator.
    #[serde(rename = "cisp", skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
}

impl GeoRecord {
    pub fn is_empty(&self) -> bool {
        *self == GeoRecord::default()
    }
}

/// Decode the raw bytes of the geo header.
pub fn parse_geo_header(raw: &[u8]) -> GeoRecord {
    let text = String::from_utf8_lossy(raw);
    let text = match decode_component(&text) {
        Some(decoded) => Cow::Owned(decoded),
        None => {
            tracing::debug!("Geo header is not percent-decodable, using raw value");
            text
        }
    };

    let mut geo = GeoRecord::default();
    for token in GEO_TOKEN.find_iter(&text) {
        let Some((key, value)) = token.as_str().split_once('=') else {
            continue;
        };
        let value = value.strip_prefix('"').unwrap_or(value);
        let value = renormalize(value.strip_suffix('"').unwrap_or(value));

        match key {
            "asn" => geo.asn = Some(value),
            "nation_name" => geo.country_name = Some(value),
            "nation_numeric" => geo.country_code_numeric = Some(value),
            "region_name" => geo.region_name = Some(value),
            "region_code" => {
                geo.country_code_alpha2 = value.split('-').next().map(str::to_string);
                geo.region_code = Some(value);
            }
            "city_name" => geo.city_name = Some(value),
            "latitude" => geo.latitude = Some(value),
            "longitude" => geo.longitude = Some(value),
            "network_operator" => geo.isp = Some(value),
            _ => {}
        }
    }

    geo
}

/// Undo latin-1 mojibake of UTF-8 text.
///
/// A value whose characters all fit in a byte is re-read as UTF-8 when the
/// bytes form valid UTF-8; anything else is returned unchanged.
fn renormalize(value: &str) -> String {
    if value.is_ascii() || !value.chars().all(|c| (c as u32) <= 0xFF) {
        return value.to_string();
    }

    let bytes: Vec<u8> = value.chars().map(|c| c as u8).collect();
    String::from_utf8(bytes).unwrap_or_else(|_| value.to_string())
}
