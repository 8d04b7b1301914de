//! Request decoding subsystem.
//!
//! # Data Flow
//! ```text
//! raw request
//!     → geo.rs     (vendor geo header → GeoRecord)
//!     → body.rs    (bounded stream read → content-type driven BodyValue)
//!     → query.rs   (url query → typed QueryMap, on first access)
//!     → cookie.rs  (cookie header → CookieMap, on first access)
//! ```
//!
//! # Design Decisions
//! - Decoders are pure functions over borrowed input; caching lives in the
//!   request view, not here
//! - Percent-decoding follows `decodeURIComponent`: `+` is not a space and
//!   malformed escapes are failures the caller decides how to recover from

pub mod body;
pub mod cookie;
pub mod geo;
pub mod query;

pub use body::{BodyValue, MAX_BODY_SIZE};
pub use cookie::{parse_cookies, CookieMap};
pub use geo::{parse_geo_header, GeoRecord};
pub use query::{parse_query, NumericCoercion, QueryMap, QueryValue};

use percent_encoding::percent_decode_str;

/// Strict percent-decoding of a single URI component.
///
/// Returns `None` for a `%` not followed by two hex digits, or when the
/// decoded bytes are not UTF-8.
pub(crate) fn decode_component(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escaped = bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !escaped {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}
