//! Cookie header decoding.

use std::collections::BTreeMap;

use super::decode_component;

/// Cookie name → value.
pub type CookieMap = BTreeMap<String, String>;

/// Parse a `Cookie` header value.
///
/// Pairs without `=` (or with an empty name) are skipped, one layer of
/// surrounding double quotes is removed, and values that fail to
/// percent-decode are kept as-is. Later duplicates win.
pub fn parse_cookies(header: &str) -> CookieMap {
    let mut cookies = CookieMap::new();

    for token in header.split(';') {
        let token = token.trim();
        let Some(eq) = token.find('=') else {
            continue;
        };
        if eq == 0 {
            continue;
        }

        let name = token[..eq].trim();
        let mut value = token[eq + 1..].trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = &value[1..value.len() - 1];
        }

        let decoded = decode_component(value).unwrap_or_else(|| value.to_string());
        cookies.insert(name.to_string(), decoded);
    }

    cookies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_and_bare_values() {
        let c = parse_cookies(r#"foo="bar"; baz=qux"#);
        assert_eq!(c.get("foo").map(String::as_str), Some("bar"));
        assert_eq!(c.get("baz").map(String::as_str), Some("qux"));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_skips_pairs_without_equals() {
        let c = parse_cookies("flag; =nameless; ok=1");
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("ok").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_percent_decoding_with_fallback() {
        let c = parse_cookies("name=J%C3%BCrgen; broken=50%");
        assert_eq!(c.get("name").map(String::as_str), Some("Jürgen"));
        assert_eq!(c.get("broken").map(String::as_str), Some("50%"));
    }

    #[test]
    fn test_later_duplicates_overwrite() {
        let c = parse_cookies("session=old; session=new");
        assert_eq!(c.get("session").map(String::as_str), Some("new"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let c = parse_cookies("token=abc==");
        assert_eq!(c.get("token").map(String::as_str), Some("abc=="));
    }

    #[test]
    fn test_empty_header() {
        assert!(parse_cookies("").is_empty());
    }
}
