//! Route template compilation and matching.
//!
//! # Syntax
//! - `literal`  static segment, must match exactly
//! - `:name`    captures one segment
//! - `:name*`   captures one or more segments (at most one per template)
//!
//! A wildcard may be followed only by static segments; the first of them acts
//! as the delimiter that bounds the capture.
//!
//! # Design Decisions
//! - Templates are compiled once at startup, matching allocates only the
//!   captured values
//! - No regex: segment-by-segment comparison, case-sensitive

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Error compiling a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("route pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    #[error("route pattern `{0}` has an unnamed parameter")]
    EmptyParamName(String),

    #[error("route pattern `{0}` has more than one wildcard")]
    MultipleWildcards(String),

    #[error("route pattern `{0}` has a parameter after its wildcard")]
    ParamAfterWildcard(String),
}

/// One compiled template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    Param(String),
    Wildcard(String),
}

/// A captured parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

/// Captured parameters by name.
pub type Params = BTreeMap<String, ParamValue>;

/// Result of a successful template match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteMatch {
    pub params: Params,
    /// Input segments handed on to the handler group.
    pub remainder: Vec<String>,
}

impl RouteMatch {
    /// Sub-path forwarded to the handler group (`/` when nothing remains).
    pub fn forward_path(&self) -> String {
        if self.remainder.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.remainder.join("/"))
        }
    }
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    pattern: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Compile a pattern such as `/express/:rest*`.
    pub fn parse(pattern: &str) -> Result<Self, TemplateError> {
        if !pattern.starts_with('/') {
            return Err(TemplateError::MissingLeadingSlash(pattern.to_string()));
        }

        let mut segments = Vec::new();
        let mut wildcard_seen = false;

        for raw in pattern.split('/').filter(|s| !s.is_empty()) {
            let segment = match raw.strip_prefix(':') {
                Some(name) => match name.strip_suffix('*') {
                    Some(name) => {
                        if wildcard_seen {
                            return Err(TemplateError::MultipleWildcards(pattern.to_string()));
                        }
                        wildcard_seen = true;
                        Segment::Wildcard(name.to_string())
                    }
                    None => {
                        if wildcard_seen {
                            return Err(TemplateError::ParamAfterWildcard(pattern.to_string()));
                        }
                        Segment::Param(name.to_string())
                    }
                },
                None => Segment::Static(raw.to_string()),
            };

            if let Segment::Param(name) | Segment::Wildcard(name) = &segment {
                if name.is_empty() {
                    return Err(TemplateError::EmptyParamName(pattern.to_string()));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Leading static segments, used to spot overlapping registrations.
    pub fn static_prefix(&self) -> Vec<&str> {
        self.segments
            .iter()
            .map_while(|s| match s {
                Segment::Static(lit) => Some(lit.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Match a normalized path against this template.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let input: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let mut pos = 0usize;
        let mut terminal_wildcard = false;
        let mut has_wildcard = false;

        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(lit) => {
                    if input.get(pos).copied() != Some(lit.as_str()) {
                        return None;
                    }
                    pos += 1;
                }
                Segment::Param(name) => {
                    let value = input.get(pos)?;
                    params.insert(name.clone(), ParamValue::One(value.to_string()));
                    pos += 1;
                }
                Segment::Wildcard(name) => {
                    has_wildcard = true;
                    let rest = &input[pos..];
                    if rest.is_empty() {
                        return None;
                    }

                    let taken = match self.segments.get(idx + 1) {
                        None => {
                            terminal_wildcard = true;
                            rest.len()
                        }
                        Some(Segment::Static(delimiter)) => {
                            // The capture holds at least one segment.
                            rest.iter().skip(1).position(|s| *s == delimiter.as_str())? + 1
                        }
                        Some(_) => return None,
                    };

                    let captured = rest[..taken].iter().map(|s| s.to_string()).collect();
                    params.insert(name.clone(), ParamValue::Many(captured));
                    pos += taken;
                }
            }
        }

        let remainder = if terminal_wildcard {
            let start = self
                .segments
                .iter()
                .rposition(|s| matches!(s, Segment::Static(_)))
                .map_or(0, |i| i + 1);
            input[start..].iter().map(|s| s.to_string()).collect()
        } else if has_wildcard {
            input[pos..].iter().map(|s| s.to_string()).collect()
        } else if pos < input.len() {
            return None;
        } else {
            Vec::new()
        };

        Some(RouteMatch { params, remainder })
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn many(items: &[&str]) -> ParamValue {
        ParamValue::Many(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_parse_segments() {
        let t = RouteTemplate::parse("/express/:id/:rest*").unwrap();
        assert_eq!(
            t.segments(),
            &[
                Segment::Static("express".into()),
                Segment::Param("id".into()),
                Segment::Wildcard("rest".into()),
            ]
        );
        assert_eq!(t.static_prefix(), vec!["express"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(RouteTemplate::parse("express"), Err(TemplateError::MissingLeadingSlash(_))));
        assert!(matches!(RouteTemplate::parse("/a/:"), Err(TemplateError::EmptyParamName(_))));
        assert!(matches!(RouteTemplate::parse("/a/:*"), Err(TemplateError::EmptyParamName(_))));
        assert!(matches!(RouteTemplate::parse("/:a*/x/:b*"), Err(TemplateError::MultipleWildcards(_))));
        assert!(matches!(RouteTemplate::parse("/:a*/:b"), Err(TemplateError::ParamAfterWildcard(_))));
    }

    #[test]
    fn test_terminal_wildcard() {
        let t = RouteTemplate::parse("/express/:rest*").unwrap();
        let m = t.match_path("/express/a/b/c.png").unwrap();
        assert_eq!(m.params.get("rest"), Some(&many(&["a", "b", "c.png"])));
        assert_eq!(m.forward_path(), "/a/b/c.png");
    }

    #[test]
    fn test_wildcard_needs_a_segment() {
        let t = RouteTemplate::parse("/express/:rest*").unwrap();
        assert!(t.match_path("/express").is_none());
        assert!(t.match_path("/other/a").is_none());
    }

    #[test]
    fn test_static_only() {
        let t = RouteTemplate::parse("/express").unwrap();
        let m = t.match_path("/express").unwrap();
        assert!(m.params.is_empty());
        assert_eq!(m.forward_path(), "/");
        assert!(t.match_path("/express/more").is_none());
        assert!(t.match_path("/Express").is_none());
    }

    #[test]
    fn test_root_template() {
        let t = RouteTemplate::parse("/").unwrap();
        assert!(t.match_path("/").is_some());
        assert!(t.match_path("/x").is_none());
    }

    #[test]
    fn test_named_params() {
        let t = RouteTemplate::parse("/images/:category/:name").unwrap();
        let m = t.match_path("/images/icons/logo.svg").unwrap();
        assert_eq!(m.params.get("category"), Some(&ParamValue::One("icons".into())));
        assert_eq!(m.params.get("name"), Some(&ParamValue::One("logo.svg".into())));
        assert!(t.match_path("/images/icons").is_none());
    }

    #[test]
    fn test_delimited_wildcard() {
        let t = RouteTemplate::parse("/files/:path*/raw").unwrap();
        let m = t.match_path("/files/a/b/raw/extra").unwrap();
        assert_eq!(m.params.get("path"), Some(&many(&["a", "b"])));
        assert_eq!(m.forward_path(), "/extra");

        let m = t.match_path("/files/a/raw").unwrap();
        assert_eq!(m.forward_path(), "/");

        // Delimiter never appears.
        assert!(t.match_path("/files/a/b").is_none());
        // Delimiter first would leave the capture empty.
        assert!(t.match_path("/files/raw").is_none());
    }

    #[test]
    fn test_delimited_wildcard_is_bounded_by_first_occurrence() {
        let t = RouteTemplate::parse("/files/:path*/raw/view").unwrap();
        let m = t.match_path("/files/a/raw/view").unwrap();
        assert_eq!(m.params.get("path"), Some(&many(&["a"])));
        assert!(t.match_path("/files/a/raw/edit").is_none());
    }

    #[test]
    fn test_param_before_terminal_wildcard_is_forwarded() {
        let t = RouteTemplate::parse("/u/:id/:rest*").unwrap();
        let m = t.match_path("/u/5/a/b").unwrap();
        assert_eq!(m.params.get("id"), Some(&ParamValue::One("5".into())));
        assert_eq!(m.params.get("rest"), Some(&many(&["a", "b"])));
        assert_eq!(m.forward_path(), "/5/a/b");
    }

    #[test]
    fn test_params_serialize() {
        let t = RouteTemplate::parse("/u/:id/:rest*").unwrap();
        let m = t.match_path("/u/5/a/b").unwrap();
        let json = serde_json::to_value(&m.params).unwrap();
        assert_eq!(json, serde_json::json!({"id": "5", "rest": ["a", "b"]}));
    }
}
