//! Path pattern compilation
//!
//! A route path template compiles into an ordered list of segments:
//! - `users`: literal segment
//! - `:id`: required parameter
//! - `:tab?`: optional parameter
//! - `*`: catch-all, only valid as the last segment
//!
//! A trailing slash is optional on both the pattern and the matched path.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;

use crate::error::RouteError;
use crate::location::Params;
use crate::Result;

/// Parameter name under which a trailing `*` capture is stored.
pub const WILDCARD_PARAM: &str = "pathMatch";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Optional(String),
    Wildcard,
}

#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
    /// Accepts every path without capturing anything
    catch_all: bool,
    case_sensitive: bool,
}

impl PathPattern {
    /// Compile a pattern, degrading to a catch-all matcher if it is malformed.
    pub fn compile(pattern: &str, case_sensitive: bool) -> Self {
        match Self::try_compile(pattern, case_sensitive) {
            Ok(compiled) => compiled,
            Err(err) => {
                tracing::warn!(
                    pattern = %pattern,
                    error = %err,
                    "Malformed route pattern, falling back to catch-all"
                );
                Self::catch_all(pattern, case_sensitive)
            }
        }
    }

    pub fn try_compile(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let trimmed = pattern.trim();
        if trimmed == "*" {
            return Ok(Self::catch_all(pattern, case_sensitive));
        }

        let malformed = |reason: &str| RouteError::Malformed {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !trimmed.starts_with('/') {
            return Err(malformed("pattern must start with '/'"));
        }

        let parts = split_segments(trimmed);
        let mut segments = Vec::with_capacity(parts.len());
        let mut seen = HashSet::new();

        for (index, part) in parts.iter().enumerate() {
            if *part == "*" {
                if index + 1 != parts.len() {
                    return Err(malformed("'*' must be the last segment"));
                }
                segments.push(Segment::Wildcard);
                continue;
            }

            let Some(key) = part.strip_prefix(':') else {
                segments.push(Segment::Literal((*part).to_string()));
                continue;
            };

            let (name, optional) = match key.strip_suffix('?') {
                Some(name) => (name, true),
                None => (key, false),
            };

            if name.is_empty() || name.contains(':') || name.contains('?') {
                return Err(malformed("invalid parameter name"));
            }
            if !seen.insert(name) {
                return Err(malformed("duplicate parameter name"));
            }

            segments.push(if optional {
                Segment::Optional(name.to_string())
            } else {
                Segment::Param(name.to_string())
            });
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
            catch_all: false,
            case_sensitive,
        })
    }

    fn catch_all(pattern: &str, case_sensitive: bool) -> Self {
        Self {
            source: pattern.to_string(),
            segments: Vec::new(),
            catch_all: true,
            case_sensitive,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    /// Parameter names in match order
    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param(name) | Segment::Optional(name) => Some(name.as_str()),
                Segment::Wildcard => Some(WILDCARD_PARAM),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }

    /// Match `path` and return decoded parameters.
    ///
    /// Optional parameters absent from the path are omitted.
    pub fn captures(&self, path: &str) -> Option<Params> {
        if self.catch_all {
            return Some(Params::new());
        }

        let parts = split_segments(path);
        let mut raw = Vec::new();
        if !self.match_from(0, &parts, 0, &mut raw) {
            return None;
        }

        Some(
            raw.into_iter()
                .map(|(name, value)| (name.to_string(), decode_segment(&value)))
                .collect(),
        )
    }

    fn match_from<'a>(
        &'a self,
        segment_index: usize,
        parts: &[&str],
        at: usize,
        captures: &mut Vec<(&'a str, String)>,
    ) -> bool {
        let Some(segment) = self.segments.get(segment_index) else {
            return at == parts.len();
        };

        match segment {
            Segment::Literal(literal) => {
                at < parts.len()
                    && self.literal_eq(literal, parts[at])
                    && self.match_from(segment_index + 1, parts, at + 1, captures)
            }
            Segment::Param(name) => {
                if at >= parts.len() || parts[at].is_empty() {
                    return false;
                }
                captures.push((name.as_str(), parts[at].to_string()));
                if self.match_from(segment_index + 1, parts, at + 1, captures) {
                    return true;
                }
                captures.pop();
                false
            }
            Segment::Optional(name) => {
                if at < parts.len() && !parts[at].is_empty() {
                    captures.push((name.as_str(), parts[at].to_string()));
                    if self.match_from(segment_index + 1, parts, at + 1, captures) {
                        return true;
                    }
                    captures.pop();
                }
                self.match_from(segment_index + 1, parts, at, captures)
            }
            Segment::Wildcard => {
                captures.push((WILDCARD_PARAM, parts[at..].join("/")));
                true
            }
        }
    }

    fn literal_eq(&self, literal: &str, part: &str) -> bool {
        if self.case_sensitive {
            literal == part
        } else {
            literal.eq_ignore_ascii_case(part)
        }
    }
}

/// Split a path into segments, ignoring the leading and one trailing slash.
pub(crate) fn split_segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

/// Percent-decode a captured segment, keeping the raw text if it is not valid UTF-8.
pub fn decode_segment(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Fill `:param` placeholders of a pattern.
///
/// Missing values leave the placeholder in place.
pub fn fill_params(pattern: &str, params: &Params) -> String {
    pattern
        .split('/')
        .map(|piece| {
            let Some(key) = piece.strip_prefix(':') else {
                return piece.to_string();
            };
            let key = key.strip_suffix('?').unwrap_or(key);
            match params.get(key) {
                Some(value) if !value.is_empty() => value.clone(),
                _ => piece.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
