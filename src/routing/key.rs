//! Template keys and path splitting.
//!
//! # Responsibilities
//! - Describe one segment of a URL template (static, parameter, prefix, terminator)
//! - Parse template strings into key sequences
//! - Split request paths into matchable segments
//!
//! # Design Decisions
//! - Templates and paths are case-insensitive (coerced to lowercase)
//! - `"/"` parses to a single empty static key, never to zero keys
//! - Malformed braces are rejected when the template is registered

use std::borrow::Cow;
use std::fmt;

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Errors produced while parsing a URL template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template {template:?}: unbalanced braces in segment {segment:?}")]
    UnbalancedBraces { template: String, segment: String },

    #[error("template {template:?}: parameter in segment {segment:?} has no name")]
    EmptyParameter { template: String, segment: String },
}

/// One segment of a registered template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Key {
    /// Literal text for static keys, parameter name for dynamic keys.
    pub value: String,
    /// Matches any single segment and binds it under `value`.
    pub dynamic: bool,
    /// Matches its own segment and everything after it.
    pub prefix: bool,
    /// Marks "a template ends here"; carries no value.
    pub terminator: bool,
}

impl Key {
    /// A static key matching exactly `value`.
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// A parameter key binding the segment under `name`.
    pub fn param(name: impl Into<String>) -> Self {
        Self {
            value: name.into(),
            dynamic: true,
            ..Self::default()
        }
    }

    /// The null key owned by terminator nodes.
    pub fn terminator() -> Self {
        Self {
            terminator: true,
            ..Self::default()
        }
    }

    /// Mark this key as the trailing prefix of a template.
    pub fn into_prefix(mut self) -> Self {
        self.prefix = true;
        self
    }

    /// Whether this key only matches its own literal text.
    pub fn is_static(&self) -> bool {
        !self.dynamic && !self.terminator
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terminator {
            return Ok(());
        }
        if self.dynamic {
            write!(f, "{{{}}}", self.value)
        } else {
            f.write_str(&self.value)
        }
    }
}

/// Parse `template` into the keys that represent it.
///
/// When `prefix` is true the last key is marked as a prefix, so the template
/// also matches any path that continues past it.
pub fn parse_template(template: &str, prefix: bool) -> Result<Vec<Key>, TemplateError> {
    let normalized = template.trim_matches('/').to_lowercase();
    let mut keys = normalized
        .split('/')
        .map(|segment| parse_segment(template, segment))
        .collect::<Result<Vec<_>, _>>()?;

    if prefix {
        if let Some(last) = keys.pop() {
            keys.push(last.into_prefix());
        }
    }
    Ok(keys)
}

fn parse_segment(template: &str, segment: &str) -> Result<Key, TemplateError> {
    let opens = segment.starts_with('{');
    let closes = segment.ends_with('}');

    if opens && closes && segment.len() >= 2 {
        let name = &segment[1..segment.len() - 1];
        if name.contains(['{', '}']) {
            return Err(unbalanced(template, segment));
        }
        if name.is_empty() {
            return Err(TemplateError::EmptyParameter {
                template: template.to_string(),
                segment: segment.to_string(),
            });
        }
        return Ok(Key::param(name));
    }

    if segment.contains(['{', '}']) {
        return Err(unbalanced(template, segment));
    }
    Ok(Key::literal(segment))
}

fn unbalanced(template: &str, segment: &str) -> TemplateError {
    TemplateError::UnbalancedBraces {
        template: template.to_string(),
        segment: segment.to_string(),
    }
}

/// Percent-decode a request path before matching.
///
/// `%2F` decodes to `/` and so separates segments. Paths that do not decode
/// to valid UTF-8 are matched as sent.
pub fn decode_path(path: &str) -> Cow<'_, str> {
    percent_decode_str(path)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(path))
}

/// Break a request path into lowercase segments.
///
/// Leading and trailing slashes are ignored; the root path yields a single
/// empty segment so it lines up with the key produced for the `"/"` template.
pub fn split_path(path: &str) -> Vec<String> {
    path.trim_matches('/')
        .to_lowercase()
        .split('/')
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_templates() {
        let cases: Vec<(&str, Vec<Key>)> = vec![
            ("/{id}/", vec![Key::param("id")]),
            ("/v1", vec![Key::literal("v1")]),
            ("/", vec![Key::literal("")]),
            ("/ancestor/one", vec![Key::literal("ancestor"), Key::literal("one")]),
            ("/Ancestor/TWO", vec![Key::literal("ancestor"), Key::literal("two")]),
            (
                "/posts/{id}/comments/{id}",
                vec![
                    Key::literal("posts"),
                    Key::param("id"),
                    Key::literal("comments"),
                    Key::param("id"),
                ],
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_template(input, false).unwrap(), expected, "template {}", input);
        }
    }

    #[test]
    fn test_prefix_marks_last_key_only() {
        let keys = parse_template("/prefix/{id}", true).unwrap();
        assert!(!keys[0].prefix);
        assert!(keys[1].prefix);
        assert!(keys[1].dynamic);

        let root = parse_template("/", true).unwrap();
        assert_eq!(root, vec![Key::literal("").into_prefix()]);
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/users/J%C3%B6rg%20X"), "/users/Jörg X");
        assert_eq!(decode_path("/hello%20world"), "/hello world");
        assert!(matches!(decode_path("/plain"), Cow::Borrowed("/plain")));
        // Invalid UTF-8 is left encoded.
        assert_eq!(decode_path("/bad/%FF"), "/bad/%FF");
    }

    #[test]
    fn test_malformed_templates() {
        assert!(matches!(
            parse_template("/posts/{id", false),
            Err(TemplateError::UnbalancedBraces { .. })
        ));
        assert!(matches!(
            parse_template("/posts/id}", false),
            Err(TemplateError::UnbalancedBraces { .. })
        ));
        assert!(matches!(
            parse_template("/posts/a{b}c", false),
            Err(TemplateError::UnbalancedBraces { .. })
        ));
        assert!(matches!(
            parse_template("/posts/{{id}}", false),
            Err(TemplateError::UnbalancedBraces { .. })
        ));
        assert!(matches!(
            parse_template("/posts/{}", false),
            Err(TemplateError::EmptyParameter { .. })
        ));
    }

    #[test]
    fn test_key_equality_includes_flags() {
        assert_ne!(Key::param("id"), Key::param("id").into_prefix());
        assert_ne!(Key::param("id"), Key::literal("id"));
        assert_eq!(Key::terminator(), Key::terminator());
        assert_ne!(Key::terminator(), Key::literal(""));
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/"), vec![""]);
        assert_eq!(split_path(""), vec![""]);
        assert_eq!(split_path("/V1/"), vec!["v1"]);
        assert_eq!(split_path("/a/b/c"), vec!["a", "b", "c"]);
    }
}
