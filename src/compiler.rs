//! Route pattern compilation
//!
//! Turns a route pattern into a regular expression plus the ordered list of
//! parameter names it declares. The pattern language is small:
//!
//! - `:name` captures one segment (anything but `/` and `?`)
//! - `*name` captures the remainder of the path, slashes included
//! - `(...)` marks an optional part; groups may nest
//! - everything else matches literally
//!
//! Every compiled pattern also accepts an optional trailing `?query`, which
//! is captured raw as the last argument.
//!
//! ```
//! use client_mvc::compile;
//!
//! let pattern = compile("docs/:section(/:page)").unwrap();
//!
//! let args = pattern.extract("docs/intro").unwrap();
//! assert_eq!(args.get(0), Some("intro"));
//! assert_eq!(args.get(1), None);
//!
//! assert!(pattern.matches("docs/intro/3?lang=en"));
//! assert!(!pattern.matches("docs"));
//! ```

#[cfg(feature = "cache")]
use crate::cache::{CacheStats, PatternCache};
use crate::error::{ConfigurationError, Result};
use crate::params::{decode_uri_component, encode_uri_component, RouteArgs, RouteParams};
use crate::trace_log;
use regex::{Regex, RegexBuilder};
#[cfg(feature = "cache")]
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

const NAMED_PARAM: &str = "([^/?]+)";
const SPLAT_PARAM: &str = "([^?]*?)";
const QUERY_SUFFIX: &str = r"(?:\?([\s\S]*))?$";

/// Upper bound on the compiled program size of one route pattern
pub const MAX_PATTERN_REGEX_SIZE: usize = 1 << 20;

// ============================================================================
// Pattern Syntax Tree
// ============================================================================

/// One piece of a parsed route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Param(String),
    Splat(String),
    Optional(Vec<Part>),
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn flush_literal(literal: &mut String, stack: &mut [Vec<Part>]) {
    if literal.is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        top.push(Part::Literal(std::mem::take(literal)));
    }
}

fn parse(pattern: &str) -> std::result::Result<Vec<Part>, ConfigurationError> {
    let invalid = |reason: &str| ConfigurationError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    // stack[0] is the top level; each open group pushes a frame
    let mut stack: Vec<Vec<Part>> = vec![Vec::new()];
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '(' => {
                flush_literal(&mut literal, &mut stack);
                stack.push(Vec::new());
            }
            ')' => {
                flush_literal(&mut literal, &mut stack);
                if stack.len() == 1 {
                    return Err(invalid("unmatched ')'"));
                }
                if let Some(group) = stack.pop() {
                    if let Some(top) = stack.last_mut() {
                        top.push(Part::Optional(group));
                    }
                }
            }
            ':' | '*' => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if !is_word(next) {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }

                if name.is_empty() {
                    literal.push(c);
                    continue;
                }

                flush_literal(&mut literal, &mut stack);
                let part = if c == ':' {
                    Part::Param(name)
                } else {
                    Part::Splat(name)
                };
                if let Some(top) = stack.last_mut() {
                    top.push(part);
                }
            }
            _ => literal.push(c),
        }
    }

    flush_literal(&mut literal, &mut stack);
    if stack.len() != 1 {
        return Err(invalid("unclosed '('"));
    }
    Ok(stack.pop().unwrap_or_default())
}

fn write_regex(parts: &[Part], out: &mut String, names: &mut Vec<String>) {
    for part in parts {
        match part {
            Part::Literal(text) => out.push_str(&regex::escape(text)),
            Part::Param(name) => {
                out.push_str(NAMED_PARAM);
                names.push(name.clone());
            }
            Part::Splat(name) => {
                out.push_str(SPLAT_PARAM);
                names.push(name.clone());
            }
            Part::Optional(inner) => {
                out.push_str("(?:");
                write_regex(inner, out, names);
                out.push_str(")?");
            }
        }
    }
}

/// Returns false when a required parameter is missing.
fn write_fragment(parts: &[Part], params: &RouteParams, out: &mut String) -> bool {
    for part in parts {
        match part {
            Part::Literal(text) => out.push_str(text),
            Part::Param(name) => match params.get(name) {
                Some(value) => out.push_str(&encode_uri_component(value)),
                None => return false,
            },
            Part::Splat(name) => match params.get(name) {
                Some(value) => {
                    let encoded: Vec<String> =
                        value.split('/').map(encode_uri_component).collect();
                    out.push_str(&encoded.join("/"));
                }
                None => return false,
            },
            Part::Optional(inner) => {
                let mut group = String::new();
                if write_fragment(inner, params, &mut group) {
                    out.push_str(&group);
                }
            }
        }
    }
    true
}

// ============================================================================
// CompiledPattern
// ============================================================================

/// A route pattern compiled to a matcher
///
/// Compiled patterns are immutable and shared between the router and the
/// history route table.
#[derive(Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
    names: Arc<[String]>,
    parts: Vec<Part>,
}

impl CompiledPattern {
    /// The pattern this matcher was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The generated regular expression
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Parameter names in declaration order
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    /// Check whether a normalized fragment matches
    pub fn matches(&self, fragment: &str) -> bool {
        self.regex.is_match(fragment)
    }

    /// Extract positional arguments from a matching fragment
    ///
    /// Returns `None` if the fragment does not match.
    pub fn extract(&self, fragment: &str) -> Option<RouteArgs> {
        let captures = self.regex.captures(fragment)?;
        let last = captures.len() - 1;

        let values = (1..=last)
            .map(|index| {
                let value = captures
                    .get(index)
                    .map(|m| m.as_str())
                    .filter(|s| !s.is_empty())?;
                if index == last {
                    Some(value.to_string())
                } else {
                    Some(decode_uri_component(value))
                }
            })
            .collect();

        Some(RouteArgs::new(
            fragment.to_string(),
            Arc::clone(&self.names),
            values,
        ))
    }

    /// Extract named parameters from a matching fragment
    pub fn params(&self, fragment: &str) -> Option<RouteParams> {
        self.extract(fragment).map(|args| args.params())
    }

    /// Build a fragment from named parameters
    ///
    /// Optional groups whose parameters are missing are left out. Returns
    /// `None` if a required parameter is missing.
    ///
    /// ```
    /// use client_mvc::{compile, RouteParams};
    ///
    /// let pattern = compile("posts/:id(/:pref)").unwrap();
    /// let params = RouteParams::new().with("id", "42");
    ///
    /// assert_eq!(pattern.reverse(&params), Some("posts/42".to_string()));
    /// ```
    pub fn reverse(&self, params: &RouteParams) -> Option<String> {
        let mut out = String::new();
        write_fragment(&self.parts, params, &mut out).then_some(out)
    }
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPattern")
            .field("source", &self.source)
            .field("regex", &self.regex.as_str())
            .field("names", &self.names)
            .finish()
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Compile a route pattern
pub fn compile(pattern: &str) -> Result<CompiledPattern> {
    let parts = parse(pattern)?;

    let mut body = String::from("^");
    let mut names = Vec::new();
    write_regex(&parts, &mut body, &mut names);
    body.push_str(QUERY_SUFFIX);

    let regex = RegexBuilder::new(&body)
        .size_limit(MAX_PATTERN_REGEX_SIZE)
        .build()
        .map_err(|e| ConfigurationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

    trace_log!("Compiled route pattern '{}' to /{}/", pattern, body);

    Ok(CompiledPattern {
        source: pattern.to_string(),
        regex,
        names: names.into(),
        parts,
    })
}

// ============================================================================
// RouteCompiler
// ============================================================================

/// Compiles route patterns, reusing earlier results when the `cache`
/// feature is enabled
#[derive(Debug, Default)]
pub struct RouteCompiler {
    #[cfg(feature = "cache")]
    cache: RefCell<PatternCache>,
}

impl RouteCompiler {
    /// Create a compiler with the default cache capacity
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler whose cache holds at most `capacity` patterns
    #[cfg(feature = "cache")]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: RefCell::new(PatternCache::with_capacity(capacity)),
        }
    }

    /// Compile a pattern, or return the cached result
    pub fn compile(&self, pattern: &str) -> Result<Arc<CompiledPattern>> {
        #[cfg(feature = "cache")]
        if let Some(compiled) = self.cache.borrow_mut().get(pattern) {
            return Ok(compiled);
        }

        let compiled = Arc::new(compile(pattern)?);

        #[cfg(feature = "cache")]
        self.cache
            .borrow_mut()
            .insert(pattern.to_string(), Arc::clone(&compiled));

        Ok(compiled)
    }

    /// Cache statistics
    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().stats().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn values(pattern: &str, fragment: &str) -> Vec<Option<String>> {
        compile(pattern)
            .unwrap()
            .extract(fragment)
            .unwrap()
            .values()
            .to_vec()
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_named_params_in_order() {
        assert_eq!(
            values("posts/:id/:pref", "posts/42/amazon"),
            vec![some("42"), some("amazon"), None]
        );
    }

    #[test]
    fn test_named_param_round_trip() {
        let pattern = compile("users/:user/repos/:repo/issues/:number").unwrap();
        let inputs = [("alice", "mvc", "7"), ("b-o-b", "x.y", "1000")];

        for (user, repo, number) in inputs {
            let fragment = format!("users/{}/repos/{}/issues/{}", user, repo, number);
            let args = pattern.extract(&fragment).unwrap();
            assert_eq!(args.get(0), Some(user));
            assert_eq!(args.get(1), Some(repo));
            assert_eq!(args.get(2), Some(number));
        }
    }

    #[test]
    fn test_named_param_stops_at_slash() {
        let pattern = compile("posts/:id").unwrap();
        assert!(pattern.matches("posts/42"));
        assert!(!pattern.matches("posts/42/comments"));
        assert!(!pattern.matches("posts/"));
    }

    #[test]
    fn test_splat_captures_slashes() {
        assert_eq!(values("search/*query", "search/a/b/c"), vec![some("a/b/c"), None]);
    }

    #[test]
    fn test_splat_may_be_empty() {
        assert_eq!(values("files/*path", "files/"), vec![None, None]);
    }

    #[test]
    fn test_splat_stops_at_query() {
        assert_eq!(
            values("search/*query", "search/a/b?page=2"),
            vec![some("a/b"), some("page=2")]
        );
    }

    #[test]
    fn test_catch_all_splat() {
        assert_eq!(values("*action", "anything/at/all"), vec![some("anything/at/all"), None]);
        assert_eq!(values("*action", ""), vec![None, None]);
    }

    #[test]
    fn test_optional_segment() {
        let pattern = compile("docs/:section(/:page)").unwrap();

        assert_eq!(
            pattern.extract("docs/intro/2").unwrap().values(),
            &[some("intro"), some("2"), None]
        );
        assert_eq!(
            pattern.extract("docs/intro").unwrap().values(),
            &[some("intro"), None, None]
        );
    }

    #[test]
    fn test_nested_optional_segments() {
        let pattern = compile("a(/:b(/:c))").unwrap();
        assert!(pattern.matches("a"));
        assert!(pattern.matches("a/1"));
        assert!(pattern.matches("a/1/2"));
        assert_eq!(pattern.param_names(), &["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_query_string_is_not_decoded() {
        assert_eq!(
            values("search/:q", "search/caf%C3%A9?x=%20y"),
            vec![some("café"), some("x=%20y")]
        );
    }

    #[test]
    fn test_empty_query_is_none() {
        assert_eq!(values("home", "home?"), vec![None]);
    }

    #[test]
    fn test_literals_are_escaped() {
        let pattern = compile("v1.0/+items[0]").unwrap();
        assert!(pattern.matches("v1.0/+items[0]"));
        assert!(!pattern.matches("v1x0/+items[0]"));
    }

    #[test]
    fn test_bare_markers_are_literal() {
        let pattern = compile("note:/rest*").unwrap();
        assert!(pattern.matches("note:/rest*"));
        assert!(pattern.param_names().is_empty());
    }

    #[test]
    fn test_unbalanced_groups_are_rejected() {
        for pattern in ["docs(/:page", "docs/:page)"] {
            let error = compile(pattern).unwrap_err();
            assert!(error.is_configuration(), "{}", pattern);
        }
    }

    #[test]
    fn test_oversized_pattern_is_rejected() {
        let pattern = ":a/".repeat(MAX_PATTERN_REGEX_SIZE / 4);
        let error = compile(&pattern).unwrap_err();
        assert!(matches!(
            error,
            Error::Configuration(ConfigurationError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_regex_shape() {
        let pattern = compile("posts/:id").unwrap();
        assert_eq!(pattern.regex().as_str(), r"^posts/([^/?]+)(?:\?([\s\S]*))?$");
    }

    #[test]
    fn test_reverse() {
        let pattern = compile("posts/:id(/:pref)").unwrap();

        let full = RouteParams::new().with("id", "42").with("pref", "a b");
        assert_eq!(pattern.reverse(&full), Some("posts/42/a%20b".to_string()));
        assert_eq!(pattern.reverse(&RouteParams::new()), None);

        let splat = compile("files/*path").unwrap();
        let params = RouteParams::new().with("path", "docs/read me.txt");
        assert_eq!(
            splat.reverse(&params),
            Some("files/docs/read%20me.txt".to_string())
        );
    }

    #[test]
    fn test_compiler_reuses_patterns() {
        let compiler = RouteCompiler::new();
        let first = compiler.compile("posts/:id").unwrap();
        let second = compiler.compile("posts/:id").unwrap();
        assert_eq!(first, second);

        #[cfg(feature = "cache")]
        {
            assert!(Arc::ptr_eq(&first, &second));
            let stats = compiler.cache_stats();
            assert_eq!(stats.hits, 1);
            assert_eq!(stats.misses, 1);
        }
    }
}
