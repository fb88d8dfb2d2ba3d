//! Route arguments, named parameters and query string parsing
//!
//! A matched fragment yields [`RouteArgs`]: the positional captures of the
//! route pattern in declaration order, followed by the raw query string.
//! [`RouteParams`] offers the same captures keyed by parameter name and
//! [`QueryParams`] parses the query string.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::HashMap;
use std::sync::Arc;

/// Characters left untouched when encoding a URI component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

// ============================================================================
// Route Arguments
// ============================================================================

/// Positional arguments extracted from a fragment by a compiled pattern.
///
/// The last slot is always the query string. It is kept exactly as it
/// appeared in the fragment; every other slot is percent-decoded, and an
/// empty or unmatched capture is `None`.
///
/// # Example
///
/// ```
/// use client_mvc::compile;
///
/// let pattern = compile("posts/:id/:pref").unwrap();
/// let args = pattern.extract("posts/42/amazon?sort=asc").unwrap();
///
/// assert_eq!(args.get(0), Some("42"));
/// assert_eq!(args.get(1), Some("amazon"));
/// assert_eq!(args.query(), Some("sort=asc"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteArgs {
    fragment: String,
    names: Arc<[String]>,
    values: Vec<Option<String>>,
}

impl RouteArgs {
    /// Build arguments from decoded captures.
    ///
    /// `values` holds one slot per parameter name plus the trailing query slot.
    pub(crate) fn new(fragment: String, names: Arc<[String]>, values: Vec<Option<String>>) -> Self {
        debug_assert_eq!(values.len(), names.len() + 1);
        Self {
            fragment,
            names,
            values,
        }
    }

    /// The fragment these arguments were extracted from
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Positional value, including the query slot at the end
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index)?.as_deref()
    }

    /// Value of a named parameter
    pub fn named(&self, name: &str) -> Option<&str> {
        let index = self.names.iter().position(|n| n == name)?;
        self.get(index)
    }

    /// Raw query string, if the fragment carried one
    pub fn query(&self) -> Option<&str> {
        self.values.last()?.as_deref()
    }

    /// Parsed query string
    pub fn query_params(&self) -> QueryParams {
        self.query()
            .map(QueryParams::from_query_string)
            .unwrap_or_default()
    }

    /// All slots in order, the query last
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Declared parameter names, in declaration order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Named parameters that were captured
    pub fn params(&self) -> RouteParams {
        let mut params = RouteParams::new();
        for (name, value) in self.names.iter().zip(&self.values) {
            if let Some(value) = value {
                params.insert(name.clone(), value.clone());
            }
        }
        params
    }

    /// Number of slots, including the query slot
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: the query slot is always present
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// Route Parameters
// ============================================================================

/// Route parameters keyed by name
///
/// # Example
///
/// ```
/// use client_mvc::RouteParams;
///
/// // Route pattern: posts/:id
/// // Matched fragment: posts/123
/// let mut params = RouteParams::new();
/// params.insert("id".to_string(), "123".to_string());
///
/// assert_eq!(params.get("id"), Some(&"123".to_string()));
/// assert_eq!(params.get_as::<i32>("id"), Some(123));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    /// Create new empty route params
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from hashmap
    pub fn from_map(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Get a parameter value as a string
    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Get a parameter and parse it as a specific type
    ///
    /// Returns `None` if the parameter doesn't exist or cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.params.get(key)?.parse().ok()
    }

    /// Insert a parameter
    pub fn insert(&mut self, key: String, value: String) {
        self.params.insert(key, value);
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Check if parameter exists
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Iterate over all parameters
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params.iter()
    }

    /// Check if parameters are empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Query parameters parsed from the query string of a fragment
///
/// Supports multiple values for the same key.
///
/// # Example
///
/// ```
/// use client_mvc::QueryParams;
///
/// let query = QueryParams::from_query_string("page=1&sort=name&tag=rust&tag=mvc");
///
/// assert_eq!(query.get("page"), Some(&"1".to_string()));
/// assert_eq!(query.get_as::<i32>("page"), Some(1));
/// assert_eq!(query.get_all("tag").unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: HashMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create new empty query params
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from query string
    ///
    /// Pairs without `=` are kept with an empty value.
    pub fn from_query_string(query: &str) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params
                .entry(decode_query_component(key))
                .or_default()
                .push(decode_query_component(value));
        }

        Self { params }
    }

    /// Get first value for a parameter
    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)?.first()
    }

    /// Get all values for a parameter
    pub fn get_all(&self, key: &str) -> Option<&Vec<String>> {
        self.params.get(key)
    }

    /// Get parameter as a specific type
    ///
    /// Returns the first value parsed as type T.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Insert a parameter
    ///
    /// If the key already exists, the value is appended to the list.
    pub fn insert(&mut self, key: String, value: String) {
        self.params.entry(key).or_default().push(value);
    }

    /// Check if parameter exists
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Convert to query string, keys sorted for a stable result
    pub fn to_query_string(&self) -> String {
        let mut keys: Vec<&String> = self.params.keys().collect();
        keys.sort();

        keys.into_iter()
            .flat_map(|key| {
                self.params[key].iter().map(move |value| {
                    format!(
                        "{}={}",
                        encode_uri_component(key),
                        encode_uri_component(value)
                    )
                })
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Check if parameters are empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get number of unique parameter keys
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

/// Percent-encode a URI component
pub(crate) fn encode_uri_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// Percent-decode a URI component, keeping the raw text when the result is not UTF-8
pub(crate) fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

fn decode_query_component(s: &str) -> String {
    decode_uri_component(&s.replace('+', " "))
}

// ============================================================================
// Tests
// ============================================================================
