//! Request descriptors
//!
//! A [`RequestDescriptor`] is what an endpoint function hands to a session:
//! verb, resource path with encoded segments, query pairs and JSON body.
//! It carries no connection state and is never mutated by the session.

use crate::types::{JsonValue, Method};
use serde::Serialize;

/// One Dashboard API call, independent of how it will be sent
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestDescriptor {
    /// HTTP verb
    pub method: Method,
    /// Resource path relative to the base URL, starting with `/`
    pub path: String,
    /// Query pairs in send order; array params are already `key[]`
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<JsonValue>,
}

impl RequestDescriptor {
    /// Create a descriptor for a method and path
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// GET descriptor
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST descriptor
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// PUT descriptor
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// DELETE descriptor
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add a query parameter when a value is present
    #[must_use]
    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Add an array-valued parameter, flattened to repeated `key[]` pairs
    #[must_use]
    pub fn query_array<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let name = format!("{key}[]");
        self.query
            .extend(values.into_iter().map(|v| (name.clone(), v.to_string())));
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Set JSON body from any serializable value
    ///
    /// `None` fields of option structs are expected to be skipped by the
    /// type's own serde attributes.
    pub fn json_from<T: Serialize>(self, body: &T) -> crate::Result<Self> {
        Ok(self.json(serde_json::to_value(body)?))
    }

    /// Value of the first query pair with this key
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace every pair with one of `keys` by the given pairs
    pub(crate) fn with_replaced_query(&self, keys: &[&str], pairs: Vec<(String, String)>) -> Self {
        let mut next = self.clone();
        next.query.retain(|(k, _)| !keys.contains(&k.as_str()));
        next.query.extend(pairs);
        next
    }
}

/// Percent-encode one path segment (every reserved character, including `/`)
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Join the base URL and a resource path
///
/// Absolute URLs are passed through unchanged.
pub fn build_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Resolve a `Location` header against the URL that produced it
pub fn resolve_location(current_url: &str, location: &str) -> crate::Result<String> {
    Ok(url::Url::parse(current_url)?.join(location)?.to_string())
}

/// Build a resource path from literal parts and encoded ids
///
/// ```
/// use meraki_dashboard::http::resource_path;
/// assert_eq!(
///     resource_path(&["organizations", "networks"], &["123/4"]),
///     "/organizations/123%2F4/networks"
/// );
/// ```
///
/// Literal parts and ids are interleaved: `parts[0]/ids[0]/parts[1]/ids[1]...`.
pub fn resource_path(parts: &[&str], ids: &[&str]) -> String {
    let mut path = String::new();
    for (i, part) in parts.iter().enumerate() {
        path.push('/');
        path.push_str(part);
        if let Some(id) = ids.get(i) {
            path.push('/');
            path.push_str(&encode_segment(id));
        }
    }
    path
}
