use bytes::Bytes;
use rustc_hash::FxHashMap;

/// Aliased request type. The body is collected before the chain runs.
pub type Request = hyper::Request<Bytes>;

/// Wrapper type for route parameters.
#[derive(Debug, Clone, Default)]
pub struct RouteParams(FxHashMap<String, String>);

impl RouteParams {
    /// Returns a parameter by key as `Option<&str>`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` if the specified key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn extend(&mut self, params: impl IntoIterator<Item = (String, String)>) {
        self.0.extend(params);
    }
}
