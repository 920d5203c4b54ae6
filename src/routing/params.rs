//! Parameter bindings extracted from a matched template.

use std::collections::BTreeMap;

use serde::Serialize;

/// Maps parameter names to their values.
///
/// A name used more than once in a template keeps every value, in the order
/// the parameters appear in the template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Vec<String>>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value bound to `name`, in template order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Add a value ahead of any already bound to `name`.
    ///
    /// Extraction walks the trie from leaf to root, so earlier parameters
    /// are discovered last.
    pub(crate) fn prepend(&mut self, name: &str, value: &str) {
        self.0
            .entry(name.to_string())
            .or_default()
            .insert(0, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepend_keeps_template_order() {
        let mut params = Params::new();
        params.prepend("id", "bar");
        params.prepend("slug", "post");
        params.prepend("id", "foo");

        assert_eq!(params.get("id"), Some("foo"));
        assert_eq!(params.get_all("id"), ["foo", "bar"]);
        assert_eq!(params.get("slug"), Some("post"));
        assert_eq!(params.len(), 2);
        assert!(params.get("missing").is_none());
        assert!(params.get_all("missing").is_empty());
    }

    #[test]
    fn test_serializes_as_map() {
        let mut params = Params::new();
        params.prepend("id", "1");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({ "id": ["1"] }));
    }
}
