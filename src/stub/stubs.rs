//! Stub maps: request → replacement exports, in insertion order.

use crate::value::Value;

/// The stubs for one transaction.
///
/// Keys are requests as the module under test would write them. Order is
/// insertion order; when two keys land on the same identity the later one
/// is what the module sees.
#[derive(Debug, Clone, Default)]
pub struct Stubs {
    entries: Vec<(String, Value)>,
}

impl Stubs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stub (builder style).
    pub fn with(mut self, request: impl Into<String>, exports: impl Into<Value>) -> Self {
        self.insert(request, exports);
        self
    }

    /// Add a stub. Re-inserting a request replaces its value in place.
    pub fn insert(&mut self, request: impl Into<String>, exports: impl Into<Value>) {
        let request = request.into();
        let exports = exports.into();
        match self.entries.iter_mut().find(|(key, _)| *key == request) {
            Some(entry) => entry.1 = exports,
            None => self.entries.push((request, exports)),
        }
    }

    pub fn get(&self, request: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == request)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Stubs {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut stubs = Stubs::new();
        for (request, exports) in iter {
            stubs.insert(request, exports);
        }
        stubs
    }
}
