//! Caller-defined extra fields.
//!
//! Predicates, delay functions and the operation itself all receive the live
//! [`RetryStatus`](crate::RetryStatus). [`Extensions`] lets callers hang
//! auxiliary parameters off the policy and read them back from there, instead
//! of threading them through separate closures.
//!
//! # Examples
//!
//! ```rust
//! use povtor::Extensions;
//!
//! let mut ext = Extensions::new();
//! ext.insert("max_len", 3usize);
//! ext.insert("label", String::from("fetch"));
//!
//! assert_eq!(ext.get::<usize>("max_len"), Some(&3));
//! assert_eq!(ext.get::<String>("label").map(String::as_str), Some("fetch"));
//! // Wrong type reads as absent.
//! assert_eq!(ext.get::<u32>("max_len"), None);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A string-keyed map of opaque, shareable values.
#[derive(Clone, Default)]
pub struct Extensions {
    map: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning true if a previous value was replaced.
    pub fn insert<V>(&mut self, key: impl Into<String>, value: V) -> bool
    where
        V: Any + Send + Sync,
    {
        self.map.insert(key.into(), Arc::new(value)).is_some()
    }

    /// Borrow the value under `key` if it exists and has type `V`.
    pub fn get<V: Any>(&self, key: &str) -> Option<&V> {
        self.map.get(key).and_then(|v| v.downcast_ref::<V>())
    }

    /// Share the value under `key` if it exists and has type `V`.
    pub fn get_arc<V>(&self, key: &str) -> Option<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        self.map
            .get(key)
            .cloned()
            .and_then(|v| v.downcast::<V>().ok())
    }

    /// Returns true if any value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Remove the value under `key`, returning true if one was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over the stored keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("Extensions").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces() {
        let mut ext = Extensions::new();
        assert!(!ext.insert("n", 1i32));
        assert!(ext.insert("n", 2i32));
        assert_eq!(ext.get::<i32>("n"), Some(&2));
        assert_eq!(ext.len(), 1);
    }

    #[test]
    fn test_type_mismatch_reads_none() {
        let mut ext = Extensions::new();
        ext.insert("n", 1i32);
        assert!(ext.get::<i64>("n").is_none());
        assert!(ext.get_arc::<i64>("n").is_none());
        assert!(ext.contains_key("n"));
    }

    #[test]
    fn test_get_arc_shares_value() {
        let mut ext = Extensions::new();
        ext.insert("names", vec!["a".to_string()]);
        let a = ext.get_arc::<Vec<String>>("names").unwrap();
        let b = ext.get_arc::<Vec<String>>("names").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_remove_and_empty() {
        let mut ext = Extensions::new();
        assert!(ext.is_empty());
        ext.insert("k", ());
        assert!(ext.remove("k"));
        assert!(!ext.remove("k"));
        assert!(ext.is_empty());
    }

    #[test]
    fn test_debug_lists_sorted_keys() {
        let mut ext = Extensions::new();
        ext.insert("b", 1u8);
        ext.insert("a", 2u8);
        assert_eq!(format!("{:?}", ext), "Extensions { keys: [\"a\", \"b\"] }");
    }
}
