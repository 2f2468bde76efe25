//! # Structured Context
//!
//! Named bags of JSON values attached to errors and monitoring events.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named, structured context object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Name under which the context is attached (e.g. "test_data")
    pub name: String,
    /// Context keys and values
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Context {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            data: serde_json::Map::new(),
        }
    }

    /// Adds a key-value pair to the context. Values that fail to serialize are skipped.
    pub fn add<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        if let Ok(value) = serde_json::to_value(value) {
            self.data.insert(key.into(), value);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;

        if !self.data.is_empty() {
            write!(f, " [")?;
            let mut first = true;
            for (k, v) in &self.data {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", k, v)?;
                first = false;
            }
            write!(f, "]")?;
        }

        Ok(())
    }
}
