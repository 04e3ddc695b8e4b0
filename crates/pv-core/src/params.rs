//! Parameter sets: key to declaration text for one version of the file

use crate::codec::extract_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarations of one parameter file, keyed by parameter name
///
/// Values are the trimmed declaration lines. A key declared more than once
/// keeps its last declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSet {
    params: BTreeMap<String, String>,
}

impl ParamSet {
    /// Build a set from lines in file order
    pub fn build<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = BTreeMap::new();
        for line in lines {
            let line = line.as_ref();
            if let Some(key) = extract_key(line) {
                params.insert(key.to_string(), line.trim().to_string());
            }
        }
        Self { params }
    }

    /// Build a set from the full text of a file
    pub fn from_text(text: &str) -> Self {
        Self::build(text.lines())
    }

    /// Get the declaration for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Check whether a key is declared
    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no declarations were found
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate (key, declaration) pairs in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One mod's version of the parameter file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModParams {
    /// Label of the mod that supplied the file (its file name)
    pub source: String,
    /// Declarations found in that file
    pub params: ParamSet,
}

impl ModParams {
    pub fn new(source: impl Into<String>, params: ParamSet) -> Self {
        Self {
            source: source.into(),
            params,
        }
    }
}
