//! The base parameter document as an ordered sequence of lines

use crate::codec::extract_key;
use crate::params::ParamSet;
use std::collections::HashMap;

/// The unmodified parameter file taken from the base archive
///
/// Lines keep their terminators, so concatenating them reproduces the
/// decoded input exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDocument {
    lines: Vec<String>,
}

impl BaseDocument {
    /// Split text into lines, keeping `\n` (and any `\r` before it)
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    /// Decode raw file bytes; invalid UTF-8 is replaced rather than rejected
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_text(&String::from_utf8_lossy(bytes))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Declarations of this document
    pub fn params(&self) -> ParamSet {
        ParamSet::build(&self.lines)
    }

    /// Map each declared key to the index of its last declaring line
    pub fn key_index(&self) -> HashMap<String, usize> {
        let mut index = HashMap::new();
        for (i, line) in self.lines.iter().enumerate() {
            if let Some(key) = extract_key(line) {
                index.insert(key.to_string(), i);
            }
        }
        index
    }

    /// Join the lines back into file text
    pub fn to_text(&self) -> String {
        self.lines.concat()
    }
}
