//! Per-batch string interning

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use super::StringId;

/// Bijection between strings and small ids, scoped to one batch.
///
/// Id 0 is always the empty string; other ids follow first-seen order.
#[derive(Debug, Clone)]
pub struct StringTable {
    strings: Vec<String>,
    ids: HashMap<String, StringId>,
}

impl StringTable {
    pub fn new() -> Self {
        let mut table = Self {
            strings: Vec::new(),
            ids: HashMap::new(),
        };
        table.intern("");
        table
    }

    /// Get the id of `s`, assigning the next id if unseen
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = self.strings.len() as StringId;
        self.strings.push(s.to_string());
        self.ids.insert(s.to_string(), id);
        id
    }

    pub fn get(&self, id: StringId) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.strings
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for StringTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.strings.serialize(serializer)
    }
}
