use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::core::config::RedactionConfig;

/// Replaces the values of sensitive argument names with a fixed marker.
///
/// Works on a single mapping level; nested payloads are left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct RedactionFilter {
    hidden: BTreeSet<String>,
    marker: Value,
}

impl RedactionFilter {
    pub fn new<I, S>(hidden: I, marker: impl Into<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hidden: hidden.into_iter().map(Into::into).collect(),
            marker: marker.into(),
        }
    }

    pub fn from_config(config: &RedactionConfig) -> Self {
        Self::new(config.hidden_names.iter().cloned(), config.marker.clone())
    }

    pub fn hide_values(&self, representation: &mut Map<String, Value>) {
        for name in &self.hidden {
            if let Some(slot) = representation.get_mut(name) {
                *slot = self.marker.clone();
            }
        }
    }

    /// Undo a redacted round trip: a submitted marker keeps the stored value,
    /// or is dropped when nothing is stored yet.
    pub fn restore_values(
        &self,
        submitted: &mut Map<String, Value>,
        stored: Option<&Map<String, Value>>,
    ) {
        for name in &self.hidden {
            if submitted.get(name) != Some(&self.marker) {
                continue;
            }
            match stored.and_then(|s| s.get(name)) {
                Some(previous) => {
                    submitted.insert(name.clone(), previous.clone());
                }
                None => {
                    submitted.remove(name);
                }
            }
        }
    }

    pub fn hidden_names(&self) -> impl Iterator<Item = &str> {
        self.hidden.iter().map(String::as_str)
    }
}
