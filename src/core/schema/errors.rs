use std::collections::BTreeMap;

use thiserror::Error;

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Raised while a schema is being defined. These never reach request handling:
/// a process that hits one cannot build its schema registry at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("reference catalog has no arguments for job type '{0}'")]
    UnknownJobType(String),

    #[error("schema '{schema}': field '{field}' depends on unknown field '{depends_on}'")]
    UnknownDiscriminant {
        schema: String,
        field: String,
        depends_on: String,
    },

    #[error("schema '{schema}': discriminated fields form a dependency cycle through '{field}'")]
    DependencyCycle { schema: String, field: String },

    #[error("schema '{schema}': duplicate field '{field}'")]
    DuplicateField { schema: String, field: String },
}

/// Per-field validation failures, collected across the whole payload.
///
/// Keys are dotted paths (`data.vars.forks`); nested schemas report their own
/// non-field errors under the parent field's path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error, serde::Serialize)]
#[error("{} field(s) failed validation", .errors.len())]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(path, message);
        errors
    }

    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(path.into())
            .or_default()
            .push(message.into());
    }

    /// Fold errors produced by a nested schema under `prefix`.
    pub fn merge_nested(&mut self, prefix: &str, nested: ValidationErrors) {
        for (path, messages) in nested.errors {
            let full = if path == NON_FIELD_ERRORS {
                prefix.to_string()
            } else {
                format!("{}.{}", prefix, path)
            };
            self.errors.entry(full).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, path: &str) -> Option<&[String]> {
        self.errors.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.errors.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_errors_are_prefixed() {
        let mut inner = ValidationErrors::new();
        inner.add("forks", "A valid integer is required.");
        inner.add(NON_FIELD_ERRORS, "Invalid data.");

        let mut outer = ValidationErrors::new();
        outer.merge_nested("vars", inner);

        assert!(outer.contains("vars.forks"));
        assert_eq!(outer.get("vars"), Some(&["Invalid data.".to_string()][..]));
    }

    #[test]
    fn messages_accumulate_per_path() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "first");
        errors.add("name", "second");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("name").map(|m| m.len()), Some(2));
    }

    #[test]
    fn empty_collection_converts_to_ok() {
        assert_eq!(ValidationErrors::new().into_result(5), Ok(5));
        assert!(ValidationErrors::single("x", "bad").into_result(5).is_err());
    }

    #[test]
    fn serializes_as_plain_map() {
        let errors = ValidationErrors::single("schedule", "Invalid crontab expression.");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "schedule": ["Invalid crontab expression."] })
        );
    }
}
