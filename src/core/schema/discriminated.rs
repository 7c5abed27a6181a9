use std::sync::Arc;

use serde_json::{Value, json};

use super::Schema;
use super::field::ScalarSpec;

/// What a discriminated field becomes under one discriminant value.
#[derive(Debug, Clone)]
pub enum Branch {
    Nested(Arc<Schema>),
    Scalar(ScalarSpec),
    /// The field accepts no input and produces no output.
    Hidden,
}

/// Outcome of looking up the active branch for a discriminant value.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    /// The discriminant is absent or matches no configured branch.
    Unconfigured,
    Hidden,
    Nested(&'a Arc<Schema>),
    Scalar(&'a ScalarSpec),
}

/// A field whose shape is chosen by the current value of a sibling field.
#[derive(Debug, Clone)]
pub struct DiscriminatedField {
    depends_on: String,
    branches: Vec<(String, Branch)>,
    wildcard: Option<Box<Branch>>,
    required: bool,
}

impl DiscriminatedField {
    pub fn on(depends_on: impl Into<String>) -> Self {
        Self {
            depends_on: depends_on.into(),
            branches: Vec::new(),
            wildcard: None,
            required: false,
        }
    }

    pub fn branch(mut self, value: impl Into<String>, branch: Branch) -> Self {
        let value = value.into();
        self.branches.retain(|(v, _)| *v != value);
        self.branches.push((value, branch));
        self
    }

    pub fn nested(self, value: impl Into<String>, schema: Arc<Schema>) -> Self {
        self.branch(value, Branch::Nested(schema))
    }

    pub fn scalar(self, value: impl Into<String>, spec: ScalarSpec) -> Self {
        self.branch(value, Branch::Scalar(spec))
    }

    pub fn hidden(self, value: impl Into<String>) -> Self {
        self.branch(value, Branch::Hidden)
    }

    /// Branch used when the discriminant has a value that no literal matches.
    pub fn otherwise(mut self, branch: Branch) -> Self {
        self.wildcard = Some(Box::new(branch));
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn depends_on(&self) -> &str {
        &self.depends_on
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn resolve(&self, discriminant: Option<&Value>) -> Resolution<'_> {
        let Some(key) = discriminant.and_then(discriminant_key) else {
            return Resolution::Unconfigured;
        };
        let branch = self
            .branches
            .iter()
            .find(|(value, _)| *value == key)
            .map(|(_, branch)| branch)
            .or(self.wildcard.as_deref());
        match branch {
            None => Resolution::Unconfigured,
            Some(Branch::Hidden) => Resolution::Hidden,
            Some(Branch::Nested(schema)) => Resolution::Nested(schema),
            Some(Branch::Scalar(spec)) => Resolution::Scalar(spec),
        }
    }

    pub fn describe(&self) -> Value {
        let mut branches = serde_json::Map::new();
        for (value, branch) in &self.branches {
            branches.insert(value.clone(), describe_branch(branch));
        }
        let mut out = json!({
            "type": "discriminated",
            "depends_on": self.depends_on,
            "required": self.required,
            "branches": branches,
        });
        if let Some(wildcard) = &self.wildcard {
            out["otherwise"] = describe_branch(wildcard);
        }
        out
    }
}

fn describe_branch(branch: &Branch) -> Value {
    match branch {
        Branch::Hidden => json!("hidden"),
        Branch::Scalar(spec) => spec.describe(),
        Branch::Nested(schema) => schema.describe(),
    }
}

/// Lookup key for a discriminant value. Null and empty strings select nothing.
pub(crate) fn discriminant_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule_field() -> DiscriminatedField {
        DiscriminatedField::on("type")
            .scalar("CRONTAB", ScalarSpec::crontab().with_default("* * * * *"))
            .scalar("INTERVAL", ScalarSpec::uptime().with_default(0))
            .required()
    }

    #[test]
    fn literal_values_select_their_branch() {
        let field = schedule_field();
        match field.resolve(Some(&json!("INTERVAL"))) {
            Resolution::Scalar(spec) => assert_eq!(spec.default, Some(json!(0))),
            other => panic!("unexpected resolution {:?}", other),
        }
    }

    #[test]
    fn unmatched_and_absent_values_are_unconfigured() {
        let field = schedule_field();
        assert!(matches!(field.resolve(Some(&json!("WEEKLY"))), Resolution::Unconfigured));
        assert!(matches!(field.resolve(None), Resolution::Unconfigured));
        assert!(matches!(field.resolve(Some(&Value::Null)), Resolution::Unconfigured));
        assert!(matches!(field.resolve(Some(&json!(""))), Resolution::Unconfigured));
    }

    #[test]
    fn hidden_branch_is_explicit() {
        let field = DiscriminatedField::on("kind")
            .hidden("TEMPLATE")
            .scalar("PLAYBOOK", ScalarSpec::reference("Playbook"));
        assert!(matches!(field.resolve(Some(&json!("TEMPLATE"))), Resolution::Hidden));
        assert!(matches!(
            field.resolve(Some(&json!("PLAYBOOK"))),
            Resolution::Scalar(_)
        ));
    }

    #[test]
    fn wildcard_covers_any_present_value() {
        let field = DiscriminatedField::on("template")
            .otherwise(Branch::Scalar(ScalarSpec::string().allow_blank()));
        assert!(matches!(field.resolve(Some(&json!(42))), Resolution::Scalar(_)));
        assert!(matches!(field.resolve(None), Resolution::Unconfigured));
    }

    #[test]
    fn redeclaring_a_branch_replaces_it() {
        let field = DiscriminatedField::on("kind")
            .hidden("MODULE")
            .scalar("MODULE", ScalarSpec::reference("Module"));
        assert!(matches!(field.resolve(Some(&json!("MODULE"))), Resolution::Scalar(_)));
    }

    #[test]
    fn describe_lists_branches() {
        let desc = schedule_field().describe();
        assert_eq!(desc["depends_on"], "type");
        assert_eq!(desc["branches"]["CRONTAB"]["default"], "* * * * *");
        assert_eq!(desc["branches"]["INTERVAL"]["type"], "uptime");
    }
}
