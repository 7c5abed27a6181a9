//! Schema engine: ordered field sets with discriminated (sibling-dependent)
//! fields, collected validation errors, and redacted representation.

mod discriminated;
mod errors;
mod field;
mod generator;
mod redaction;

pub use discriminated::{Branch, DiscriminatedField, Resolution};
pub use errors::{DefinitionError, NON_FIELD_ERRORS, ValidationErrors};
pub use field::{REQUIRED_MESSAGE, ScalarSpec, ScalarType};
pub use generator::{ArgumentSet, arguments_schema, generate_fields};
pub use redaction::RedactionFilter;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::debug;

use field::json_type_name;

/// A stored or validated payload.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone)]
pub enum Field {
    Scalar(ScalarSpec),
    Nested { schema: Arc<Schema>, required: bool },
    Discriminated(DiscriminatedField),
}

impl Field {
    pub fn nested(schema: Arc<Schema>) -> Self {
        Field::Nested {
            schema,
            required: true,
        }
    }

    pub fn optional_nested(schema: Arc<Schema>) -> Self {
        Field::Nested {
            schema,
            required: false,
        }
    }

    fn describe(&self) -> Value {
        match self {
            Field::Scalar(spec) => spec.describe(),
            Field::Nested { schema, required } => {
                let mut out = schema.describe();
                out["type"] = json!("nested");
                out["required"] = json!(required);
                out
            }
            Field::Discriminated(d) => d.describe(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub field: Field,
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Full payload: defaults are applied and required fields enforced.
    Create,
    /// Partial payload against a stored record.
    Update,
}

/// State of a field after its validation step, consulted by fields that
/// depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Accepted,
    Untouched,
    Suppressed,
    Invalid,
}

enum FieldFailure {
    Message(String),
    Nested(ValidationErrors),
}

/// Immutable, named field set. Fields are resolved in an order where every
/// discriminant comes before the fields that depend on it.
#[derive(Debug)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDef>,
    order: Vec<usize>,
    redaction: Option<Arc<RedactionFilter>>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|def| def.name == name)
    }

    pub fn resolution_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&idx| self.fields[idx].name.as_str())
            .collect()
    }

    pub fn validate_create(&self, input: &Value) -> Result<Record, ValidationErrors> {
        self.validate(input, ValidationMode::Create, None)
    }

    pub fn validate_update(
        &self,
        input: &Value,
        existing: &Record,
    ) -> Result<Record, ValidationErrors> {
        self.validate(input, ValidationMode::Update, Some(existing))
    }

    /// Validate `input`, collecting every field error before failing.
    ///
    /// In update mode, discriminants that are not part of `input` are read from
    /// `existing`. A discriminated field only picks up its default when its
    /// discriminant was set or changed by this same payload.
    pub fn validate(
        &self,
        input: &Value,
        mode: ValidationMode,
        existing: Option<&Record>,
    ) -> Result<Record, ValidationErrors> {
        let Some(obj) = input.as_object() else {
            return Err(ValidationErrors::single(
                NON_FIELD_ERRORS,
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type_name(input)
                ),
            ));
        };

        let creating = mode == ValidationMode::Create;
        let mut accepted = Record::new();
        let mut slots: HashMap<&str, Slot> = HashMap::with_capacity(self.fields.len());
        let mut errors = ValidationErrors::new();

        for &idx in &self.order {
            let def = &self.fields[idx];
            let name = def.name.as_str();
            if def.read_only {
                slots.insert(name, Slot::Untouched);
                continue;
            }
            let raw = obj.get(name);
            let prior = existing.and_then(|e| e.get(name));

            let outcome = match &def.field {
                Field::Scalar(spec) => spec.validate(raw, creating).map_err(FieldFailure::Message),
                Field::Nested { schema, required } => {
                    validate_nested(schema, raw, creating, *required, prior)
                }
                Field::Discriminated(d) => {
                    let dep = d.depends_on();
                    let stored = existing.and_then(|e| e.get(dep));
                    let (discriminant, fill) = match slots.get(dep) {
                        Some(Slot::Accepted) => {
                            let current = accepted.get(dep).cloned();
                            let changed = creating || current.as_ref() != stored;
                            (current, changed)
                        }
                        Some(Slot::Untouched) => (stored.cloned(), creating),
                        Some(Slot::Invalid) => {
                            slots.insert(name, Slot::Invalid);
                            continue;
                        }
                        Some(Slot::Suppressed) | None => (None, false),
                    };

                    match d.resolve(discriminant.as_ref()) {
                        Resolution::Unconfigured | Resolution::Hidden => {
                            if raw.is_some_and(|v| !v.is_null()) {
                                debug!(
                                    schema = %self.name,
                                    field = name,
                                    "dropping input for field suppressed by '{}'",
                                    dep
                                );
                            }
                            slots.insert(name, Slot::Suppressed);
                            continue;
                        }
                        Resolution::Scalar(spec) => spec
                            .validate_with(raw, fill, d.is_required())
                            .map_err(FieldFailure::Message),
                        Resolution::Nested(schema) => {
                            let prior = if fill { None } else { prior };
                            validate_nested(schema, raw, fill, d.is_required(), prior)
                        }
                    }
                }
            };

            match outcome {
                Ok(Some(value)) => {
                    accepted.insert(name.to_string(), value);
                    slots.insert(name, Slot::Accepted);
                }
                Ok(None) => {
                    slots.insert(name, Slot::Untouched);
                }
                Err(FieldFailure::Message(message)) => {
                    errors.add(name, message);
                    slots.insert(name, Slot::Invalid);
                }
                Err(FieldFailure::Nested(nested)) => {
                    errors.merge_nested(name, nested);
                    slots.insert(name, Slot::Invalid);
                }
            }
        }

        if let Some(filter) = &self.redaction {
            filter.restore_values(&mut accepted, existing);
        }

        errors.into_result(accepted)
    }

    /// Output view of a stored record: suppressed branches are omitted and
    /// configured sensitive names are redacted.
    pub fn represent(&self, stored: &Record) -> Record {
        let mut out = self.visible_fields(stored);
        if let Some(filter) = &self.redaction {
            filter.hide_values(&mut out);
        }
        out
    }

    /// Discriminated fields present in `record` that its current
    /// discriminants suppress.
    pub fn prune(&self, record: &Record) -> Vec<String> {
        let visible = self.visible_fields(record);
        self.fields
            .iter()
            .filter(|def| matches!(def.field, Field::Discriminated(_)))
            .filter(|def| record.contains_key(&def.name) && !visible.contains_key(&def.name))
            .map(|def| def.name.clone())
            .collect()
    }

    fn visible_fields(&self, stored: &Record) -> Record {
        let mut out = Record::new();
        for &idx in &self.order {
            let def = &self.fields[idx];
            let Some(value) = stored.get(&def.name) else {
                continue;
            };
            let rendered = match &def.field {
                Field::Scalar(_) => Some(value.clone()),
                Field::Nested { schema, .. } => Some(represent_nested(schema, value)),
                Field::Discriminated(d) => match d.resolve(out.get(d.depends_on())) {
                    Resolution::Unconfigured | Resolution::Hidden => None,
                    Resolution::Scalar(_) => Some(value.clone()),
                    Resolution::Nested(schema) => Some(represent_nested(schema, value)),
                },
            };
            if let Some(value) = rendered {
                out.insert(def.name.clone(), value);
            }
        }
        out
    }

    pub fn describe(&self) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|def| {
                let mut desc = def.field.describe();
                desc["name"] = json!(def.name);
                if def.read_only {
                    desc["read_only"] = json!(true);
                }
                desc
            })
            .collect();
        let mut out = json!({
            "name": self.name,
            "fields": fields,
            "resolution_order": self.resolution_order(),
        });
        if let Some(filter) = &self.redaction {
            out["redacted"] = json!(filter.hidden_names().collect::<Vec<_>>());
        }
        out
    }
}

fn validate_nested(
    schema: &Schema,
    raw: Option<&Value>,
    fill: bool,
    required: bool,
    prior: Option<&Value>,
) -> Result<Option<Value>, FieldFailure> {
    match raw {
        None => {
            if fill && required {
                Err(FieldFailure::Message(REQUIRED_MESSAGE.to_string()))
            } else {
                Ok(None)
            }
        }
        Some(Value::Null) => {
            if required {
                Err(FieldFailure::Message("This field may not be null.".to_string()))
            } else {
                Ok(Some(Value::Null))
            }
        }
        Some(value) => {
            let prior = if fill { None } else { prior.and_then(Value::as_object) };
            let validated = match prior {
                Some(prior) => {
                    let partial = schema
                        .validate(value, ValidationMode::Update, Some(prior))
                        .map_err(FieldFailure::Nested)?;
                    let mut merged = prior.clone();
                    merged.extend(partial);
                    merged
                }
                None => schema
                    .validate(value, ValidationMode::Create, None)
                    .map_err(FieldFailure::Nested)?,
            };
            Ok(Some(Value::Object(validated)))
        }
    }
}

fn represent_nested(schema: &Schema, value: &Value) -> Value {
    match value.as_object() {
        Some(map) => Value::Object(schema.represent(map)),
        None => value.clone(),
    }
}

pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDef>,
    redaction: Option<Arc<RedactionFilter>>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            redaction: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            field,
            read_only: false,
        });
        self
    }

    pub fn scalar(self, name: impl Into<String>, spec: ScalarSpec) -> Self {
        self.field(name, Field::Scalar(spec))
    }

    pub fn discriminated(self, name: impl Into<String>, field: DiscriminatedField) -> Self {
        self.field(name, Field::Discriminated(field))
    }

    /// Represented in output, never accepted from input.
    pub fn read_only(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            field,
            read_only: true,
        });
        self
    }

    pub fn redact_with(mut self, filter: Arc<RedactionFilter>) -> Self {
        self.redaction = Some(filter);
        self
    }

    pub fn build(self) -> Result<Schema, DefinitionError> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, def) in self.fields.iter().enumerate() {
            if index.insert(def.name.as_str(), i).is_some() {
                return Err(DefinitionError::DuplicateField {
                    schema: self.name.clone(),
                    field: def.name.clone(),
                });
            }
        }

        let mut deps = Vec::with_capacity(self.fields.len());
        for def in &self.fields {
            let dep = match &def.field {
                Field::Discriminated(d) => match index.get(d.depends_on()) {
                    Some(&j) => Some(j),
                    None => {
                        return Err(DefinitionError::UnknownDiscriminant {
                            schema: self.name.clone(),
                            field: def.name.clone(),
                            depends_on: d.depends_on().to_string(),
                        });
                    }
                },
                _ => None,
            };
            deps.push(dep);
        }

        let order = resolution_order(&deps).map_err(|stuck| DefinitionError::DependencyCycle {
            schema: self.name.clone(),
            field: self.fields[stuck].name.clone(),
        })?;

        Ok(Schema {
            name: self.name,
            fields: self.fields,
            order,
            redaction: self.redaction,
        })
    }
}

/// Stable topological order: among ready fields, declaration order wins.
/// On a cycle, returns the first field that could not be placed.
fn resolution_order(deps: &[Option<usize>]) -> Result<Vec<usize>, usize> {
    let n = deps.len();
    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    while order.len() < n {
        let next = (0..n).find(|&i| !placed[i] && deps[i].is_none_or(|j| placed[j]));
        match next {
            Some(i) => {
                placed[i] = true;
                order.push(i);
            }
            None => return Err((0..n).find(|&i| !placed[i]).unwrap_or(0)),
        }
    }
    Ok(order)
}
