use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

static UPTIME_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)d\s*)?(\d{1,2}):([0-5]\d):([0-5]\d)$").ok()
});

pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Value type of a scalar field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Text,
    Integer,
    Boolean,
    Choice(Vec<String>),
    /// Five-column crontab expression.
    Crontab,
    /// Non-negative duration in seconds.
    Uptime,
    /// Free-form reference resolved by name (playbook path, module, inventory).
    Reference(&'static str),
    /// Primary key of another stored entity.
    ForeignKey(&'static str),
}

impl ScalarType {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Text => "text",
            ScalarType::Integer => "integer",
            ScalarType::Boolean => "boolean",
            ScalarType::Choice(_) => "choice",
            ScalarType::Crontab => "crontab",
            ScalarType::Uptime => "uptime",
            ScalarType::Reference(_) => "reference",
            ScalarType::ForeignKey(_) => "foreign_key",
        }
    }
}

/// A plain field specification: type, formatting hint and presence rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarSpec {
    pub kind: ScalarType,
    pub format: Option<String>,
    pub default: Option<Value>,
    pub required: bool,
    pub allow_blank: bool,
    pub allow_null: bool,
}

impl ScalarSpec {
    pub fn new(kind: ScalarType) -> Self {
        Self {
            kind,
            format: None,
            default: None,
            required: false,
            allow_blank: false,
            allow_null: false,
        }
    }

    pub fn string() -> Self {
        Self::new(ScalarType::String)
    }

    pub fn text() -> Self {
        Self::new(ScalarType::Text).allow_blank()
    }

    pub fn integer() -> Self {
        Self::new(ScalarType::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(ScalarType::Boolean)
    }

    pub fn choice<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ScalarType::Choice(
            choices.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn reference(target: &'static str) -> Self {
        Self::new(ScalarType::Reference(target))
    }

    pub fn foreign_key(target: &'static str) -> Self {
        Self::new(ScalarType::ForeignKey(target))
    }

    pub fn crontab() -> Self {
        Self::new(ScalarType::Crontab).with_format("crontab")
    }

    pub fn uptime() -> Self {
        Self::new(ScalarType::Uptime).with_format("uptime")
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Validate one input slot.
    ///
    /// `fill` controls whether an absent value picks up the default and whether
    /// `required` is enforced; partial updates pass `false`. `Ok(None)` means the
    /// field stays absent from the validated payload.
    pub fn validate(&self, raw: Option<&Value>, fill: bool) -> Result<Option<Value>, String> {
        self.validate_with(raw, fill, false)
    }

    pub(crate) fn validate_with(
        &self,
        raw: Option<&Value>,
        fill: bool,
        force_required: bool,
    ) -> Result<Option<Value>, String> {
        match raw {
            None => {
                if !fill {
                    return Ok(None);
                }
                if let Some(default) = &self.default {
                    return Ok(Some(default.clone()));
                }
                if self.required || force_required {
                    return Err(REQUIRED_MESSAGE.to_string());
                }
                Ok(None)
            }
            Some(Value::Null) => {
                if self.allow_null {
                    Ok(Some(Value::Null))
                } else {
                    Err("This field may not be null.".to_string())
                }
            }
            Some(value) => self.coerce(value).map(Some),
        }
    }

    fn coerce(&self, value: &Value) -> Result<Value, String> {
        match &self.kind {
            ScalarType::String | ScalarType::Text | ScalarType::Reference(_) => {
                let text = match value {
                    Value::String(s) => s.trim().to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return Err("Not a valid string.".to_string()),
                };
                self.check_blank(&text)?;
                Ok(Value::String(text))
            }
            ScalarType::Integer => parse_integer(value)
                .map(Value::from)
                .ok_or_else(|| "A valid integer is required.".to_string()),
            ScalarType::Boolean => parse_boolean(value)
                .map(Value::Bool)
                .ok_or_else(|| "Must be a valid boolean.".to_string()),
            ScalarType::Choice(choices) => {
                let key = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return Err(format!("\"{}\" is not a valid choice.", value)),
                };
                if key.is_empty() && self.allow_blank {
                    return Ok(Value::String(key));
                }
                if choices.iter().any(|c| *c == key) {
                    Ok(Value::String(key))
                } else {
                    Err(format!("\"{}\" is not a valid choice.", key))
                }
            }
            ScalarType::Crontab => {
                let Value::String(expr) = value else {
                    return Err("Not a valid string.".to_string());
                };
                let expr = expr.split_whitespace().collect::<Vec<_>>().join(" ");
                if expr.is_empty() {
                    self.check_blank(&expr)?;
                    return Ok(Value::String(expr));
                }
                validate_crontab(&expr)?;
                Ok(Value::String(expr))
            }
            ScalarType::Uptime => {
                let seconds = match value {
                    Value::String(s) => parse_uptime(s.trim()),
                    other => parse_integer(other),
                }
                .ok_or_else(|| "Enter a duration in seconds or as [Nd ]HH:MM:SS.".to_string())?;
                if seconds < 0 {
                    return Err("Ensure this value is greater than or equal to 0.".to_string());
                }
                Ok(Value::from(seconds))
            }
            ScalarType::ForeignKey(_) => {
                if value.as_str().is_some_and(|s| s.trim().is_empty()) {
                    return if self.allow_null || self.allow_blank {
                        Ok(Value::Null)
                    } else {
                        Err("This field may not be blank.".to_string())
                    };
                }
                match parse_integer(value) {
                    Some(pk) if pk > 0 => Ok(Value::from(pk)),
                    _ => Err(format!(
                        "Incorrect type. Expected pk value, received {}.",
                        json_type_name(value)
                    )),
                }
            }
        }
    }

    fn check_blank(&self, text: &str) -> Result<(), String> {
        if text.is_empty() && !self.allow_blank {
            Err("This field may not be blank.".to_string())
        } else {
            Ok(())
        }
    }

    pub fn describe(&self) -> Value {
        let mut out = json!({
            "type": self.kind.type_name(),
            "required": self.required,
            "allow_blank": self.allow_blank,
            "allow_null": self.allow_null,
        });
        if let Some(format) = &self.format {
            out["format"] = json!(format);
        }
        if let Some(default) = &self.default {
            out["default"] = default.clone();
        }
        match &self.kind {
            ScalarType::Choice(choices) => out["choices"] = json!(choices),
            ScalarType::Reference(target) | ScalarType::ForeignKey(target) => {
                out["target"] = json!(target)
            }
            _ => {}
        }
        out
    }
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_uptime(text: &str) -> Option<i64> {
    if let Ok(seconds) = text.parse::<i64>() {
        return Some(seconds);
    }
    let caps = UPTIME_RE.as_ref()?.captures(text)?;
    let part = |i: usize| -> Option<i64> {
        caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
    };
    part(1)?
        .checked_mul(86_400)?
        .checked_add(part(2)? * 3_600 + part(3)? * 60 + part(4)?)
}

/// Five-column crontab check through the scheduler's own parser, with the
/// seconds column pinned to zero.
fn validate_crontab(expr: &str) -> Result<(), String> {
    let columns = expr.split_whitespace().count();
    if columns != 5 {
        return Err(format!(
            "Crontab expression must have 5 fields, got {}.",
            columns
        ));
    }
    let with_seconds = format!("0 {}", expr);
    tokio_cron_scheduler::Job::new(with_seconds.as_str(), |_uuid, _scheduler| {})
        .map(|_| ())
        .map_err(|e| format!("Invalid crontab expression: {}", e))
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
