//! Field validation against derived rules.

use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::error;

use crate::schema::{Constraint, FieldRule, ParameterSchema};

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path, e.g. `address.city`
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn empty(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("field {} cannot be empty", field);
        Self { field, message }
    }
}

/// Checks one field value against its derived rule and constraints.
pub trait Validator: Send + Sync {
    fn validate(
        &self,
        field: &str,
        value: &Value,
        rule: &FieldRule,
        constraints: &[Constraint],
    ) -> Vec<Violation>;
}

/// Default validator: type rules first, constraints only once the type fits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl Validator for SchemaValidator {
    fn validate(
        &self,
        field: &str,
        value: &Value,
        rule: &FieldRule,
        constraints: &[Constraint],
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        check_rule(field, value, rule, &mut violations);
        if violations.is_empty() {
            for constraint in constraints {
                if let Some(message) = check_constraint(value, constraint) {
                    violations.push(Violation::new(field, message));
                }
            }
        }
        violations
    }
}

fn check_rule(field: &str, value: &Value, rule: &FieldRule, violations: &mut Vec<Violation>) {
    match rule {
        FieldRule::Primitive(kind) | FieldRule::EnumBackingType(kind) => {
            if !kind.matches(value) {
                violations.push(Violation::new(
                    field,
                    format!("This value should be of type {}.", kind),
                ));
            }
        }
        FieldRule::UnionOf(members) => {
            let accepted = members.iter().any(|member| {
                let mut scratch = Vec::new();
                check_rule(field, value, member, &mut scratch);
                scratch.is_empty()
            });
            if !accepted {
                violations.push(Violation::new(
                    field,
                    format!("This value should be of type {}.", describe(rule)),
                ));
            }
        }
        FieldRule::Composite(schema) => check_composite(field, value, schema, violations),
    }
}

fn check_composite(
    field: &str,
    value: &Value,
    schema: &ParameterSchema,
    violations: &mut Vec<Violation>,
) {
    let Some(object) = value.as_object() else {
        violations.push(Violation::new(field, "This value should be of type object."));
        return;
    };

    for nested in schema.fields() {
        let path = format!("{}.{}", field, nested.name());
        match object.get(nested.name()) {
            None | Some(Value::Null) if nested.is_required() => {
                violations.push(Violation::empty(path));
            }
            None => {}
            Some(inner) => {
                if let Some(rule) = nested.rule() {
                    violations.extend(SchemaValidator.validate(
                        &path,
                        inner,
                        rule,
                        nested.constraints(),
                    ));
                }
            }
        }
        if !violations.is_empty() {
            return;
        }
    }
}

fn describe(rule: &FieldRule) -> String {
    match rule {
        FieldRule::Primitive(kind) | FieldRule::EnumBackingType(kind) => kind.to_string(),
        FieldRule::UnionOf(members) => members.iter().map(describe).collect::<Vec<_>>().join("|"),
        FieldRule::Composite(_) => "object".to_string(),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn check_constraint(value: &Value, constraint: &Constraint) -> Option<String> {
    if value.is_null() {
        return None;
    }
    match constraint {
        Constraint::Min(min) => numeric(value)
            .filter(|n| n < min)
            .map(|_| format!("This value should be {} or more.", min)),
        Constraint::Max(max) => numeric(value)
            .filter(|n| n > max)
            .map(|_| format!("This value should be {} or less.", max)),
        Constraint::MinLength(min) => length(value).filter(|len| len < min).map(|_| {
            format!(
                "This value is too short. It should have {} characters or more.",
                min
            )
        }),
        Constraint::MaxLength(max) => length(value).filter(|len| len > max).map(|_| {
            format!(
                "This value is too long. It should have {} characters or less.",
                max
            )
        }),
        Constraint::NotBlank => {
            let blank = match value {
                Value::String(s) => s.trim().is_empty(),
                Value::Array(items) => items.is_empty(),
                _ => false,
            };
            blank.then(|| "This value should not be blank.".to_string())
        }
        Constraint::Pattern(pattern) => {
            let subject = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            match compiled(pattern) {
                Some(regex) if regex.is_match(&subject) => None,
                Some(_) => Some("This value is not valid.".to_string()),
                None => Some("This value cannot be checked against its pattern.".to_string()),
            }
        }
    }
}

/// Compiled `pattern` constraints, keyed by their source.
fn compiled(pattern: &'static str) -> Option<Regex> {
    static CACHE: OnceLock<Mutex<HashMap<&'static str, Regex>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    let mut cache = cache.lock();
    if let Some(regex) = cache.get(pattern) {
        return Some(regex.clone());
    }
    match Regex::new(pattern) {
        Ok(regex) => {
            cache.insert(pattern, regex.clone());
            Some(regex)
        }
        Err(e) => {
            error!("Invalid pattern constraint '{}': {}", pattern, e);
            None
        }
    }
}
