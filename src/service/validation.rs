//! Form validation: coerce submitted JSON into column values by column type.

use crate::config::{ColumnKind, FormField, FormFieldKind, ResolvedEntity, ResolvedView};
use crate::error::AppError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// Storage format for datetime columns.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const DATETIME_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Coerced form: column assignments in form order, plus association sets to replace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormData {
    pub columns: Vec<(String, Value)>,
    pub associations: Vec<(String, Vec<i64>)>,
}

impl FormData {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.associations.is_empty()
    }
}

pub struct FormValidator;

impl FormValidator {
    /// Validate a create form. All required fields must be present.
    pub fn validate(
        view: &ResolvedView,
        entity: &ResolvedEntity,
        body: &Map<String, Value>,
    ) -> Result<FormData, AppError> {
        Self::check(view, entity, body, false)
    }

    /// Validate only the fields present in body (for edit). Required is not enforced for missing fields.
    pub fn validate_partial(
        view: &ResolvedView,
        entity: &ResolvedEntity,
        body: &Map<String, Value>,
    ) -> Result<FormData, AppError> {
        Self::check(view, entity, body, true)
    }

    fn check(
        view: &ResolvedView,
        entity: &ResolvedEntity,
        body: &Map<String, Value>,
        partial: bool,
    ) -> Result<FormData, AppError> {
        for key in body.keys() {
            if *key == entity.pk_column {
                return Err(AppError::Validation(format!("{} is the primary key and cannot be set", key)));
            }
            if view.form_field(key).is_none() {
                return Err(AppError::Validation(format!("{} is not a form field", key)));
            }
        }

        let mut out = FormData::default();
        for field in &view.form_fields {
            let Some(raw) = body.get(&field.name) else {
                if field.required && !partial {
                    return Err(AppError::Validation(format!("{} is required", field.name)));
                }
                continue;
            };
            match &field.kind {
                FormFieldKind::Scalar { kind } => {
                    let v = coerce_scalar(field, *kind, raw)?;
                    if v.is_null() && field.required {
                        return Err(AppError::Validation(format!("{} is required", field.name)));
                    }
                    out.columns.push((field.name.clone(), v));
                }
                FormFieldKind::ToOne { fk_column, .. } => {
                    let v = match blank_to_null(raw) {
                        Value::Null => Value::Null,
                        other => Value::from(coerce_id(&field.name, other)?),
                    };
                    if v.is_null() && field.required {
                        return Err(AppError::Validation(format!("{} is required", field.name)));
                    }
                    out.columns.push((fk_column.clone(), v));
                }
                FormFieldKind::ManyToMany { .. } => {
                    let mut ids = match raw {
                        Value::Null => Vec::new(),
                        Value::Array(items) => items
                            .iter()
                            .map(|item| coerce_id(&field.name, item))
                            .collect::<Result<Vec<_>, _>>()?,
                        _ => {
                            return Err(AppError::Validation(format!("{} must be a list of ids", field.name)));
                        }
                    };
                    ids.sort_unstable();
                    ids.dedup();
                    out.associations.push((field.name.clone(), ids));
                }
            }
        }
        Ok(out)
    }
}

fn blank_to_null(v: &Value) -> &Value {
    match v {
        Value::String(s) if s.trim().is_empty() => &Value::Null,
        other => other,
    }
}

fn coerce_id(name: &str, v: &Value) -> Result<i64, AppError> {
    let id = match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| AppError::Validation(format!("{} must reference a record id", name)))
}

/// Blank strings and nulls both mean "no value" for non-text columns.
fn non_blank(v: &Value) -> Option<&Value> {
    match blank_to_null(v) {
        Value::Null => None,
        other => Some(other),
    }
}

/// Coerce one scalar value to the column's storage kind.
pub fn coerce_scalar(field: &FormField, kind: ColumnKind, raw: &Value) -> Result<Value, AppError> {
    let name = field.name.as_str();
    match kind {
        ColumnKind::Text => match raw {
            Value::Null => Ok(Value::Null),
            Value::String(s) => {
                if let Some(max) = field.max_length {
                    if s.chars().count() > max as usize {
                        return Err(AppError::Validation(format!(
                            "{} must be at most {} characters",
                            name, max
                        )));
                    }
                }
                Ok(Value::String(s.clone()))
            }
            _ => Err(AppError::Validation(format!("{} must be text", name))),
        },
        ColumnKind::Integer => {
            let Some(raw) = non_blank(raw) else { return Ok(Value::Null) };
            let n = match raw {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15).map(|f| f as i64)),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            n.map(Value::from)
                .ok_or_else(|| AppError::Validation(format!("{} must be an integer", name)))
        }
        ColumnKind::Real => {
            let Some(raw) = non_blank(raw) else { return Ok(Value::Null) };
            let f = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            f.filter(|f| f.is_finite())
                .map(Value::from)
                .ok_or_else(|| AppError::Validation(format!("{} must be a number", name)))
        }
        ColumnKind::Boolean => {
            let Some(raw) = non_blank(raw) else { return Ok(Value::Null) };
            let b = match raw {
                Value::Bool(b) => Some(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Some(false),
                    Some(1) => Some(true),
                    _ => None,
                },
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "y" | "yes" | "on" => Some(true),
                    "false" | "0" | "n" | "no" | "off" => Some(false),
                    _ => None,
                },
                _ => None,
            };
            b.map(Value::Bool)
                .ok_or_else(|| AppError::Validation(format!("{} must be a boolean", name)))
        }
        ColumnKind::DateTime => {
            let Some(raw) = non_blank(raw) else { return Ok(Value::Null) };
            raw.as_str()
                .and_then(parse_datetime)
                .map(|d| Value::String(d.format(DATETIME_FORMAT).to_string()))
                .ok_or_else(|| AppError::Validation(format!("{} must be a date and time", name)))
        }
    }
}

/// Accepts `YYYY-MM-DD[ T]HH:MM[:SS[.f]]`, RFC 3339 (converted to UTC) or a bare date (midnight).
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in DATETIME_INPUT_FORMATS {
        if let Ok(d) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
