//! Allow-listed partial-update SET clause construction.
//!
//! Client-supplied field names are never written into SQL text. Each entity
//! declares a static table of mutable columns with a declared value kind;
//! only those column names reach the statement, and every value is bound as
//! a query parameter in mapping order.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite};
use thiserror::Error;

/// Declared value type of a mutable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Real,
}

/// One entry in an entity's mutable-column allow-list.
#[derive(Debug)]
pub struct FieldSpec {
    pub column: &'static str,
    pub kind: FieldKind,
}

/// Mutable columns of a market. `img_name` is deliberately absent: it is
/// only written through the image-upload path, never from a client field.
pub const MARKET_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        column: "name",
        kind: FieldKind::Text,
    },
    FieldSpec {
        column: "startdate",
        kind: FieldKind::Date,
    },
    FieldSpec {
        column: "enddate",
        kind: FieldKind::Date,
    },
];

/// Mutable columns of a booth. `number` is text: "12-A" is a valid booth
/// number.
pub const BOOTH_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        column: "name",
        kind: FieldKind::Text,
    },
    FieldSpec {
        column: "number",
        kind: FieldKind::Text,
    },
    FieldSpec {
        column: "latitude",
        kind: FieldKind::Real,
    },
    FieldSpec {
        column: "longitude",
        kind: FieldKind::Real,
    },
];

#[derive(Debug, Error, PartialEq)]
pub enum UpdateError {
    #[error("field `{0}` cannot be updated")]
    UnknownField(String),
    #[error("invalid value for field `{0}`")]
    InvalidValue(&'static str),
}

/// A typed, coerced value ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Real(f64),
}

/// An ordered set of column assignments, all drawn from an allow-list.
#[derive(Debug, Default)]
pub struct UpdateSet {
    entries: Vec<(&'static str, FieldValue)>,
}

impl UpdateSet {
    /// Validate and coerce client-supplied `(field, value)` pairs against
    /// the given allow-list, preserving iteration order.
    pub fn from_pairs<'a, I>(pairs: I, allowed: &'static [FieldSpec]) -> Result<Self, UpdateError>
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let mut entries = Vec::new();
        for (name, value) in pairs {
            let spec = allowed
                .iter()
                .find(|spec| spec.column == name)
                .ok_or_else(|| UpdateError::UnknownField(name.to_string()))?;
            entries.push((spec.column, coerce(spec, value)?));
        }
        Ok(Self { entries })
    }

    /// Append an assignment outside the client mapping (image-key writes).
    pub fn push(&mut self, column: &'static str, value: FieldValue) {
        self.entries.push((column, value));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Emit `col1 = ?, col2 = ?, ...` onto the builder. Column names come
    /// only from `FieldSpec` tables; values are always bound parameters.
    pub fn apply(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        for (i, (column, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(*column);
            builder.push(" = ");
            match value {
                FieldValue::Text(v) => builder.push_bind(v.clone()),
                FieldValue::Date(v) => builder.push_bind(*v),
                FieldValue::Real(v) => builder.push_bind(*v),
            };
        }
    }
}

fn coerce(spec: &FieldSpec, value: &Value) -> Result<FieldValue, UpdateError> {
    match spec.kind {
        FieldKind::Text => match value {
            Value::String(s) if !s.is_empty() => Ok(FieldValue::Text(s.clone())),
            _ => Err(UpdateError::InvalidValue(spec.column)),
        },
        FieldKind::Date => value
            .as_str()
            .and_then(parse_date)
            .map(FieldValue::Date)
            .ok_or(UpdateError::InvalidValue(spec.column)),
        FieldKind::Real => match value {
            Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Real)
                .ok_or(UpdateError::InvalidValue(spec.column)),
            Value::String(s) => s
                .parse::<f64>()
                .ok()
                .map(FieldValue::Real)
                .ok_or(UpdateError::InvalidValue(spec.column)),
            _ => Err(UpdateError::InvalidValue(spec.column)),
        },
    }
}

/// Accepts plain `YYYY-MM-DD` or an RFC 3339 date-time (mobile clients send
/// `Date.toISOString()`), keeping the calendar date.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|dt| dt.date_naive())
}
