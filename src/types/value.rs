use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

use crate::{Result, ShardingError};

/// A bound parameter or literal exactly as the statement supplied it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl SqlValue {
    /// Name of the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::Decimal(_) => "decimal",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Date(_) => "date",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::Uuid(_) => "uuid",
            SqlValue::Bytes(_) => "bytes",
            SqlValue::Json(_) => "json",
        }
    }

    /// Parse a numeric literal: integral text that fits i64 becomes Int, anything else Decimal
    pub fn from_number_literal(text: &str) -> Option<SqlValue> {
        if let Ok(i) = text.parse::<i64>() {
            return Some(SqlValue::Int(i));
        }
        if let Ok(d) = text.parse::<Decimal>() {
            return Some(SqlValue::Decimal(d));
        }
        Decimal::from_scientific(text).ok().map(SqlValue::Decimal)
    }

    /// Arithmetic negation for numeric values, used for `-literal`
    pub fn negate(&self) -> Option<SqlValue> {
        match self {
            SqlValue::Int(i) => i.checked_neg().map(SqlValue::Int),
            SqlValue::Decimal(d) => Some(SqlValue::Decimal(-*d)),
            SqlValue::Float(f) => Some(SqlValue::Float(-f)),
            _ => None,
        }
    }

    /// Non-negative integer view, used by pagination bounds
    pub fn as_non_negative_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) if *i >= 0 => Some(*i),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => SqlValue::Null,
            serde_json::Value::Bool(b) => SqlValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else if let Some(d) = SqlValue::from_number_literal(&n.to_string()) {
                    d
                } else {
                    SqlValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => SqlValue::Text(s),
            other => SqlValue::Json(other),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<ShardingValue> for SqlValue {
    fn from(value: ShardingValue) -> Self {
        match value {
            ShardingValue::Bool(b) => SqlValue::Bool(b),
            ShardingValue::Int(i) => SqlValue::Int(i),
            ShardingValue::Decimal(d) => SqlValue::Decimal(d),
            ShardingValue::Float(f) => SqlValue::Float(f),
            ShardingValue::Text(s) => SqlValue::Text(s),
            ShardingValue::Date(d) => SqlValue::Date(d),
            ShardingValue::Timestamp(t) => SqlValue::Timestamp(t),
            ShardingValue::Uuid(u) => SqlValue::Uuid(u),
        }
    }
}

impl fmt::Display for SqlValue {
    /// Renders the value as a SQL literal
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            SqlValue::Int(i) => write!(f, "{i}"),
            SqlValue::Decimal(d) => write!(f, "{d}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            SqlValue::Date(d) => write!(f, "'{d}'"),
            SqlValue::Timestamp(t) => write!(f, "'{t}'"),
            SqlValue::Uuid(u) => write!(f, "'{u}'"),
            SqlValue::Bytes(bytes) => {
                write!(f, "X'")?;
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                write!(f, "'")
            }
            SqlValue::Json(j) => write!(f, "'{}'", j.to_string().replace('\'', "''")),
        }
    }
}

/// Type tag of a comparable sharding value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Decimal,
    Float,
    Text,
    Date,
    Timestamp,
    Uuid,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Decimal => "decimal",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Date => "date",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Uuid => "uuid",
        };
        f.write_str(name)
    }
}

/// A value that supports ordering and equality, usable as a route value
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ShardingValue {
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
}

impl ShardingValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ShardingValue::Bool(_) => ValueKind::Bool,
            ShardingValue::Int(_) => ValueKind::Int,
            ShardingValue::Decimal(_) => ValueKind::Decimal,
            ShardingValue::Float(_) => ValueKind::Float,
            ShardingValue::Text(_) => ValueKind::Text,
            ShardingValue::Date(_) => ValueKind::Date,
            ShardingValue::Timestamp(_) => ValueKind::Timestamp,
            ShardingValue::Uuid(_) => ValueKind::Uuid,
        }
    }

    /// Compare two values of the same kind; comparing across kinds is a type error
    pub fn try_compare(&self, other: &ShardingValue) -> Result<Ordering> {
        if self.kind() != other.kind() {
            return Err(ShardingError::ShardingValueType(format!(
                "cannot compare {} value {} with {} value {}",
                self.kind(),
                self,
                other.kind(),
                other
            )));
        }
        Ok(self.cmp(other))
    }

    /// Check that every value in the slice shares one kind
    pub fn ensure_same_kind<'a, I>(values: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a ShardingValue>,
    {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return Ok(());
        };
        for value in iter {
            first.try_compare(value)?;
        }
        Ok(())
    }
}

impl TryFrom<SqlValue> for ShardingValue {
    type Error = ShardingError;

    fn try_from(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Bool(b) => Ok(ShardingValue::Bool(b)),
            SqlValue::Int(i) => Ok(ShardingValue::Int(i)),
            SqlValue::Decimal(d) => Ok(ShardingValue::Decimal(d)),
            SqlValue::Float(f) => Ok(ShardingValue::Float(f)),
            SqlValue::Text(s) => Ok(ShardingValue::Text(s)),
            SqlValue::Date(d) => Ok(ShardingValue::Date(d)),
            SqlValue::Timestamp(t) => Ok(ShardingValue::Timestamp(t)),
            SqlValue::Uuid(u) => Ok(ShardingValue::Uuid(u)),
            other @ (SqlValue::Null | SqlValue::Bytes(_) | SqlValue::Json(_)) => {
                Err(ShardingError::ShardingValueType(format!(
                    "sharding value must be comparable, got {} value {}",
                    other.type_name(),
                    other
                )))
            }
        }
    }
}

impl From<i64> for ShardingValue {
    fn from(value: i64) -> Self {
        ShardingValue::Int(value)
    }
}

impl From<&str> for ShardingValue {
    fn from(value: &str) -> Self {
        ShardingValue::Text(value.to_string())
    }
}

impl PartialEq for ShardingValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ShardingValue {}

impl PartialOrd for ShardingValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ShardingValue {
    // Values of different kinds order by kind so the ordering stays total;
    // callers that care about mixing use try_compare
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ShardingValue::Bool(a), ShardingValue::Bool(b)) => a.cmp(b),
            (ShardingValue::Int(a), ShardingValue::Int(b)) => a.cmp(b),
            (ShardingValue::Decimal(a), ShardingValue::Decimal(b)) => a.cmp(b),
            (ShardingValue::Float(a), ShardingValue::Float(b)) => a.total_cmp(b),
            (ShardingValue::Text(a), ShardingValue::Text(b)) => a.cmp(b),
            (ShardingValue::Date(a), ShardingValue::Date(b)) => a.cmp(b),
            (ShardingValue::Timestamp(a), ShardingValue::Timestamp(b)) => a.cmp(b),
            (ShardingValue::Uuid(a), ShardingValue::Uuid(b)) => a.cmp(b),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl Hash for ShardingValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            ShardingValue::Bool(b) => b.hash(state),
            ShardingValue::Int(i) => i.hash(state),
            ShardingValue::Decimal(d) => d.normalize().hash(state),
            ShardingValue::Float(f) => f.to_bits().hash(state),
            ShardingValue::Text(s) => s.hash(state),
            ShardingValue::Date(d) => d.hash(state),
            ShardingValue::Timestamp(t) => t.hash(state),
            ShardingValue::Uuid(u) => u.hash(state),
        }
    }
}

impl fmt::Display for ShardingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        SqlValue::from(self.clone()).fmt(f)
    }
}
