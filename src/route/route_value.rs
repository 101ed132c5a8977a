use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::Result;
use crate::types::ShardingValue;

/// Closed interval `[lower, upper]` over one kind of sharding value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ValueRange {
    lower: ShardingValue,
    upper: ShardingValue,
}

impl ValueRange {
    /// Build `[lower, upper]`; `None` when the interval is empty
    pub fn closed(lower: ShardingValue, upper: ShardingValue) -> Result<Option<Self>> {
        match lower.try_compare(&upper)? {
            Ordering::Greater => Ok(None),
            _ => Ok(Some(Self { lower, upper })),
        }
    }

    pub fn lower(&self) -> &ShardingValue {
        &self.lower
    }

    pub fn upper(&self) -> &ShardingValue {
        &self.upper
    }

    pub fn contains(&self, value: &ShardingValue) -> Result<bool> {
        Ok(self.lower.try_compare(value)? != Ordering::Greater
            && value.try_compare(&self.upper)? != Ordering::Greater)
    }

    /// Overlap of two intervals; `None` when they are disjoint
    pub fn intersect(&self, other: &ValueRange) -> Result<Option<ValueRange>> {
        let lower = match self.lower.try_compare(&other.lower)? {
            Ordering::Less => other.lower.clone(),
            _ => self.lower.clone(),
        };
        let upper = match self.upper.try_compare(&other.upper)? {
            Ordering::Greater => other.upper.clone(),
            _ => self.upper.clone(),
        };
        ValueRange::closed(lower, upper)
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.lower, self.upper)
    }
}

/// A non-empty set of values one sharding column may take
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ListRouteValue {
    column: String,
    table: String,
    values: Vec<ShardingValue>,
}

impl ListRouteValue {
    /// Build a list route value; duplicates are dropped, `None` when no value remains
    pub fn new(column: &str, table: &str, values: Vec<ShardingValue>) -> Option<Self> {
        let mut seen = HashSet::with_capacity(values.len());
        let distinct: Vec<ShardingValue> = values.into_iter().filter(|value| seen.insert(value.clone())).collect();
        if distinct.is_empty() {
            return None;
        }
        Some(Self {
            column: column.to_lowercase(),
            table: table.to_lowercase(),
            values: distinct,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn values(&self) -> &[ShardingValue] {
        &self.values
    }
}

/// A closed interval one sharding column must fall into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RangeRouteValue {
    column: String,
    table: String,
    range: ValueRange,
}

impl RangeRouteValue {
    pub fn new(column: &str, table: &str, range: ValueRange) -> Self {
        Self {
            column: column.to_lowercase(),
            table: table.to_lowercase(),
            range,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn range(&self) -> &ValueRange {
        &self.range
    }
}

/// Resolved constraint on one sharding column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteValue {
    List(ListRouteValue),
    Range(RangeRouteValue),
    /// Provably matches nothing
    AlwaysFalse,
}

impl RouteValue {
    /// `(column, table)` this value constrains; `None` for the always-false sentinel
    pub fn column_key(&self) -> Option<(&str, &str)> {
        match self {
            RouteValue::List(list) => Some((list.column(), list.table())),
            RouteValue::Range(range) => Some((range.column(), range.table())),
            RouteValue::AlwaysFalse => None,
        }
    }

    pub fn is_always_false(&self) -> bool {
        matches!(self, RouteValue::AlwaysFalse)
    }

    pub fn as_list(&self) -> Option<&ListRouteValue> {
        match self {
            RouteValue::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&RangeRouteValue> {
        match self {
            RouteValue::Range(range) => Some(range),
            _ => None,
        }
    }
}

impl fmt::Display for RouteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteValue::List(list) => {
                write!(f, "{}.{} IN (", list.table, list.column)?;
                for (i, value) in list.values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            RouteValue::Range(range) => {
                write!(f, "{}.{} IN {}", range.table, range.column, range.range)
            }
            RouteValue::AlwaysFalse => write!(f, "FALSE"),
        }
    }
}
