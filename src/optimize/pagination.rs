use serde::Serialize;
use sqlparser::ast::{Expr, LimitClause, Query};
use tracing::debug;

use super::value_resolver::ValueResolver;
use crate::types::SqlValue;
use crate::{Result, ShardingError};

/// One resolved pagination bound and the parameter it came from, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationValue {
    value: i64,
    parameter_index: Option<usize>,
}

impl PaginationValue {
    pub fn new(value: i64, parameter_index: Option<usize>) -> Self {
        Self { value, parameter_index }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn parameter_index(&self) -> Option<usize> {
        self.parameter_index
    }
}

/// OFFSET / LIMIT of a query, kept for the rewrite and merge stages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    offset: Option<PaginationValue>,
    row_count: Option<PaginationValue>,
    #[serde(skip)]
    parameters: Vec<SqlValue>,
}

impl Pagination {
    pub fn new(offset: Option<PaginationValue>, row_count: Option<PaginationValue>, parameters: Vec<SqlValue>) -> Self {
        Self {
            offset,
            row_count,
            parameters,
        }
    }

    pub fn offset(&self) -> Option<&PaginationValue> {
        self.offset.as_ref()
    }

    pub fn row_count(&self) -> Option<&PaginationValue> {
        self.row_count.as_ref()
    }

    pub fn parameters(&self) -> &[SqlValue] {
        &self.parameters
    }

    pub fn actual_offset(&self) -> i64 {
        self.offset.map_or(0, |o| o.value)
    }

    pub fn actual_row_count(&self) -> Option<i64> {
        self.row_count.map(|r| r.value)
    }

    /// Rows every shard has to return so the merged result can apply the window again
    pub fn revised_row_count(&self) -> Option<i64> {
        self.actual_row_count()
            .map(|count| count.saturating_add(self.actual_offset()))
    }

    /// Parameters for the per-shard statement: offset reset to 0, row count widened
    pub fn revised_parameters(&self) -> Vec<SqlValue> {
        let mut parameters = self.parameters.clone();
        if let Some(index) = self.offset.and_then(|o| o.parameter_index)
            && let Some(slot) = parameters.get_mut(index)
        {
            *slot = SqlValue::Int(0);
        }
        if let Some(index) = self.row_count.and_then(|r| r.parameter_index)
            && let Some(revised) = self.revised_row_count()
            && let Some(slot) = parameters.get_mut(index)
        {
            *slot = SqlValue::Int(revised);
        }
        parameters
    }
}

/// Extracts OFFSET / LIMIT / FETCH bounds from a query
pub struct PaginationResolver;

impl PaginationResolver {
    /// `None` when the query has no bound at all
    pub fn resolve(query: &Query, parameters: &[SqlValue]) -> Result<Option<Pagination>> {
        let (offset, limit) = match &query.limit_clause {
            Some(LimitClause::LimitOffset { limit, offset, .. }) => {
                (offset.as_ref().map(|o| &o.value), limit.as_ref())
            }
            Some(LimitClause::OffsetCommaLimit { offset, limit }) => (Some(offset), Some(limit)),
            None => (None, None),
        };
        let limit = limit.or_else(|| query.fetch.as_ref().and_then(|fetch| fetch.quantity.as_ref()));

        let offset = offset.map(|expr| Self::resolve_bound(expr, parameters)).transpose()?;
        let row_count = limit.map(|expr| Self::resolve_bound(expr, parameters)).transpose()?;
        if offset.is_none() && row_count.is_none() {
            return Ok(None);
        }
        debug!("Pagination offset {:?}, row count {:?}", offset, row_count);
        Ok(Some(Pagination::new(offset, row_count, parameters.to_vec())))
    }

    fn resolve_bound(expr: &Expr, parameters: &[SqlValue]) -> Result<PaginationValue> {
        let value = ValueResolver::resolve_sql_value(expr, parameters)?
            .ok_or_else(|| ShardingError::NotSupported(format!("pagination bound {expr}")))?;
        let value = value.as_non_negative_i64().ok_or_else(|| {
            ShardingError::InvalidParameter(format!("pagination bound must be a non-negative integer, got {value}"))
        })?;
        Ok(PaginationValue::new(value, ValueResolver::parameter_index(expr)))
    }
}
