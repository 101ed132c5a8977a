use sqlparser::ast::{BinaryOperator, Expr};
use tracing::debug;

use super::value_resolver::ValueResolver;
use crate::Result;
use crate::route::{ListRouteValue, RangeRouteValue, RouteValue, ValueRange};
use crate::statement::ColumnRef;
use crate::types::{ShardingValue, SqlValue};

/// Right-hand side of a predicate on a column
#[derive(Debug, Clone, Copy)]
pub enum PredicateRightValue<'e> {
    /// `column <op> expr`, operator already oriented with the column on the left
    Compare { op: &'e BinaryOperator, value: &'e Expr },
    /// `column IN (expr, ...)`
    InList(&'e [Expr]),
    /// `column BETWEEN low AND high`
    Between { low: &'e Expr, high: &'e Expr },
}

impl<'e> PredicateRightValue<'e> {
    /// Split a predicate into the column it constrains and its right-hand side.
    ///
    /// Negated IN / BETWEEN and column-to-column comparisons yield `None`.
    pub fn from_predicate(predicate: &'e Expr) -> Option<(ColumnRef, PredicateRightValue<'e>)> {
        match predicate {
            Expr::BinaryOp { left, op, right } => {
                if let Some(column) = ColumnRef::from_expr(left) {
                    if ColumnRef::from_expr(right).is_some() {
                        return None;
                    }
                    return Some((column, PredicateRightValue::Compare { op, value: right }));
                }
                let column = ColumnRef::from_expr(right)?;
                let op = Self::mirror(op)?;
                Some((column, PredicateRightValue::Compare { op, value: left }))
            }
            Expr::InList { expr, list, negated: false } => {
                Some((ColumnRef::from_expr(expr)?, PredicateRightValue::InList(list)))
            }
            Expr::Between { expr, negated: false, low, high } => Some((
                ColumnRef::from_expr(expr)?,
                PredicateRightValue::Between { low, high },
            )),
            Expr::Nested(inner) => Self::from_predicate(inner),
            _ => None,
        }
    }

    // `5 < col` is `col > 5`
    fn mirror(op: &BinaryOperator) -> Option<&'static BinaryOperator> {
        match op {
            BinaryOperator::Eq => Some(&BinaryOperator::Eq),
            BinaryOperator::NotEq => Some(&BinaryOperator::NotEq),
            BinaryOperator::Lt => Some(&BinaryOperator::Gt),
            BinaryOperator::LtEq => Some(&BinaryOperator::GtEq),
            BinaryOperator::Gt => Some(&BinaryOperator::Lt),
            BinaryOperator::GtEq => Some(&BinaryOperator::LtEq),
            _ => None,
        }
    }
}

/// Converts one predicate's right-hand side into a route value
pub struct RouteValueBuilder;

impl RouteValueBuilder {
    /// Build the route value for `column` of `table`, or `None` when the predicate cannot narrow routing
    pub fn build(
        column: &str,
        table: &str,
        right_value: &PredicateRightValue<'_>,
        parameters: &[SqlValue],
    ) -> Result<Option<RouteValue>> {
        match right_value {
            PredicateRightValue::Compare { op, value } => Self::from_compare(column, table, op, value, parameters),
            PredicateRightValue::InList(list) => Self::from_in_list(column, table, list, parameters),
            PredicateRightValue::Between { low, high } => Self::from_between(column, table, low, high, parameters),
        }
    }

    fn from_compare(
        column: &str,
        table: &str,
        op: &BinaryOperator,
        value: &Expr,
        parameters: &[SqlValue],
    ) -> Result<Option<RouteValue>> {
        // Only equality narrows; other comparison operators never become ranges
        if *op != BinaryOperator::Eq {
            debug!("Operator {} on {}.{} does not narrow routing", op, table, column);
            return Ok(None);
        }
        let Some(value) = ValueResolver::resolve(value, parameters)? else {
            return Ok(None);
        };
        Ok(ListRouteValue::new(column, table, vec![value]).map(RouteValue::List))
    }

    fn from_in_list(
        column: &str,
        table: &str,
        list: &[Expr],
        parameters: &[SqlValue],
    ) -> Result<Option<RouteValue>> {
        let mut values = Vec::with_capacity(list.len());
        for expr in list {
            match ValueResolver::resolve(expr, parameters)? {
                Some(value) => values.push(value),
                None => debug!("Dropping unresolvable IN element {} for {}.{}", expr, table, column),
            }
        }
        ShardingValue::ensure_same_kind(&values)?;
        Ok(ListRouteValue::new(column, table, values).map(RouteValue::List))
    }

    fn from_between(
        column: &str,
        table: &str,
        low: &Expr,
        high: &Expr,
        parameters: &[SqlValue],
    ) -> Result<Option<RouteValue>> {
        let (Some(low), Some(high)) = (
            ValueResolver::resolve(low, parameters)?,
            ValueResolver::resolve(high, parameters)?,
        ) else {
            return Ok(None);
        };
        match ValueRange::closed(low, high)? {
            Some(range) => Ok(Some(RouteValue::Range(RangeRouteValue::new(column, table, range)))),
            None => {
                debug!("Empty BETWEEN range on {}.{}", table, column);
                Ok(Some(RouteValue::AlwaysFalse))
            }
        }
    }
}
