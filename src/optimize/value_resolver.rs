use sqlparser::ast::{Expr, UnaryOperator, Value, visit_expressions, visit_expressions_mut};
use std::ops::ControlFlow;
use tracing::trace;

use crate::statement::SqlStatementParser;
use crate::types::{ShardingValue, SqlValue};
use crate::{Result, ShardingError};

/// Resolves parameter markers and literals to values
pub struct ValueResolver;

impl ValueResolver {
    /// Resolve an expression to the value it binds.
    ///
    /// Returns `Ok(None)` for expressions that are neither a marker nor a literal
    /// (columns, function calls, arithmetic). A marker that names no parameter is an error.
    pub fn resolve_sql_value(expr: &Expr, parameters: &[SqlValue]) -> Result<Option<SqlValue>> {
        match expr {
            Expr::Value(value) => Self::resolve_value(&value.value, parameters),
            Expr::Nested(inner) => Self::resolve_sql_value(inner, parameters),
            Expr::UnaryOp { op: UnaryOperator::Plus, expr } => Self::resolve_sql_value(expr, parameters),
            Expr::UnaryOp { op: UnaryOperator::Minus, expr } => {
                Ok(Self::resolve_sql_value(expr, parameters)?.and_then(|v| v.negate()))
            }
            _ => {
                trace!("Expression is not a marker or literal: {}", expr);
                Ok(None)
            }
        }
    }

    /// Resolve an expression to a comparable sharding value
    pub fn resolve(expr: &Expr, parameters: &[SqlValue]) -> Result<Option<ShardingValue>> {
        Self::resolve_sql_value(expr, parameters)?
            .map(ShardingValue::try_from)
            .transpose()
    }

    /// Index of the parameter an expression refers to, if it is a marker
    pub fn parameter_index(expr: &Expr) -> Option<usize> {
        match expr {
            Expr::Value(value) => match &value.value {
                Value::Placeholder(marker) => SqlStatementParser::parameter_index(marker),
                _ => None,
            },
            Expr::Nested(inner) => Self::parameter_index(inner),
            _ => None,
        }
    }

    /// Whether an expression is a parameter marker
    pub fn is_parameter_marker(expr: &Expr) -> bool {
        match expr {
            Expr::Value(value) => matches!(value.value, Value::Placeholder(_)),
            Expr::Nested(inner) => Self::is_parameter_marker(inner),
            _ => false,
        }
    }

    /// Whether a parameter marker appears anywhere inside an expression
    pub fn contains_parameter_marker(expr: &Expr) -> bool {
        visit_expressions(expr, |e| match e {
            Expr::Value(value) if matches!(value.value, Value::Placeholder(_)) => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        })
        .is_break()
    }

    /// Bind every marker nested in `expr` in order of appearance.
    ///
    /// Returns the expression with each marker rewritten to `?` together with the
    /// parameters those markers refer to, so the pair can be sent to a node as is.
    pub fn bind_nested_markers(expr: &Expr, parameters: &[SqlValue]) -> Result<(Expr, Vec<SqlValue>)> {
        let mut rewritten = expr.clone();
        let mut bound = Vec::new();
        let flow = visit_expressions_mut(&mut rewritten, |e| {
            if let Expr::Value(value) = e
                && let Value::Placeholder(marker) = &mut value.value
            {
                match Self::resolve_parameter(marker, parameters) {
                    Ok(parameter) => {
                        bound.push(parameter);
                        *marker = "?".to_string();
                    }
                    Err(err) => return ControlFlow::Break(err),
                }
            }
            ControlFlow::Continue(())
        });
        if let ControlFlow::Break(err) = flow {
            return Err(err);
        }
        Ok((rewritten, bound))
    }

    fn resolve_value(value: &Value, parameters: &[SqlValue]) -> Result<Option<SqlValue>> {
        match value {
            Value::Placeholder(marker) => Self::resolve_parameter(marker, parameters).map(Some),
            Value::Number(text, _) => Ok(SqlValue::from_number_literal(text)),
            Value::SingleQuotedString(s)
            | Value::DoubleQuotedString(s)
            | Value::NationalStringLiteral(s)
            | Value::EscapedStringLiteral(s) => Ok(Some(SqlValue::Text(s.clone()))),
            Value::HexStringLiteral(hex) => Ok(Self::decode_hex(hex).map(SqlValue::Bytes)),
            Value::Boolean(b) => Ok(Some(SqlValue::Bool(*b))),
            Value::Null => Ok(Some(SqlValue::Null)),
            _ => Ok(None),
        }
    }

    fn resolve_parameter(marker: &str, parameters: &[SqlValue]) -> Result<SqlValue> {
        let index = SqlStatementParser::parameter_index(marker).ok_or_else(|| {
            ShardingError::InvalidParameter(format!("unsupported parameter marker {marker}"))
        })?;
        parameters.get(index).cloned().ok_or_else(|| {
            ShardingError::InvalidParameter(format!(
                "parameter marker {} refers to index {} but only {} parameter(s) were bound",
                marker,
                index,
                parameters.len()
            ))
        })
    }

    fn decode_hex(hex: &str) -> Option<Vec<u8>> {
        if !hex.is_ascii() || hex.len() % 2 != 0 {
            return None;
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::ast::{Ident, ValueWithSpan};
    use sqlparser::tokenizer::Span;

    fn value_expr(value: Value) -> Expr {
        Expr::Value(ValueWithSpan {
            value,
            span: Span::empty(),
        })
    }

    #[test]
    fn test_resolve_parameter_marker() {
        let params = vec![SqlValue::Int(42), SqlValue::Text("A".into())];
        let expr = value_expr(Value::Placeholder("?2".into()));
        assert_eq!(
            ValueResolver::resolve(&expr, &params).unwrap(),
            Some(ShardingValue::from("A"))
        );
        assert_eq!(ValueResolver::parameter_index(&expr), Some(1));
        assert!(ValueResolver::is_parameter_marker(&expr));
    }

    #[test]
    fn test_out_of_range_marker_is_error() {
        let expr = value_expr(Value::Placeholder("?3".into()));
        let err = ValueResolver::resolve(&expr, &[SqlValue::Int(1)]).unwrap_err();
        assert!(matches!(err, ShardingError::InvalidParameter(_)));
    }

    #[test]
    fn test_named_marker_is_error() {
        let expr = value_expr(Value::Placeholder(":user".into()));
        assert!(ValueResolver::resolve(&expr, &[SqlValue::Int(1)]).is_err());
    }

    #[test]
    fn test_resolve_literals() {
        let params = [];
        assert_eq!(
            ValueResolver::resolve(&value_expr(Value::Number("12".into(), false)), &params).unwrap(),
            Some(ShardingValue::Int(12))
        );
        assert_eq!(
            ValueResolver::resolve(&value_expr(Value::SingleQuotedString("a".into())), &params).unwrap(),
            Some(ShardingValue::from("a"))
        );
        let negative = Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: Box::new(value_expr(Value::Number("5".into(), false))),
        };
        assert_eq!(
            ValueResolver::resolve(&negative, &params).unwrap(),
            Some(ShardingValue::Int(-5))
        );
    }

    #[test]
    fn test_non_literal_is_unresolved() {
        let column = Expr::Identifier(Ident::new("user_id"));
        assert_eq!(ValueResolver::resolve(&column, &[]).unwrap(), None);
    }

    #[test]
    fn test_null_is_not_comparable() {
        let err = ValueResolver::resolve(&value_expr(Value::Null), &[]).unwrap_err();
        assert!(matches!(err, ShardingError::ShardingValueType(_)));
        let err = ValueResolver::resolve(&value_expr(Value::Placeholder("?1".into())), &[SqlValue::Null])
            .unwrap_err();
        assert!(matches!(err, ShardingError::ShardingValueType(_)));
    }

    #[test]
    fn test_nested_markers_bound_in_order() {
        let expr = sqlparser::parser::Parser::new(&sqlparser::dialect::MySqlDialect {})
            .try_with_sql("concat(?2, 'x', ?1)")
            .unwrap()
            .parse_expr()
            .unwrap();
        assert!(ValueResolver::contains_parameter_marker(&expr));
        assert!(!ValueResolver::is_parameter_marker(&expr));
        let (rewritten, bound) =
            ValueResolver::bind_nested_markers(&expr, &[SqlValue::Int(1), SqlValue::Text("a".into())]).unwrap();
        assert_eq!(rewritten.to_string(), "concat(?, 'x', ?)");
        assert_eq!(bound, vec![SqlValue::Text("a".into()), SqlValue::Int(1)]);
        assert!(ValueResolver::bind_nested_markers(&expr, &[SqlValue::Int(1)]).is_err());
        assert!(!ValueResolver::contains_parameter_marker(&value_expr(Value::Number("1".into(), false))));
    }

    #[test]
    fn test_hex_literal_is_bytes() {
        let expr = value_expr(Value::HexStringLiteral("AB01".into()));
        assert_eq!(
            ValueResolver::resolve_sql_value(&expr, &[]).unwrap(),
            Some(SqlValue::Bytes(vec![0xab, 0x01]))
        );
    }
}
