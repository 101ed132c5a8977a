use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, dialect_from_str};
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::{Token, Tokenizer};
use tracing::debug;

use crate::{Result, ShardingError};

/// Adapter over the external SQL parser that also gives every parameter marker a stable index
pub struct SqlStatementParser;

impl SqlStatementParser {
    /// Look up a dialect by name (`generic`, `mysql`, `postgresql`, ...)
    pub fn dialect(name: &str) -> Result<Box<dyn Dialect>> {
        dialect_from_str(name)
            .ok_or_else(|| ShardingError::Config(format!("unknown SQL dialect: {name}")))
    }

    /// Parse SQL text into statements, numbering anonymous `?` markers in textual order
    pub fn parse(sql: &str, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let tokens = Tokenizer::new(dialect, sql)
            .tokenize()
            .map_err(|e| ParserError::TokenizerError(e.to_string()))?;
        let tokens = Self::number_parameter_markers(tokens);
        let statements = Parser::new(dialect).with_tokens(tokens).parse_statements()?;
        debug!("Parsed {} statement(s)", statements.len());
        Ok(statements)
    }

    /// Parse SQL text that must hold exactly one statement
    pub fn parse_one(sql: &str, dialect: &dyn Dialect) -> Result<Statement> {
        let mut statements = Self::parse(sql, dialect)?;
        match statements.len() {
            1 => Ok(statements.remove(0)),
            n => Err(ShardingError::NotSupported(format!(
                "expected exactly one statement, found {n}"
            ))),
        }
    }

    /// Rewrite each anonymous `?` into `?N` where N counts anonymous markers from 1.
    /// Explicitly numbered markers (`?3`, `$2`) are left alone.
    pub fn number_parameter_markers(tokens: Vec<Token>) -> Vec<Token> {
        let mut next_index = 0usize;
        tokens
            .into_iter()
            .map(|token| match token {
                Token::Placeholder(marker) if marker == "?" => {
                    next_index += 1;
                    Token::Placeholder(format!("?{next_index}"))
                }
                other => other,
            })
            .collect()
    }

    /// Zero-based parameter index of a numbered marker (`?1` and `$1` both map to 0)
    pub fn parameter_index(marker: &str) -> Option<usize> {
        let digits = marker
            .strip_prefix('?')
            .or_else(|| marker.strip_prefix('$'))?;
        let number = digits.parse::<usize>().ok()?;
        number.checked_sub(1)
    }
}
