use serde::Serialize;
use tracing::debug;

use super::OptimizeContext;
use super::insert_condition::{InsertClause, InsertSource};
use super::value_resolver::ValueResolver;
use crate::types::{ShardingValue, SqlValue};
use crate::{Result, ShardingError};

/// Key column of an INSERT and the values it takes, one per row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedKey {
    column_name: String,
    is_generated: bool,
    generated_values: Vec<ShardingValue>,
}

impl GeneratedKey {
    pub fn new(column_name: &str, is_generated: bool, generated_values: Vec<ShardingValue>) -> Self {
        Self {
            column_name: column_name.to_lowercase(),
            is_generated,
            generated_values,
        }
    }

    /// Work out the key column of an INSERT.
    ///
    /// When the statement supplies the column, its per-row values are collected and
    /// nothing is generated. Otherwise the key generator is asked for one value per
    /// VALUES row. `None` when the table has no key column configured.
    ///
    /// Drawing from the generator is the only step of optimization that reads outside
    /// state: optimizing the same INSERT twice yields different keys. Everything after
    /// this call is a pure function of the statement, the parameters and the key.
    pub fn resolve(
        context: &OptimizeContext<'_>,
        clause: &InsertClause<'_>,
        parameters: &[SqlValue],
    ) -> Result<Option<GeneratedKey>> {
        let Some(column) = context.sharding_rule().generate_key_column(&clause.table) else {
            return Ok(None);
        };
        let key = match (clause.column_index(&column), &clause.source) {
            (Some(index), InsertSource::Rows(rows)) => {
                let mut values = Vec::with_capacity(rows.len());
                for row in rows {
                    let Some(expr) = row.get(index) else {
                        continue;
                    };
                    match ValueResolver::resolve_sql_value(expr, parameters)? {
                        Some(SqlValue::Null) | None => {}
                        Some(value) => values.push(ShardingValue::try_from(value)?),
                    }
                }
                GeneratedKey::new(&column, false, values)
            }
            (Some(_), InsertSource::Select(_)) => GeneratedKey::new(&column, false, Vec::new()),
            (None, InsertSource::Rows(rows)) => {
                let generator = context.key_generator().ok_or_else(|| {
                    ShardingError::MissingGeneratedKey(format!(
                        "no key generator configured to fill {}.{}",
                        clause.table, column
                    ))
                })?;
                let values: Vec<ShardingValue> = rows.iter().map(|_| generator.next_key(&clause.table)).collect();
                debug!("Generated {} key(s) for {}.{}", values.len(), clause.table, column);
                GeneratedKey::new(&column, true, values)
            }
            // Row count of INSERT ... SELECT is unknown here
            (None, InsertSource::Select(_)) => GeneratedKey::new(&column, true, Vec::new()),
        };
        Ok(Some(key))
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn is_generated(&self) -> bool {
        self.is_generated
    }

    pub fn generated_values(&self) -> &[ShardingValue] {
        &self.generated_values
    }

    /// Key value of the row at `row_index`
    pub fn value_at(&self, row_index: usize) -> Option<&ShardingValue> {
        self.generated_values.get(row_index)
    }
}
