use sqlparser::ast::{Assignment, AssignmentTarget, Delete, Expr, FromTable, Insert, Query, Statement, TableWithJoins};
use tracing::debug;

use super::OptimizeContext;
use super::condition_optimizer::ConditionOptimizer;
use super::generated_key::GeneratedKey;
use super::insert_condition::{InsertClause, InsertConditionEngine, InsertSource};
use super::pagination::PaginationResolver;
use super::predicate_extractor::PredicateExtractor;
use super::result::OptimizeResult;
use super::value_resolver::ValueResolver;
use crate::route::{RouteValue, ShardingConditions};
use crate::statement::{ColumnRef, TablesContext, assignment_columns};
use crate::types::SqlValue;
use crate::{Result, ShardingError};

/// Produces the optimize result of one statement
pub trait OptimizeEngine {
    fn optimize(&self) -> Result<OptimizeResult>;
}

/// Picks the engine for a statement kind
pub struct OptimizeEngineFactory;

impl OptimizeEngineFactory {
    pub fn new_instance<'a>(
        context: OptimizeContext<'a>,
        statement: &'a Statement,
        parameters: &'a [SqlValue],
    ) -> Box<dyn OptimizeEngine + 'a> {
        match statement {
            Statement::Query(query) => Box::new(SelectOptimizeEngine::new(context, query, parameters)),
            Statement::Insert(insert) => Box::new(InsertOptimizeEngine::new(context, insert, parameters)),
            Statement::Update {
                table,
                assignments,
                selection,
                ..
            } => Box::new(UpdateOptimizeEngine::new(
                context,
                table,
                assignments,
                selection.as_ref(),
                parameters,
            )),
            Statement::Delete(delete) => Box::new(DeleteOptimizeEngine::new(context, delete, parameters)),
            _ => {
                debug!("Statement carries no sharding conditions");
                Box::new(NoOpOptimizeEngine)
            }
        }
    }

    /// Build and run the engine for `statement`
    pub fn optimize(
        context: OptimizeContext<'_>,
        statement: &Statement,
        parameters: &[SqlValue],
    ) -> Result<OptimizeResult> {
        Self::new_instance(context, statement, parameters).optimize()
    }
}

pub struct SelectOptimizeEngine<'a> {
    context: OptimizeContext<'a>,
    query: &'a Query,
    parameters: &'a [SqlValue],
}

impl<'a> SelectOptimizeEngine<'a> {
    pub fn new(context: OptimizeContext<'a>, query: &'a Query, parameters: &'a [SqlValue]) -> Self {
        Self {
            context,
            query,
            parameters,
        }
    }
}

impl OptimizeEngine for SelectOptimizeEngine<'_> {
    fn optimize(&self) -> Result<OptimizeResult> {
        let conditions = PredicateExtractor::new(self.context, self.parameters).extract_query(self.query)?;
        let conditions = ConditionOptimizer::optimize(conditions)?;
        let pagination = PaginationResolver::resolve(self.query, self.parameters)?;
        Ok(OptimizeResult::new(conditions).with_pagination(pagination))
    }
}

pub struct InsertOptimizeEngine<'a> {
    context: OptimizeContext<'a>,
    insert: &'a Insert,
    parameters: &'a [SqlValue],
}

impl<'a> InsertOptimizeEngine<'a> {
    pub fn new(context: OptimizeContext<'a>, insert: &'a Insert, parameters: &'a [SqlValue]) -> Self {
        Self {
            context,
            insert,
            parameters,
        }
    }

    fn check_update_columns(&self, clause: &InsertClause<'_>) -> Result<()> {
        let sharding_rule = self.context.sharding_rule();
        match clause
            .update_columns
            .iter()
            .find(|column| sharding_rule.is_sharding_column(column, &clause.table))
        {
            Some(column) => Err(ShardingError::UnsupportedShardingOperation(format!(
                "cannot update sharding column {}.{} on duplicate key",
                clause.table, column
            ))),
            None => Ok(()),
        }
    }

    fn check_insert_select(&self, clause: &InsertClause<'_>, generated_key: Option<&GeneratedKey>) -> Result<()> {
        if !self.context.sharding_rule().is_sharding_table(&clause.table) {
            return Ok(());
        }
        match generated_key {
            Some(key) if !key.is_generated() => Ok(()),
            Some(key) => Err(ShardingError::MissingGeneratedKey(format!(
                "INSERT ... SELECT into {} must supply key column {}",
                clause.table,
                key.column_name()
            ))),
            None => Err(ShardingError::MissingGeneratedKey(format!(
                "INSERT ... SELECT into sharding table {} needs a key generate column",
                clause.table
            ))),
        }
    }
}

impl OptimizeEngine for InsertOptimizeEngine<'_> {
    fn optimize(&self) -> Result<OptimizeResult> {
        let clause = InsertClause::from_insert(self.insert, self.context.metadata())?;
        self.check_update_columns(&clause)?;
        let generated_key = GeneratedKey::resolve(&self.context, &clause, self.parameters)?;

        let (conditions, insert_result) = match &clause.source {
            InsertSource::Select(query) => {
                self.check_insert_select(&clause, generated_key.as_ref())?;
                let conditions = PredicateExtractor::new(self.context, self.parameters).extract_query(query)?;
                let (_, insert_result) = InsertConditionEngine::new(self.context, self.parameters)
                    .create(&clause, generated_key.as_ref())?;
                (conditions, insert_result)
            }
            InsertSource::Rows(_) => InsertConditionEngine::new(self.context, self.parameters)
                .create(&clause, generated_key.as_ref())?,
        };
        let conditions = ConditionOptimizer::optimize(conditions)?;
        Ok(OptimizeResult::new(conditions)
            .with_generated_key(generated_key)
            .with_insert_result(insert_result))
    }
}

pub struct UpdateOptimizeEngine<'a> {
    context: OptimizeContext<'a>,
    table: &'a TableWithJoins,
    assignments: &'a [Assignment],
    selection: Option<&'a Expr>,
    parameters: &'a [SqlValue],
}

impl<'a> UpdateOptimizeEngine<'a> {
    pub fn new(
        context: OptimizeContext<'a>,
        table: &'a TableWithJoins,
        assignments: &'a [Assignment],
        selection: Option<&'a Expr>,
        parameters: &'a [SqlValue],
    ) -> Self {
        Self {
            context,
            table,
            assignments,
            selection,
            parameters,
        }
    }

    // Owning table of an assigned column: bound through the scope, else the first table sharding on it
    fn sharding_table_of(&self, tables: &TablesContext, column: &str) -> Option<String> {
        let sharding_rule = self.context.sharding_rule();
        let bound = tables.find_table_name(&ColumnRef::new(None, column), self.context.metadata());
        match bound {
            Some(table) => sharding_rule.is_sharding_column(column, &table).then_some(table),
            None => tables
                .tables()
                .iter()
                .find(|table| sharding_rule.is_sharding_column(column, table))
                .cloned(),
        }
    }

    /// A sharding column may only be "updated" to the value every condition already pins it to
    fn check_assignments(&self, tables: &TablesContext, conditions: &ShardingConditions) -> Result<()> {
        for assignment in self.assignments {
            for column in assignment_columns(&assignment.target) {
                let Some(table) = self.sharding_table_of(tables, &column) else {
                    continue;
                };
                let value = match &assignment.target {
                    AssignmentTarget::ColumnName(_) => ValueResolver::resolve(&assignment.value, self.parameters)?,
                    AssignmentTarget::Tuple(_) => None,
                };
                let pinned = value.is_some_and(|value| {
                    !conditions.is_empty()
                        && conditions.iter().all(|condition| {
                            condition.is_always_false()
                                || matches!(
                                    condition.find(&column, &table),
                                    Some(RouteValue::List(list)) if list.values() == [value.clone()]
                                )
                        })
                });
                if !pinned {
                    return Err(ShardingError::UnsupportedShardingOperation(format!(
                        "cannot update sharding column {table}.{column}"
                    )));
                }
                debug!("Assignment of {}.{} keeps the routed value", table, column);
            }
        }
        Ok(())
    }
}

impl OptimizeEngine for UpdateOptimizeEngine<'_> {
    fn optimize(&self) -> Result<OptimizeResult> {
        let tables = TablesContext::from_relations(std::slice::from_ref(self.table));
        let conditions = PredicateExtractor::new(self.context, self.parameters).extract_where(tables.clone(), self.selection)?;
        let conditions = ConditionOptimizer::optimize(conditions)?;
        self.check_assignments(&tables, &conditions)?;
        Ok(OptimizeResult::new(conditions))
    }
}

pub struct DeleteOptimizeEngine<'a> {
    context: OptimizeContext<'a>,
    delete: &'a Delete,
    parameters: &'a [SqlValue],
}

impl<'a> DeleteOptimizeEngine<'a> {
    pub fn new(context: OptimizeContext<'a>, delete: &'a Delete, parameters: &'a [SqlValue]) -> Self {
        Self {
            context,
            delete,
            parameters,
        }
    }
}

impl OptimizeEngine for DeleteOptimizeEngine<'_> {
    fn optimize(&self) -> Result<OptimizeResult> {
        let relations = match &self.delete.from {
            FromTable::WithFromKeyword(relations) | FromTable::WithoutKeyword(relations) => relations,
        };
        let mut tables = TablesContext::from_relations(relations);
        if let Some(using) = &self.delete.using {
            tables.merge(&TablesContext::from_relations(using));
        }
        let conditions = PredicateExtractor::new(self.context, self.parameters)
            .extract_where(tables, self.delete.selection.as_ref())?;
        Ok(OptimizeResult::new(ConditionOptimizer::optimize(conditions)?))
    }
}

/// Engine for statements that never carry sharding conditions (DDL, SET, SHOW, ...)
pub struct NoOpOptimizeEngine;

impl OptimizeEngine for NoOpOptimizeEngine {
    fn optimize(&self) -> Result<OptimizeResult> {
        Ok(OptimizeResult::default())
    }
}
