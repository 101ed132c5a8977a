use serde::Serialize;
use sqlparser::ast::{
    Assignment, AssignmentTarget, Expr, Insert, OnConflict, OnConflictAction, OnInsert, Query, SetExpr, TableObject,
};
use std::fmt;
use tracing::{debug, trace};

use super::OptimizeContext;
use super::generated_key::GeneratedKey;
use super::value_resolver::ValueResolver;
use crate::route::{ListRouteValue, RouteValue, ShardingCondition, ShardingConditions};
use crate::statement::{SchemaMetaData, assignment_columns, object_name_to_table};
use crate::types::SqlValue;
use crate::{Result, ShardingError};

/// How the inserted values are written in the statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertValuesStyle {
    /// `INSERT INTO t (a, b) VALUES (...), (...)`
    Values,
    /// `INSERT INTO t SET a = ..., b = ...`
    Set,
}

/// Where the inserted rows come from
#[derive(Debug, Clone)]
pub enum InsertSource<'s> {
    Rows(Vec<Vec<&'s Expr>>),
    Select(&'s Query),
}

/// The parts of an INSERT the optimizer looks at, with names lower-cased
#[derive(Debug, Clone)]
pub struct InsertClause<'s> {
    pub table: String,
    pub columns: Vec<String>,
    pub style: InsertValuesStyle,
    pub source: InsertSource<'s>,
    /// Columns assigned by ON DUPLICATE KEY UPDATE or ON CONFLICT DO UPDATE
    pub update_columns: Vec<String>,
}

impl<'s> InsertClause<'s> {
    /// Read an INSERT statement; without a column list the table's declared columns are used
    pub fn from_insert(insert: &'s Insert, metadata: &dyn SchemaMetaData) -> Result<Self> {
        let table = match &insert.table {
            TableObject::TableName(name) => object_name_to_table(name),
            _ => None,
        }
        .ok_or_else(|| ShardingError::NotSupported(format!("INSERT target {}", insert.table)))?;

        let update_assignments: &[Assignment] = match &insert.on {
            Some(OnInsert::DuplicateKeyUpdate(assignments)) => assignments,
            Some(OnInsert::OnConflict(OnConflict {
                action: OnConflictAction::DoUpdate(update),
                ..
            })) => &update.assignments,
            _ => &[],
        };
        let update_columns = update_assignments
            .iter()
            .flat_map(|assignment| assignment_columns(&assignment.target))
            .collect();

        if !insert.assignments.is_empty() {
            let mut columns = Vec::with_capacity(insert.assignments.len());
            let mut row = Vec::with_capacity(insert.assignments.len());
            for assignment in &insert.assignments {
                let AssignmentTarget::ColumnName(name) = &assignment.target else {
                    return Err(ShardingError::NotSupported(format!(
                        "tuple assignment in INSERT ... SET: {assignment}"
                    )));
                };
                columns.extend(object_name_to_table(name));
                row.push(&assignment.value);
            }
            return Ok(Self {
                table,
                columns,
                style: InsertValuesStyle::Set,
                source: InsertSource::Rows(vec![row]),
                update_columns,
            });
        }

        let mut columns: Vec<String> = insert.columns.iter().map(|c| c.value.to_lowercase()).collect();
        if columns.is_empty() {
            columns = metadata.column_names(&table).unwrap_or_else(|| {
                debug!("No column list and no metadata for {}, values cannot be bound to columns", table);
                Vec::new()
            });
        }
        let source = match insert.source.as_deref() {
            Some(query) => match query.body.as_ref() {
                SetExpr::Values(values) => {
                    InsertSource::Rows(values.rows.iter().map(|row| row.iter().collect()).collect())
                }
                _ => InsertSource::Select(query),
            },
            None => InsertSource::Rows(Vec::new()),
        };
        if let InsertSource::Rows(rows) = &source
            && let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != columns.len())
        {
            return Err(ShardingError::NotSupported(format!(
                "INSERT row {} into {} has {} value(s) for {} column(s)",
                index + 1,
                table,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self {
            table,
            columns,
            style: InsertValuesStyle::Values,
            source,
            update_columns,
        })
    }

    /// Position of `column` in the insert column list
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(column))
    }

    pub fn is_insert_select(&self) -> bool {
        matches!(self.source, InsertSource::Select(_))
    }
}

/// One value written for one column of a row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InsertUnitValue {
    /// A parameter marker; the bound value sits in the unit's parameters
    Placeholder,
    Literal(SqlValue),
    /// An expression that is neither a marker nor a literal, kept as written
    Expression(String),
}

impl fmt::Display for InsertUnitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertUnitValue::Placeholder => write!(f, "?"),
            InsertUnitValue::Literal(value) => write!(f, "{value}"),
            InsertUnitValue::Expression(expr) => write!(f, "{expr}"),
        }
    }
}

/// Values and bound parameters of one inserted row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsertOptimizeResultUnit {
    values: Vec<InsertUnitValue>,
    parameters: Vec<SqlValue>,
}

impl InsertOptimizeResultUnit {
    pub fn values(&self) -> &[InsertUnitValue] {
        &self.values
    }

    pub fn parameters(&self) -> &[SqlValue] {
        &self.parameters
    }

    fn push_expr(&mut self, expr: &Expr, parameters: &[SqlValue]) -> Result<()> {
        let resolved = ValueResolver::resolve_sql_value(expr, parameters)?;
        match resolved {
            Some(value) if ValueResolver::is_parameter_marker(expr) => {
                self.values.push(InsertUnitValue::Placeholder);
                self.parameters.push(value);
            }
            Some(value) => self.values.push(InsertUnitValue::Literal(value)),
            None => self.push_expression(expr, parameters)?,
        }
        Ok(())
    }

    /// Keep an expression as written, with its nested markers bound in order
    fn push_expression(&mut self, expr: &Expr, parameters: &[SqlValue]) -> Result<()> {
        let (rewritten, bound) = ValueResolver::bind_nested_markers(expr, parameters)?;
        self.values.push(InsertUnitValue::Expression(rewritten.to_string()));
        self.parameters.extend(bound);
        Ok(())
    }

    fn push_value(&mut self, value: SqlValue, as_placeholder: bool) {
        if as_placeholder {
            self.values.push(InsertUnitValue::Placeholder);
            self.parameters.push(value);
        } else {
            self.values.push(InsertUnitValue::Literal(value));
        }
    }
}

impl fmt::Display for InsertOptimizeResultUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

/// Final column list of an INSERT and one unit per row, aligned by index with its conditions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertOptimizeResult {
    column_names: Vec<String>,
    style: InsertValuesStyle,
    units: Vec<InsertOptimizeResultUnit>,
}

impl InsertOptimizeResult {
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn style(&self) -> InsertValuesStyle {
        self.style
    }

    pub fn units(&self) -> &[InsertOptimizeResultUnit] {
        &self.units
    }

    /// Render one unit the way the statement writes it: `(1, 'a')` or `a = 1, b = 'a'`
    pub fn render_unit(&self, index: usize) -> Option<String> {
        let unit = self.units.get(index)?;
        Some(match self.style {
            InsertValuesStyle::Values => unit.to_string(),
            InsertValuesStyle::Set => self
                .column_names
                .iter()
                .zip(unit.values())
                .map(|(column, value)| format!("{column} = {value}"))
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// Builds one sharding condition and one value unit per inserted row
pub struct InsertConditionEngine<'a> {
    context: OptimizeContext<'a>,
    parameters: &'a [SqlValue],
}

impl<'a> InsertConditionEngine<'a> {
    pub fn new(context: OptimizeContext<'a>, parameters: &'a [SqlValue]) -> Self {
        Self { context, parameters }
    }

    /// Conditions and units for the VALUES (or SET) rows of `clause`.
    ///
    /// Row `i` gets its own sharding-column values, then `generated_values[i]` when the
    /// key is generated, then the values of assisted query columns. INSERT ... SELECT
    /// produces neither conditions nor units.
    pub fn create(
        &self,
        clause: &InsertClause<'_>,
        generated_key: Option<&GeneratedKey>,
    ) -> Result<(ShardingConditions, InsertOptimizeResult)> {
        let table = clause.table.as_str();
        let sharding_rule = self.context.sharding_rule();
        let encrypt_rule = self.context.encrypt_rule();
        let generated_key = generated_key.filter(|key| key.is_generated());

        // Declaration order of the encrypt rule; columns the statement already writes are left alone
        let assisted_columns: Vec<(usize, String)> = if encrypt_rule.has_sharding_query_assisted_encryptor(table) {
            encrypt_rule
                .assisted_query_columns(table)
                .into_iter()
                .filter(|assisted| clause.column_index(assisted).is_none())
                .filter_map(|assisted| {
                    clause
                        .columns
                        .iter()
                        .position(|column| {
                            encrypt_rule
                                .assisted_query_column(table, column)
                                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(&assisted))
                        })
                        .map(|index| (index, assisted))
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut column_names = clause.columns.clone();
        if let Some(key) = generated_key {
            column_names.push(key.column_name().to_string());
        }
        column_names.extend(assisted_columns.iter().map(|(_, assisted)| assisted.clone()));

        let rows: &[Vec<&Expr>] = match &clause.source {
            InsertSource::Rows(rows) => rows,
            InsertSource::Select(_) => &[],
        };
        let mut conditions = Vec::with_capacity(rows.len());
        let mut units = Vec::with_capacity(rows.len());
        for (row_index, row) in rows.iter().enumerate() {
            let uses_markers = row.iter().any(|expr| ValueResolver::contains_parameter_marker(expr));
            let mut unit = InsertOptimizeResultUnit::default();
            let mut route_values = Vec::new();

            for (column, expr) in clause.columns.iter().zip(row) {
                unit.push_expr(expr, self.parameters)?;
                if sharding_rule.is_sharding_column(column, table)
                    && let Some(value) = ValueResolver::resolve(expr, self.parameters)?
                {
                    route_values.extend(ListRouteValue::new(column, table, vec![value]).map(RouteValue::List));
                }
            }

            if let Some(key) = generated_key {
                let value = key.value_at(row_index).ok_or_else(|| {
                    ShardingError::MissingGeneratedKey(format!(
                        "no generated {} value for row {} of {}",
                        key.column_name(),
                        row_index + 1,
                        table
                    ))
                })?;
                trace!("Row {} of {} takes generated key {}", row_index, table, value);
                unit.push_value(SqlValue::from(value.clone()), uses_markers);
                if sharding_rule.is_sharding_column(key.column_name(), table) {
                    route_values.extend(
                        ListRouteValue::new(key.column_name(), table, vec![value.clone()]).map(RouteValue::List),
                    );
                }
            }

            for (index, assisted) in &assisted_columns {
                let Some(expr) = row.get(*index) else {
                    continue;
                };
                trace!("Row {} of {} fills assisted query column {}", row_index, table, assisted);
                match ValueResolver::resolve_sql_value(expr, self.parameters)? {
                    Some(value) => unit.push_value(value, uses_markers),
                    None => unit.push_expression(expr, self.parameters)?,
                }
            }

            conditions.push(ShardingCondition::new(route_values));
            units.push(unit);
        }

        debug!("Built {} insert condition(s) for {}", conditions.len(), table);
        Ok((
            ShardingConditions::new(conditions),
            InsertOptimizeResult {
                column_names,
                style: clause.style,
                units,
            },
        ))
    }
}
