use sqlparser::ast::{AssignmentTarget, Expr, ObjectName, ObjectNamePart, TableFactor, TableWithJoins};
use std::collections::HashMap;

use super::metadata::SchemaMetaData;

/// A column reference as written in a predicate, lower-cased
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub owner: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(owner: Option<&str>, name: &str) -> Self {
        Self {
            owner: owner.map(str::to_lowercase),
            name: name.to_lowercase(),
        }
    }

    /// Extract a column reference from an identifier expression
    pub fn from_expr(expr: &Expr) -> Option<ColumnRef> {
        match expr {
            Expr::Identifier(ident) => Some(ColumnRef::new(None, &ident.value)),
            Expr::CompoundIdentifier(parts) => {
                let (name, rest) = parts.split_last()?;
                Some(ColumnRef::new(rest.last().map(|p| p.value.as_str()), &name.value))
            }
            Expr::Nested(inner) => ColumnRef::from_expr(inner),
            _ => None,
        }
    }
}

/// Last identifier of a possibly schema-qualified name, lower-cased
pub fn object_name_to_table(name: &ObjectName) -> Option<String> {
    name.0.last().map(|part| match part {
        ObjectNamePart::Identifier(ident) => ident.value.to_lowercase(),
    })
}

/// Column names an assignment writes to, lower-cased
pub fn assignment_columns(target: &AssignmentTarget) -> Vec<String> {
    match target {
        AssignmentTarget::ColumnName(name) => object_name_to_table(name).into_iter().collect(),
        AssignmentTarget::Tuple(names) => names.iter().filter_map(object_name_to_table).collect(),
    }
}

/// Tables visible in one query scope, with their aliases
#[derive(Debug, Clone, Default)]
pub struct TablesContext {
    tables: Vec<String>,
    aliases: HashMap<String, String>,
}

impl TablesContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the context from a FROM clause, including joined relations
    pub fn from_relations(relations: &[TableWithJoins]) -> Self {
        let mut context = Self::new();
        for relation in relations {
            context.add_table_factor(&relation.relation);
            for join in &relation.joins {
                context.add_table_factor(&join.relation);
            }
        }
        context
    }

    fn add_table_factor(&mut self, factor: &TableFactor) {
        if let TableFactor::Table { name, alias, .. } = factor
            && let Some(table) = object_name_to_table(name)
        {
            let alias = alias.as_ref().map(|a| a.name.value.as_str());
            self.add_table(&table, alias);
        }
    }

    /// Register a table and optional alias
    pub fn add_table(&mut self, table: &str, alias: Option<&str>) {
        let table = table.to_lowercase();
        if let Some(alias) = alias {
            self.aliases.insert(alias.to_lowercase(), table.clone());
        }
        if !self.tables.contains(&table) {
            self.tables.push(table);
        }
    }

    /// Add every table and alias of another scope
    pub fn merge(&mut self, other: &TablesContext) {
        for (alias, table) in &other.aliases {
            self.aliases.insert(alias.clone(), table.clone());
        }
        for table in &other.tables {
            if !self.tables.contains(table) {
                self.tables.push(table.clone());
            }
        }
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Resolve the table that owns a column reference
    pub fn find_table_name(&self, column: &ColumnRef, metadata: &dyn SchemaMetaData) -> Option<String> {
        if let Some(owner) = &column.owner {
            if let Some(table) = self.aliases.get(owner) {
                return Some(table.clone());
            }
            return self.tables.iter().find(|t| *t == owner).cloned();
        }
        if let [only] = self.tables.as_slice() {
            return Some(only.clone());
        }
        self.tables
            .iter()
            .find(|table| metadata.contains_column(table, &column.name))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::metadata::{EmptySchemaMetaData, StaticSchemaMetaData};

    #[test]
    fn test_qualified_column_resolves_through_alias() {
        let mut context = TablesContext::new();
        context.add_table("t_order", Some("o"));
        context.add_table("t_order_item", Some("i"));
        let column = ColumnRef::new(Some("I"), "order_id");
        assert_eq!(
            context.find_table_name(&column, &EmptySchemaMetaData),
            Some("t_order_item".to_string())
        );
        let by_name = ColumnRef::new(Some("t_order"), "order_id");
        assert_eq!(
            context.find_table_name(&by_name, &EmptySchemaMetaData),
            Some("t_order".to_string())
        );
    }

    #[test]
    fn test_unqualified_column_single_table() {
        let mut context = TablesContext::new();
        context.add_table("t_order", None);
        let column = ColumnRef::new(None, "user_id");
        assert_eq!(
            context.find_table_name(&column, &EmptySchemaMetaData),
            Some("t_order".to_string())
        );
    }

    #[test]
    fn test_unqualified_column_uses_metadata_with_many_tables() {
        let mut context = TablesContext::new();
        context.add_table("t_order", None);
        context.add_table("t_order_item", None);
        let metadata = StaticSchemaMetaData::new()
            .with_table("t_order", ["order_id", "user_id"])
            .with_table("t_order_item", ["item_id", "order_id"]);
        assert_eq!(
            context.find_table_name(&ColumnRef::new(None, "item_id"), &metadata),
            Some("t_order_item".to_string())
        );
        assert_eq!(
            context.find_table_name(&ColumnRef::new(None, "missing"), &metadata),
            None
        );
    }

    #[test]
    fn test_merge_keeps_first_table_order() {
        let mut outer = TablesContext::new();
        outer.add_table("t_order", Some("o"));
        let mut inner = TablesContext::new();
        inner.add_table("t_order_item", Some("i"));
        inner.add_table("t_order", None);
        outer.merge(&inner);
        assert_eq!(outer.tables(), &["t_order".to_string(), "t_order_item".to_string()]);
        assert_eq!(
            outer.find_table_name(&ColumnRef::new(Some("i"), "item_id"), &EmptySchemaMetaData),
            Some("t_order_item".to_string())
        );
    }
}
