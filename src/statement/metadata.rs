use std::collections::HashMap;

/// Table column metadata used to bind unqualified columns and column-less INSERTs
pub trait SchemaMetaData: Send + Sync {
    /// Whether `table` declares `column`
    fn contains_column(&self, table: &str, column: &str) -> bool;

    /// Declared columns of `table` in definition order, if the table is known
    fn column_names(&self, table: &str) -> Option<Vec<String>>;
}

/// Metadata source that knows no tables
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySchemaMetaData;

impl SchemaMetaData for EmptySchemaMetaData {
    fn contains_column(&self, _table: &str, _column: &str) -> bool {
        false
    }

    fn column_names(&self, _table: &str) -> Option<Vec<String>> {
        None
    }
}

/// In-memory metadata keyed by lower-cased table name
#[derive(Debug, Default, Clone)]
pub struct StaticSchemaMetaData {
    tables: HashMap<String, Vec<String>>,
}

impl StaticSchemaMetaData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table with its columns in definition order
    pub fn with_table<I, S>(mut self, table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tables.insert(
            table.to_lowercase(),
            columns.into_iter().map(|c| c.as_ref().to_lowercase()).collect(),
        );
        self
    }
}

impl SchemaMetaData for StaticSchemaMetaData {
    fn contains_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(&table.to_lowercase())
            .is_some_and(|columns| columns.iter().any(|c| c.eq_ignore_ascii_case(column)))
    }

    fn column_names(&self, table: &str) -> Option<Vec<String>> {
        self.tables.get(&table.to_lowercase()).cloned()
    }
}
