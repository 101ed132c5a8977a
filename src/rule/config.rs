use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use super::{EncryptRule, ShardingRule};
use crate::statement::SchemaMetaData;
use crate::{Result, ShardingError};

/// Sharding settings of one logic table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShardingTableConfig {
    #[serde(default)]
    pub sharding_columns: Vec<String>,
    #[serde(default)]
    pub key_generate_column: Option<String>,
}

/// One encrypted logic column
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptColumnConfig {
    pub logic_column: String,
    #[serde(default)]
    pub assisted_query_column: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncryptTableConfig {
    #[serde(default)]
    pub columns: Vec<EncryptColumnConfig>,
}

/// Rule set describing sharding tables, encrypted columns and table columns.
///
/// Table and column names are matched case-insensitively.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleConfiguration {
    #[serde(default)]
    pub sharding_tables: BTreeMap<String, ShardingTableConfig>,
    #[serde(default)]
    pub encrypt_tables: BTreeMap<String, EncryptTableConfig>,
    #[serde(default)]
    pub table_columns: BTreeMap<String, Vec<String>>,
}

impl RuleConfiguration {
    /// Parse a JSON rule document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RuleConfiguration = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Load a JSON rule document from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text).map_err(|e| {
            ShardingError::Config(format!("invalid rule file {}: {}", path.display(), e))
        })?;
        info!(
            "Loaded rules from {}: {} sharding table(s), {} encrypt table(s)",
            path.display(),
            config.sharding_tables.len(),
            config.encrypt_tables.len()
        );
        Ok(config)
    }

    fn normalized(self) -> Self {
        let sharding_tables = self
            .sharding_tables
            .into_iter()
            .map(|(table, config)| {
                let config = ShardingTableConfig {
                    sharding_columns: config.sharding_columns.iter().map(|c| c.to_lowercase()).collect(),
                    key_generate_column: config.key_generate_column.map(|c| c.to_lowercase()),
                };
                (table.to_lowercase(), config)
            })
            .collect();
        let encrypt_tables = self
            .encrypt_tables
            .into_iter()
            .map(|(table, config)| {
                let columns = config
                    .columns
                    .into_iter()
                    .map(|c| EncryptColumnConfig {
                        logic_column: c.logic_column.to_lowercase(),
                        assisted_query_column: c.assisted_query_column.map(|a| a.to_lowercase()),
                    })
                    .collect();
                (table.to_lowercase(), EncryptTableConfig { columns })
            })
            .collect();
        let table_columns = self
            .table_columns
            .into_iter()
            .map(|(table, columns)| {
                (table.to_lowercase(), columns.iter().map(|c| c.to_lowercase()).collect())
            })
            .collect();
        Self {
            sharding_tables,
            encrypt_tables,
            table_columns,
        }
    }

    /// Declare a sharding table
    pub fn with_sharding_table<I, S>(mut self, table: &str, sharding_columns: I, key_generate_column: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.sharding_tables.insert(
            table.to_lowercase(),
            ShardingTableConfig {
                sharding_columns: sharding_columns.into_iter().map(|c| c.as_ref().to_lowercase()).collect(),
                key_generate_column: key_generate_column.map(str::to_lowercase),
            },
        );
        self
    }

    /// Declare an encrypted column, optionally backed by an assisted query column
    pub fn with_encrypt_column(mut self, table: &str, logic_column: &str, assisted_query_column: Option<&str>) -> Self {
        self.encrypt_tables
            .entry(table.to_lowercase())
            .or_default()
            .columns
            .push(EncryptColumnConfig {
                logic_column: logic_column.to_lowercase(),
                assisted_query_column: assisted_query_column.map(str::to_lowercase),
            });
        self
    }

    /// Declare the columns of a table in definition order
    pub fn with_table_columns<I, S>(mut self, table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.table_columns.insert(
            table.to_lowercase(),
            columns.into_iter().map(|c| c.as_ref().to_lowercase()).collect(),
        );
        self
    }

    fn sharding_table(&self, table: &str) -> Option<&ShardingTableConfig> {
        self.sharding_tables.get(&table.to_lowercase())
    }

    fn encrypt_table(&self, table: &str) -> Option<&EncryptTableConfig> {
        self.encrypt_tables.get(&table.to_lowercase())
    }
}

impl ShardingRule for RuleConfiguration {
    fn is_sharding_table(&self, table: &str) -> bool {
        self.sharding_table(table).is_some()
    }

    fn is_sharding_column(&self, column: &str, table: &str) -> bool {
        self.sharding_table(table).is_some_and(|config| {
            config.sharding_columns.iter().any(|c| c.eq_ignore_ascii_case(column))
        })
    }

    fn generate_key_column(&self, table: &str) -> Option<String> {
        self.sharding_table(table)?.key_generate_column.clone()
    }
}

impl EncryptRule for RuleConfiguration {
    fn assisted_query_columns(&self, table: &str) -> Vec<String> {
        self.encrypt_table(table)
            .map(|config| {
                config
                    .columns
                    .iter()
                    .filter_map(|c| c.assisted_query_column.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn has_sharding_query_assisted_encryptor(&self, table: &str) -> bool {
        self.encrypt_table(table)
            .is_some_and(|config| config.columns.iter().any(|c| c.assisted_query_column.is_some()))
    }

    fn assisted_query_column(&self, table: &str, column: &str) -> Option<String> {
        self.encrypt_table(table)?
            .columns
            .iter()
            .find(|c| c.logic_column.eq_ignore_ascii_case(column))?
            .assisted_query_column
            .clone()
    }
}

impl SchemaMetaData for RuleConfiguration {
    fn contains_column(&self, table: &str, column: &str) -> bool {
        self.table_columns
            .get(&table.to_lowercase())
            .is_some_and(|columns| columns.iter().any(|c| c.eq_ignore_ascii_case(column)))
    }

    fn column_names(&self, table: &str) -> Option<Vec<String>> {
        self.table_columns.get(&table.to_lowercase()).cloned()
    }
}
