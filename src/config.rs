use clap::Parser;
use sqlparser::dialect::Dialect;
use std::io::Read;
use std::path::PathBuf;

use crate::rule::RuleConfiguration;
use crate::statement::SqlStatementParser;
use crate::types::SqlValue;
use crate::{Result, ShardingError};

#[derive(Parser, Debug, Clone)]
#[command(name = "shardopt")]
#[command(about = "shardopt - resolve the sharding conditions of a SQL statement", long_about = None)]
pub struct Config {
    #[arg(long, env = "SHARDOPT_RULES", help = "JSON file describing sharding and encrypt rules")]
    pub rules: Option<PathBuf>,

    #[arg(long, env = "SHARDOPT_SQL", help = "Statement to optimize; read from stdin when absent")]
    pub sql: Option<String>,

    #[arg(long, default_value = "[]", env = "SHARDOPT_PARAMS", help = "Bound parameters as a JSON array")]
    pub params: String,

    #[arg(long, default_value = "generic", env = "SHARDOPT_DIALECT", help = "SQL dialect (generic, mysql, postgresql, ...)")]
    pub dialect: String,

    #[arg(long, default_value = "info", env = "SHARDOPT_LOG_LEVEL")]
    pub log_level: String,

    #[arg(long, default_value = "1", env = "SHARDOPT_KEY_START", help = "First value handed out by the key generator")]
    pub key_start: i64,

    #[arg(long, env = "SHARDOPT_PRETTY", help = "Pretty-print the JSON result")]
    pub pretty: bool,
}

impl Config {
    /// Get a configuration instance with all values resolved from CLI args and environment variables
    pub fn load() -> Self {
        Config::parse()
    }

    /// Rule set from `--rules`, or an empty one
    pub fn load_rules(&self) -> Result<RuleConfiguration> {
        match &self.rules {
            Some(path) => RuleConfiguration::from_path(path),
            None => Ok(RuleConfiguration::default()),
        }
    }

    /// Parse `--params`; each JSON element becomes one bound parameter
    pub fn parameters(&self) -> Result<Vec<SqlValue>> {
        let values: Vec<serde_json::Value> = serde_json::from_str(&self.params)
            .map_err(|e| ShardingError::Config(format!("--params must be a JSON array: {e}")))?;
        Ok(values.into_iter().map(SqlValue::from).collect())
    }

    pub fn sql_dialect(&self) -> Result<Box<dyn Dialect>> {
        SqlStatementParser::dialect(&self.dialect)
    }

    /// Statement text from `--sql`, else stdin
    pub fn sql_text(&self) -> Result<String> {
        if let Some(sql) = &self.sql {
            return Ok(sql.clone());
        }
        let mut sql = String::new();
        std::io::stdin().read_to_string(&mut sql)?;
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["shardopt", "--sql", "SELECT 1"]);
        assert_eq!(config.dialect, "generic");
        assert_eq!(config.key_start, 1);
        assert!(!config.pretty);
        assert!(config.parameters().unwrap().is_empty());
        assert!(config.load_rules().unwrap().sharding_tables.is_empty());
        assert_eq!(config.sql_text().unwrap(), "SELECT 1");
    }

    #[test]
    fn test_parameters_from_json() {
        let config = Config::parse_from(["shardopt", "--params", r#"[42, "A", null]"#]);
        assert_eq!(
            config.parameters().unwrap(),
            vec![SqlValue::Int(42), SqlValue::Text("A".into()), SqlValue::Null]
        );
    }

    #[test]
    fn test_params_must_be_array() {
        let config = Config::parse_from(["shardopt", "--params", "42"]);
        assert!(matches!(config.parameters(), Err(ShardingError::Config(_))));
    }

    #[test]
    fn test_unknown_dialect() {
        let config = Config::parse_from(["shardopt", "--dialect", "cobol"]);
        assert!(config.sql_dialect().is_err());
    }
}
