use shardopt::optimize::OptimizeResult;
use shardopt::route::{ListRouteValue, RouteValue, ShardingCondition};
use shardopt::rule::{IncrementKeyGenerator, RuleConfiguration};
use shardopt::statement::SqlStatementParser;
use shardopt::{OptimizeContext, OptimizeEngineFactory, ShardingValue, SqlValue};

pub const RULES: &str = r#"{
    "sharding_tables": {
        "t_order": { "sharding_columns": ["user_id", "order_id"], "key_generate_column": "order_id" },
        "t_order_item": { "sharding_columns": ["user_id", "order_id"], "key_generate_column": "item_id" },
        "t_encrypt_query": { "sharding_columns": ["user_id"], "key_generate_column": "order_id" }
    },
    "encrypt_tables": {
        "t_encrypt_query": {
            "columns": [{ "logic_column": "user_id", "assisted_query_column": "assisted_user_id" }]
        }
    },
    "table_columns": {
        "t_order": ["order_id", "user_id", "status"],
        "t_order_item": ["item_id", "order_id", "user_id", "status"],
        "t_user": ["id", "name"]
    }
}"#;

/// Rules plus a key generator, the collaborators every test optimizes against
pub struct Fixture {
    pub rules: RuleConfiguration,
    pub key_generator: IncrementKeyGenerator,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_key_start(1)
    }

    pub fn with_key_start(start: i64) -> Self {
        Self {
            rules: RuleConfiguration::from_json_str(RULES).unwrap(),
            key_generator: IncrementKeyGenerator::new(start),
        }
    }

    pub fn context(&self) -> OptimizeContext<'_> {
        OptimizeContext::new(&self.rules)
            .with_encrypt_rule(&self.rules)
            .with_metadata(&self.rules)
            .with_key_generator(&self.key_generator)
    }

    /// Parse with the MySQL dialect and optimize
    pub fn optimize(&self, sql: &str, parameters: &[SqlValue]) -> shardopt::Result<OptimizeResult> {
        self.optimize_with_dialect(sql, parameters, "mysql")
    }

    pub fn optimize_with_dialect(
        &self,
        sql: &str,
        parameters: &[SqlValue],
        dialect: &str,
    ) -> shardopt::Result<OptimizeResult> {
        let dialect = SqlStatementParser::dialect(dialect)?;
        let statement = SqlStatementParser::parse_one(sql, dialect.as_ref())?;
        OptimizeEngineFactory::optimize(self.context(), &statement, parameters)
    }
}

pub fn ints(values: &[i64]) -> Vec<ShardingValue> {
    values.iter().map(|v| ShardingValue::Int(*v)).collect()
}

pub fn list(column: &str, table: &str, values: &[i64]) -> RouteValue {
    RouteValue::List(ListRouteValue::new(column, table, ints(values)).unwrap())
}

/// Values of the list route value on `(column, table)` in a condition
#[allow(dead_code)]
pub fn list_values(condition: &ShardingCondition, column: &str, table: &str) -> Vec<ShardingValue> {
    condition
        .find(column, table)
        .and_then(RouteValue::as_list)
        .map(|list| list.values().to_vec())
        .unwrap_or_default()
}
