// Collaborator capabilities consumed by the optimize engines
pub mod config;
pub mod key_generator;

pub use config::RuleConfiguration;
pub use key_generator::{IncrementKeyGenerator, KeyGenerator};

/// Sharding rule capabilities consulted while building conditions
pub trait ShardingRule: Send + Sync {
    /// Whether `table` is split across data nodes
    fn is_sharding_table(&self, table: &str) -> bool;

    /// Whether `column` is part of the shard key of `table`
    fn is_sharding_column(&self, column: &str, table: &str) -> bool;

    /// Column whose value the key generator fills in for `table`
    fn generate_key_column(&self, _table: &str) -> Option<String> {
        None
    }
}

/// Encryption rule capabilities; only the column-naming contract is used here
pub trait EncryptRule: Send + Sync {
    /// Assisted query columns of `table`, in declaration order
    fn assisted_query_columns(&self, table: &str) -> Vec<String>;

    /// Whether any encryptor of `table` maintains an assisted query column
    fn has_sharding_query_assisted_encryptor(&self, table: &str) -> bool;

    /// Assisted query column derived from the logic `column`
    fn assisted_query_column(&self, table: &str, column: &str) -> Option<String>;
}

/// Encrypt rule for deployments without encryption
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEncryptRule;

impl EncryptRule for NoEncryptRule {
    fn assisted_query_columns(&self, _table: &str) -> Vec<String> {
        Vec::new()
    }

    fn has_sharding_query_assisted_encryptor(&self, _table: &str) -> bool {
        false
    }

    fn assisted_query_column(&self, _table: &str, _column: &str) -> Option<String> {
        None
    }
}
