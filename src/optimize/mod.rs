// Sharding condition resolution: from statement AST and parameters to an OptimizeResult
pub mod assembler;
pub mod condition_optimizer;
pub mod engine;
pub mod generated_key;
pub mod insert_condition;
pub mod pagination;
pub mod predicate_extractor;
pub mod result;
pub mod route_value_builder;
pub mod value_resolver;

pub use assembler::ShardingConditionAssembler;
pub use condition_optimizer::ConditionOptimizer;
pub use engine::{
    DeleteOptimizeEngine, InsertOptimizeEngine, NoOpOptimizeEngine, OptimizeEngine, OptimizeEngineFactory,
    SelectOptimizeEngine, UpdateOptimizeEngine,
};
pub use generated_key::GeneratedKey;
pub use insert_condition::{
    InsertClause, InsertConditionEngine, InsertOptimizeResult, InsertOptimizeResultUnit, InsertSource,
    InsertUnitValue, InsertValuesStyle,
};
pub use pagination::{Pagination, PaginationResolver, PaginationValue};
pub use predicate_extractor::PredicateExtractor;
pub use result::OptimizeResult;
pub use route_value_builder::{PredicateRightValue, RouteValueBuilder};
pub use value_resolver::ValueResolver;

use crate::rule::{EncryptRule, KeyGenerator, NoEncryptRule, ShardingRule};
use crate::statement::{EmptySchemaMetaData, SchemaMetaData};

/// Collaborators consulted while optimizing one statement.
///
/// Everything is borrowed immutably, so one context can serve many statements
/// on many threads at once.
#[derive(Clone, Copy)]
pub struct OptimizeContext<'a> {
    sharding_rule: &'a dyn ShardingRule,
    encrypt_rule: &'a dyn EncryptRule,
    metadata: &'a dyn SchemaMetaData,
    key_generator: Option<&'a dyn KeyGenerator>,
}

impl<'a> OptimizeContext<'a> {
    /// Context with no encryption, no column metadata and no key generator
    pub fn new(sharding_rule: &'a dyn ShardingRule) -> Self {
        Self {
            sharding_rule,
            encrypt_rule: &NoEncryptRule,
            metadata: &EmptySchemaMetaData,
            key_generator: None,
        }
    }

    pub fn with_encrypt_rule(mut self, encrypt_rule: &'a dyn EncryptRule) -> Self {
        self.encrypt_rule = encrypt_rule;
        self
    }

    pub fn with_metadata(mut self, metadata: &'a dyn SchemaMetaData) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_key_generator(mut self, key_generator: &'a dyn KeyGenerator) -> Self {
        self.key_generator = Some(key_generator);
        self
    }

    pub fn sharding_rule(&self) -> &'a dyn ShardingRule {
        self.sharding_rule
    }

    pub fn encrypt_rule(&self) -> &'a dyn EncryptRule {
        self.encrypt_rule
    }

    pub fn metadata(&self) -> &'a dyn SchemaMetaData {
        self.metadata
    }

    pub fn key_generator(&self) -> Option<&'a dyn KeyGenerator> {
        self.key_generator
    }
}

impl std::fmt::Debug for OptimizeContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizeContext")
            .field("key_generator", &self.key_generator.is_some())
            .finish_non_exhaustive()
    }
}
