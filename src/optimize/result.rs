use serde::Serialize;

use super::generated_key::GeneratedKey;
use super::insert_condition::InsertOptimizeResult;
use super::pagination::Pagination;
use crate::route::ShardingConditions;

/// Everything the router and rewriter need to know about one statement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimizeResult {
    sharding_conditions: ShardingConditions,
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_key: Option<GeneratedKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    insert_result: Option<InsertOptimizeResult>,
}

impl OptimizeResult {
    pub fn new(sharding_conditions: ShardingConditions) -> Self {
        Self {
            sharding_conditions,
            ..Self::default()
        }
    }

    pub fn with_generated_key(mut self, generated_key: Option<GeneratedKey>) -> Self {
        self.generated_key = generated_key;
        self
    }

    pub fn with_pagination(mut self, pagination: Option<Pagination>) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_insert_result(mut self, insert_result: InsertOptimizeResult) -> Self {
        self.insert_result = Some(insert_result);
        self
    }

    pub fn sharding_conditions(&self) -> &ShardingConditions {
        &self.sharding_conditions
    }

    pub fn generated_key(&self) -> Option<&GeneratedKey> {
        self.generated_key.as_ref()
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    pub fn insert_result(&self) -> Option<&InsertOptimizeResult> {
        self.insert_result.as_ref()
    }

    /// True when some condition exists and none of them can match a row
    pub fn is_always_false(&self) -> bool {
        self.sharding_conditions.is_always_false()
    }
}
