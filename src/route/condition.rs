use serde::Serialize;

use super::route_value::RouteValue;

/// Route values of one AND-group (one OR-branch) of a predicate tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardingCondition {
    RouteValues(Vec<RouteValue>),
    /// The branch provably selects zero rows
    AlwaysFalse,
}

impl ShardingCondition {
    pub fn new(route_values: Vec<RouteValue>) -> Self {
        ShardingCondition::RouteValues(route_values)
    }

    /// Route values in encounter order; empty for the always-false condition
    pub fn route_values(&self) -> &[RouteValue] {
        match self {
            ShardingCondition::RouteValues(values) => values,
            ShardingCondition::AlwaysFalse => &[],
        }
    }

    pub fn is_always_false(&self) -> bool {
        matches!(self, ShardingCondition::AlwaysFalse)
    }

    /// Find the route value constraining `(column, table)`
    pub fn find(&self, column: &str, table: &str) -> Option<&RouteValue> {
        self.route_values().iter().find(|value| {
            value.column_key().is_some_and(|(c, t)| {
                c.eq_ignore_ascii_case(column) && t.eq_ignore_ascii_case(table)
            })
        })
    }
}

/// Ordered sharding conditions of one statement.
///
/// An empty list means no pruning is possible and the statement routes to every node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShardingConditions {
    conditions: Vec<ShardingCondition>,
}

impl ShardingConditions {
    pub fn new(conditions: Vec<ShardingCondition>) -> Self {
        Self { conditions }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn conditions(&self) -> &[ShardingCondition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// True when there is at least one condition and every one of them is always-false
    pub fn is_always_false(&self) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(ShardingCondition::is_always_false)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ShardingCondition> {
        self.conditions.iter()
    }
}

impl IntoIterator for ShardingConditions {
    type Item = ShardingCondition;
    type IntoIter = std::vec::IntoIter<ShardingCondition>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditions.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::route_value::ListRouteValue;
    use crate::types::ShardingValue;

    #[test]
    fn test_always_false_requires_every_condition() {
        assert!(!ShardingConditions::empty().is_always_false());
        let all_false = ShardingConditions::new(vec![
            ShardingCondition::AlwaysFalse,
            ShardingCondition::AlwaysFalse,
        ]);
        assert!(all_false.is_always_false());
        let list = ListRouteValue::new("user_id", "t_order", vec![ShardingValue::Int(1)]).unwrap();
        let mixed = ShardingConditions::new(vec![
            ShardingCondition::AlwaysFalse,
            ShardingCondition::new(vec![RouteValue::List(list)]),
        ]);
        assert!(!mixed.is_always_false());
    }

    #[test]
    fn test_find_route_value() {
        let list = ListRouteValue::new("user_id", "t_order", vec![ShardingValue::Int(1)]).unwrap();
        let condition = ShardingCondition::new(vec![RouteValue::List(list)]);
        assert!(condition.find("USER_ID", "t_order").is_some());
        assert!(condition.find("order_id", "t_order").is_none());
        assert!(ShardingCondition::AlwaysFalse.route_values().is_empty());
    }
}
