use tracing::{debug, trace};

use crate::Result;
use crate::route::{
    ListRouteValue, RangeRouteValue, RouteValue, ShardingCondition, ShardingConditions, ValueRange,
};
use crate::types::ShardingValue;

/// Merges route values that constrain the same column inside one condition
pub struct ConditionOptimizer;

impl ConditionOptimizer {
    /// Optimize every condition, keeping their order
    pub fn optimize(conditions: ShardingConditions) -> Result<ShardingConditions> {
        let optimized = conditions
            .into_iter()
            .map(Self::optimize_condition)
            .collect::<Result<Vec<_>>>()?;
        Ok(ShardingConditions::new(optimized))
    }

    /// Leave at most one route value per `(column, table)`; columns keep first-occurrence order.
    ///
    /// Stops at the first contradiction and returns the always-false condition.
    pub fn optimize_condition(condition: ShardingCondition) -> Result<ShardingCondition> {
        let ShardingCondition::RouteValues(route_values) = condition else {
            return Ok(ShardingCondition::AlwaysFalse);
        };
        let mut merged: Vec<RouteValue> = Vec::with_capacity(route_values.len());
        for route_value in route_values {
            let Some(key) = route_value.column_key() else {
                debug!("Condition carries an always-false route value");
                return Ok(ShardingCondition::AlwaysFalse);
            };
            let existing = merged.iter().position(|m| m.column_key() == Some(key));
            match existing {
                Some(index) => {
                    let combined = Self::merge(&merged[index], &route_value)?;
                    if combined.is_always_false() {
                        debug!("Route values on {}.{} contradict each other", key.1, key.0);
                        return Ok(ShardingCondition::AlwaysFalse);
                    }
                    trace!("Merged route value: {}", combined);
                    merged[index] = combined;
                }
                None => merged.push(route_value),
            }
        }
        Ok(ShardingCondition::new(merged))
    }

    /// Intersect two route values on the same column
    pub fn merge(left: &RouteValue, right: &RouteValue) -> Result<RouteValue> {
        match (left, right) {
            (RouteValue::AlwaysFalse, _) | (_, RouteValue::AlwaysFalse) => Ok(RouteValue::AlwaysFalse),
            (RouteValue::List(a), RouteValue::List(b)) => Self::merge_lists(a, b),
            (RouteValue::Range(a), RouteValue::Range(b)) => Ok(match a.range().intersect(b.range())? {
                Some(range) => RouteValue::Range(RangeRouteValue::new(a.column(), a.table(), range)),
                None => RouteValue::AlwaysFalse,
            }),
            (RouteValue::List(list), RouteValue::Range(range))
            | (RouteValue::Range(range), RouteValue::List(list)) => Self::filter_list(list, range.range()),
        }
    }

    fn merge_lists(left: &ListRouteValue, right: &ListRouteValue) -> Result<RouteValue> {
        ShardingValue::ensure_same_kind(left.values().iter().chain(right.values()))?;
        let values = left
            .values()
            .iter()
            .filter(|value| right.values().contains(value))
            .cloned()
            .collect();
        Ok(Self::list_or_false(left, values))
    }

    fn filter_list(list: &ListRouteValue, range: &ValueRange) -> Result<RouteValue> {
        let mut values = Vec::with_capacity(list.values().len());
        for value in list.values() {
            if range.contains(value)? {
                values.push(value.clone());
            }
        }
        Ok(Self::list_or_false(list, values))
    }

    fn list_or_false(template: &ListRouteValue, values: Vec<ShardingValue>) -> RouteValue {
        match ListRouteValue::new(template.column(), template.table(), values) {
            Some(list) => RouteValue::List(list),
            None => RouteValue::AlwaysFalse,
        }
    }
}
