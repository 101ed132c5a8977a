use tracing::{debug, trace};

use crate::route::{RouteValue, ShardingCondition};

/// Turns the route values of each AND-group into sharding conditions
pub struct ShardingConditionAssembler;

impl ShardingConditionAssembler {
    /// One condition per AND-group, route values kept in encounter order.
    ///
    /// An AND-group without any route value can match rows on every node, so the
    /// whole OR-segment is voided and an empty list is returned.
    pub fn assemble(and_groups: Vec<Vec<RouteValue>>) -> Vec<ShardingCondition> {
        if let Some(position) = and_groups.iter().position(Vec::is_empty) {
            debug!(
                "AND-group {} of {} has no sharding predicate, OR-segment cannot be pruned",
                position,
                and_groups.len()
            );
            return Vec::new();
        }
        and_groups
            .into_iter()
            .map(|route_values| {
                trace!("Assembled condition with {} route value(s)", route_values.len());
                ShardingCondition::new(route_values)
            })
            .collect()
    }
}
