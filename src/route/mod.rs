// Route values and the sharding conditions built from them
pub mod condition;
pub mod route_value;

pub use condition::{ShardingCondition, ShardingConditions};
pub use route_value::{ListRouteValue, RangeRouteValue, RouteValue, ValueRange};
