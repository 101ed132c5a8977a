// Value types shared by the resolver, route values and optimize results
pub mod value;

pub use value::{ShardingValue, SqlValue, ValueKind};
