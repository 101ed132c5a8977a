use std::sync::atomic::{AtomicI64, Ordering};
use tracing::trace;

use crate::types::ShardingValue;

/// Source of synthetic primary-key values for INSERT statements
pub trait KeyGenerator: Send + Sync {
    fn next_key(&self, table: &str) -> ShardingValue;
}

/// Monotonic integer keys shared by every table
#[derive(Debug)]
pub struct IncrementKeyGenerator {
    next: AtomicI64,
}

impl IncrementKeyGenerator {
    pub fn new(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }
}

impl Default for IncrementKeyGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl KeyGenerator for IncrementKeyGenerator {
    fn next_key(&self, table: &str) -> ShardingValue {
        let key = self.next.fetch_add(1, Ordering::Relaxed);
        trace!("Generated key {} for {}", key, table);
        ShardingValue::Int(key)
    }
}
