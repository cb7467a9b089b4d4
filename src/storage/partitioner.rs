use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const DEFAULT_PARTITIONS: u32 = 256;

/// Spreads keys over a fixed number of shards so unrelated keys do not contend on one map.
#[derive(Debug, Clone)]
pub struct PartitionManager {
    pub(crate) num_partitions: u32,
}

impl PartitionManager {
    pub fn new() -> Self {
        Self::with_partitions(DEFAULT_PARTITIONS)
    }

    pub fn with_partitions(num_partitions: u32) -> Self {
        Self {
            num_partitions: num_partitions.max(1),
        }
    }

    pub fn get_partition(&self, key: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let hash = hasher.finish() as u32;
        hash % self.num_partitions
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }
}

impl Default for PartitionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_deterministic() {
        let manager = PartitionManager::new();

        let p1 = manager.get_partition("pair:x|y|n:exprs");
        let p2 = manager.get_partition("pair:x|y|n:exprs");
        assert_eq!(p1, p2);

        assert!(p1 < 256);
    }

    #[test]
    fn test_zero_partitions_clamped_to_one() {
        let manager = PartitionManager::with_partitions(0);
        assert_eq!(manager.num_partitions(), 1);
        assert_eq!(manager.get_partition("anything"), 0);
    }
}
