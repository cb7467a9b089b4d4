use super::partitioner::PartitionManager;
use super::protocol::{Command, Reply, ValueKind};
use super::store::Store;
use crate::error::StoreError;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredValue {
    Scalar(String),
    Set(BTreeSet<String>),
}

/// In-process key-value store sharded by key partition.
///
/// Each command locks only the shard entry it touches, so `Incr` and `SAdd` are atomic per
/// key. A batch is applied command by command and is not isolated from concurrent batches.
pub struct MemoryStore {
    local_data: Arc<DashMap<u32, DashMap<String, StoredValue>>>,
    partitioner: PartitionManager,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_partitioner(PartitionManager::new())
    }

    pub fn with_partitioner(partitioner: PartitionManager) -> Self {
        Self {
            local_data: Arc::new(DashMap::new()),
            partitioner,
        }
    }

    /// Runs a batch and stops at the first failing command.
    ///
    /// Returns the replies of the commands that completed, plus the error that stopped the
    /// batch, if any. Completed commands stay applied.
    pub fn run_batch(&self, commands: Vec<Command>) -> (Vec<Reply>, Option<StoreError>) {
        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            match self.apply(command) {
                Ok(reply) => replies.push(reply),
                Err(e) => return (replies, Some(e)),
            }
        }
        (replies, None)
    }

    pub fn apply(&self, command: Command) -> Result<Reply, StoreError> {
        match command {
            Command::Get { key } => self.get_scalar(&key),
            Command::Set { key, value } => self.set_scalar(key, value),
            Command::Incr { key } => self.incr_counter(key),
            Command::SAdd { key, member } => self.add_member(key, member),
            Command::SMembers { key } => self.read_set(&key).map(Reply::Members),
            Command::SInter { keys } => self.intersect(&keys).map(Reply::Members),
        }
    }

    fn shard(&self, key: &str) -> dashmap::mapref::one::Ref<'_, u32, DashMap<String, StoredValue>> {
        let partition = self.partitioner.get_partition(key);
        if let Some(shard) = self.local_data.get(&partition) {
            return shard;
        }
        self.local_data
            .entry(partition)
            .or_insert_with(DashMap::new)
            .downgrade()
    }

    fn get_scalar(&self, key: &str) -> Result<Reply, StoreError> {
        let shard = self.shard(key);
        match shard.get(key).as_deref() {
            None => Ok(Reply::Nil),
            Some(StoredValue::Scalar(value)) => Ok(Reply::Text(value.clone())),
            Some(StoredValue::Set(_)) => Err(wrong_type(key, ValueKind::Scalar)),
        }
    }

    fn set_scalar(&self, key: String, value: String) -> Result<Reply, StoreError> {
        let shard = self.shard(&key);
        match shard.entry(key) {
            Entry::Occupied(mut occupied) => {
                if let StoredValue::Set(_) = occupied.get() {
                    return Err(wrong_type(occupied.key(), ValueKind::Scalar));
                }
                occupied.insert(StoredValue::Scalar(value));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::Scalar(value));
            }
        }
        Ok(Reply::Ok)
    }

    fn incr_counter(&self, key: String) -> Result<Reply, StoreError> {
        let shard = self.shard(&key);
        let mut entry = shard
            .entry(key.clone())
            .or_insert_with(|| StoredValue::Scalar("0".to_string()));
        match entry.value_mut() {
            StoredValue::Scalar(value) => {
                let current: i64 = value.parse().map_err(|_| StoreError::NotAnInteger {
                    key: key.clone(),
                    value: value.clone(),
                })?;
                let next = current.checked_add(1).ok_or_else(|| StoreError::NotAnInteger {
                    key: key.clone(),
                    value: value.clone(),
                })?;
                *value = next.to_string();
                Ok(Reply::Int(next))
            }
            StoredValue::Set(_) => Err(wrong_type(&key, ValueKind::Scalar)),
        }
    }

    fn add_member(&self, key: String, member: String) -> Result<Reply, StoreError> {
        let shard = self.shard(&key);
        let mut entry = shard
            .entry(key.clone())
            .or_insert_with(|| StoredValue::Set(BTreeSet::new()));
        match entry.value_mut() {
            StoredValue::Set(members) => Ok(Reply::Int(members.insert(member) as i64)),
            StoredValue::Scalar(_) => Err(wrong_type(&key, ValueKind::Set)),
        }
    }

    fn read_set(&self, key: &str) -> Result<BTreeSet<String>, StoreError> {
        let shard = self.shard(key);
        match shard.get(key).as_deref() {
            None => Ok(BTreeSet::new()),
            Some(StoredValue::Set(members)) => Ok(members.clone()),
            Some(StoredValue::Scalar(_)) => Err(wrong_type(key, ValueKind::Set)),
        }
    }

    fn intersect(&self, keys: &[String]) -> Result<BTreeSet<String>, StoreError> {
        let mut sets = Vec::with_capacity(keys.len());
        for key in keys {
            let members = self.read_set(key)?;
            if members.is_empty() {
                return Ok(BTreeSet::new());
            }
            sets.push(members);
        }
        sets.sort_by_key(|members| members.len());

        let mut sets = sets.into_iter();
        let Some(mut result) = sets.next() else {
            return Ok(BTreeSet::new());
        };
        for other in sets {
            result.retain(|member| other.contains(member));
            if result.is_empty() {
                break;
            }
        }
        Ok(result)
    }

    pub fn local_partition_count(&self) -> usize {
        self.local_data
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .count()
    }

    pub fn local_entry_count(&self) -> usize {
        self.local_data
            .iter()
            .map(|entry| entry.value().len())
            .sum()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn execute(
        &self,
        commands: Vec<Command>,
    ) -> impl Future<Output = Result<Vec<Reply>, StoreError>> + Send {
        let outcome = self.run_batch(commands);
        async move {
            match outcome {
                (replies, None) => Ok(replies),
                (_, Some(e)) => Err(e),
            }
        }
    }
}

fn wrong_type(key: &str, expected: ValueKind) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        expected,
    }
}
