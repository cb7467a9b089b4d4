//! Typed access to a key-value backend.
//!
//! Every backend implements a single primitive, [`Store::execute`], which runs a batch of
//! independent commands in one round trip. The single-command helpers and [`Pipeline`] are
//! built on top of it.

use super::protocol::{Command, Reply};
use crate::error::StoreError;
use std::collections::BTreeSet;
use std::future::Future;

pub trait Store: Send + Sync {
    /// Runs `commands` in order and returns one reply per command.
    ///
    /// Not atomic: when an error is returned, an unknown prefix of the batch may already
    /// have been applied.
    fn execute(
        &self,
        commands: Vec<Command>,
    ) -> impl Future<Output = Result<Vec<Reply>, StoreError>> + Send;

    fn pipeline(&self) -> Pipeline<'_, Self>
    where
        Self: Sized,
    {
        Pipeline::new(self)
    }

    fn execute_one(
        &self,
        command: Command,
    ) -> impl Future<Output = Result<Reply, StoreError>> + Send {
        async move {
            let mut replies = self.execute(vec![command]).await?;
            if replies.len() != 1 {
                return Err(StoreError::ReplyCount {
                    expected: 1,
                    got: replies.len(),
                });
            }
            Ok(replies.remove(0))
        }
    }

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        async move { self.execute_one(Command::get(key)).await?.into_text() }
    }

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move { self.execute_one(Command::set(key, value)).await?.into_ok() }
    }

    fn incr(&self, key: &str) -> impl Future<Output = Result<i64, StoreError>> + Send {
        async move { self.execute_one(Command::incr(key)).await?.into_integer() }
    }

    /// Returns `true` when `member` was not already present.
    fn sadd(
        &self,
        key: &str,
        member: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        async move {
            let added = self
                .execute_one(Command::sadd(key, member))
                .await?
                .into_integer()?;
            Ok(added > 0)
        }
    }

    fn smembers(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<BTreeSet<String>, StoreError>> + Send {
        async move { self.execute_one(Command::smembers(key)).await?.into_members() }
    }

    fn sinter(
        &self,
        keys: Vec<String>,
    ) -> impl Future<Output = Result<BTreeSet<String>, StoreError>> + Send {
        async move { self.execute_one(Command::sinter(keys)).await?.into_members() }
    }
}

/// Collects independent commands and sends them to the backend as one batch.
pub struct Pipeline<'a, S> {
    store: &'a S,
    commands: Vec<Command>,
}

impl<'a, S: Store> Pipeline<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Sends the batch. An empty pipeline completes without contacting the backend.
    pub async fn execute(self) -> Result<Vec<Reply>, StoreError> {
        if self.commands.is_empty() {
            return Ok(Vec::new());
        }
        let expected = self.commands.len();
        let replies = self.store.execute(self.commands).await?;
        if replies.len() != expected {
            return Err(StoreError::ReplyCount {
                expected,
                got: replies.len(),
            });
        }
        Ok(replies)
    }
}
