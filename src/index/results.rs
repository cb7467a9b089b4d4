use super::atoms::AtomSet;
use super::keys::{documents_key, text_key};
use super::types::{ExprId, SearchHit};
use crate::error::{IndexError, Result};
use crate::storage::protocol::Command;
use crate::storage::store::Store;

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

/// A scored candidate that has not been hydrated with its text and documents yet.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub id: ExprId,
    pub score: f64,
    pub matched: AtomSet,
}

/// Higher score first; equal scores fall back to the smaller id.
pub fn rank_order(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}

/// Keeps the `limit` best candidates in rank order.
///
/// Partitions around the `limit`-th element first so only the survivors are fully sorted.
pub fn select_top(candidates: &mut Vec<RankedCandidate>, limit: usize) {
    if limit == 0 {
        candidates.clear();
        return;
    }
    if candidates.len() > limit {
        candidates.select_nth_unstable_by(limit - 1, rank_order);
        candidates.truncate(limit);
    }
    candidates.sort_by(rank_order);
}

/// Ranked search results, pulled one at a time.
///
/// The ranking is fixed when the search runs; text and documents of an entry are fetched
/// from the store only when that entry is pulled with [`SearchResults::next`]. Pulled
/// entries are consumed, so the sequence cannot be restarted.
pub struct SearchResults<S> {
    store: Arc<S>,
    pending: VecDeque<RankedCandidate>,
}

impl<S: Store> SearchResults<S> {
    pub(crate) fn new(store: Arc<S>, ranked: Vec<RankedCandidate>) -> Self {
        Self {
            store,
            pending: ranked.into(),
        }
    }

    pub(crate) fn empty(store: Arc<S>) -> Self {
        Self::new(store, Vec::new())
    }

    /// Entries not pulled yet.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Ids and scores of the entries not pulled yet, in rank order.
    pub fn ranking(&self) -> impl Iterator<Item = (ExprId, f64)> + '_ {
        self.pending.iter().map(|c| (c.id, c.score))
    }

    pub async fn next(&mut self) -> Option<Result<SearchHit>> {
        let candidate = self.pending.pop_front()?;
        Some(self.hydrate(candidate).await)
    }

    /// Pulls every remaining entry.
    pub async fn collect_all(mut self) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::with_capacity(self.pending.len());
        while let Some(hit) = self.next().await {
            hits.push(hit?);
        }
        Ok(hits)
    }

    async fn hydrate(&self, candidate: RankedCandidate) -> Result<SearchHit> {
        let text_key = text_key(candidate.id);
        let mut pipe = self.store.pipeline();
        pipe.push(Command::get(text_key.clone()))
            .push(Command::smembers(documents_key(candidate.id)));
        let mut replies = pipe.execute().await?.into_iter();

        let text = match replies.next() {
            Some(reply) => reply.into_text()?,
            None => None,
        };
        let text = text.ok_or(IndexError::MissingValue { key: text_key })?;
        let documents = match replies.next() {
            Some(reply) => reply.into_members()?,
            None => Default::default(),
        };

        Ok(SearchHit {
            id: candidate.id,
            text,
            score: candidate.score,
            matched_atoms: candidate.matched,
            documents,
        })
    }
}
