use super::atoms::{Atom, AtomExtractor, AtomSet, SourceExpression};
use super::keys::{
    NEXT_ID_KEY, count_key, documents_key, parse_count, parse_id, posting_key, text_key,
};
use super::ranker::Ranker;
use super::results::{RankedCandidate, SearchResults, select_top};
use super::types::{AddOutcome, ExprId, ExpressionRecord};
use crate::error::{IndexError, Result};
use crate::storage::protocol::Command;
use crate::storage::store::Store;

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Maximum number of entries returned by `search`.
pub const RESULT_LIMIT: usize = 10;

const INSERT_LOCK_STRIPES: usize = 64;

/// Structural search index over expression trees.
///
/// Generic over the store backend, the atom extraction strategy and the scoring function.
/// All state lives in the store, so several instances may share one store. Deduplication of
/// concurrent inserts is guaranteed only between calls on the same instance: `add` holds a
/// lock keyed by the hash of the atom set across its check-then-write sequence.
pub struct ExpressionIndex<S, E, R> {
    store: Arc<S>,
    extractor: E,
    ranker: R,
    insert_locks: Vec<Mutex<()>>,
}

impl<S, E, R> ExpressionIndex<S, E, R>
where
    S: Store,
    E: AtomExtractor,
    R: Ranker,
{
    pub fn new(store: Arc<S>, extractor: E, ranker: R) -> Self {
        Self {
            store,
            extractor,
            ranker,
            insert_locks: (0..INSERT_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn atoms(&self, tree: &E::Tree) -> AtomSet {
        self.extractor.extract_atoms(tree)
    }

    /// Indexes `tree`.
    ///
    /// If an expression with the same atom set already exists, the tree's document is added
    /// to that record. Otherwise a new id is allocated and the record and its postings are
    /// written in one batch. Trees without atoms are not indexed.
    pub async fn add(&self, tree: &E::Tree) -> Result<AddOutcome> {
        let atoms = self.extractor.extract_atoms(tree);
        let document = tree.document();
        if atoms.is_empty() {
            tracing::debug!("Skipping expression without atoms from {}", document);
            return Ok(AddOutcome::Ignored);
        }

        let _guard = self.insert_locks[lock_stripe(&atoms)].lock().await;

        if let Some(id) = self.resolve_exact(&atoms).await? {
            let added = self.store.sadd(&documents_key(id), document).await?;
            if added {
                tracing::debug!("Expression {} now also found in {}", id, document);
            }
            return Ok(AddOutcome::Merged(id));
        }

        let raw_id = self.store.incr(NEXT_ID_KEY).await?;
        let id = ExprId::try_from(raw_id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| IndexError::CorruptValue {
                key: NEXT_ID_KEY.to_string(),
                value: raw_id.to_string(),
            })?;

        let mut pipe = self.store.pipeline();
        pipe.push(Command::set(text_key(id), tree.canonical_text()))
            .push(Command::set(count_key(id), atoms.len()))
            .push(Command::sadd(documents_key(id), document));
        for atom in &atoms {
            pipe.push(Command::sadd(posting_key(atom), id));
        }
        pipe.execute().await?;

        tracing::info!(
            "Created expression {} with {} atom(s) from {}",
            id,
            atoms.len(),
            document
        );
        Ok(AddOutcome::Created(id))
    }

    /// Returns the id of the expression whose atom set equals the tree's, if any.
    pub async fn exact_search(&self, tree: &E::Tree) -> Result<Option<ExprId>> {
        let atoms = self.extractor.extract_atoms(tree);
        self.resolve_exact(&atoms).await
    }

    /// The postings intersection yields every expression containing all query atoms; among
    /// those, equal cardinality means equal sets. The smallest such id wins.
    async fn resolve_exact(&self, atoms: &AtomSet) -> Result<Option<ExprId>> {
        if atoms.is_empty() {
            return Ok(None);
        }

        let mut keys: Vec<String> = atoms.iter().map(posting_key).collect();
        let members = if keys.len() == 1 {
            let key = keys.remove(0);
            self.store.smembers(&key).await?
        } else {
            self.store.sinter(keys).await?
        };
        if members.is_empty() {
            return Ok(None);
        }

        let mut candidates = members
            .iter()
            .map(|raw| parse_id("postings intersection", raw))
            .collect::<Result<Vec<ExprId>>>()?;
        candidates.sort_unstable();

        let mut pipe = self.store.pipeline();
        for id in &candidates {
            pipe.push(Command::get(count_key(*id)));
        }
        let replies = pipe.execute().await?;

        for (id, reply) in candidates.into_iter().zip(replies) {
            let count = parse_count(&count_key(id), reply.into_text()?)?;
            if count == atoms.len() {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Ranks every expression sharing at least one atom with the tree and returns the best
    /// `RESULT_LIMIT` of them.
    pub async fn search(&self, tree: &E::Tree) -> Result<SearchResults<S>> {
        let atoms = self.extractor.extract_atoms(tree);
        if atoms.is_empty() {
            return Ok(SearchResults::empty(self.store.clone()));
        }

        let query: Vec<&Atom> = atoms.iter().collect();
        let mut pipe = self.store.pipeline();
        for atom in &query {
            pipe.push(Command::smembers(posting_key(atom)));
        }
        let postings = pipe.execute().await?;

        let mut matches: HashMap<ExprId, AtomSet> = HashMap::new();
        for (atom, reply) in query.into_iter().zip(postings) {
            let key = posting_key(atom);
            for raw in reply.into_members()? {
                let id = parse_id(&key, &raw)?;
                matches.entry(id).or_default().insert(atom.clone());
            }
        }
        if matches.is_empty() {
            return Ok(SearchResults::empty(self.store.clone()));
        }

        let matches: Vec<(ExprId, AtomSet)> = matches.into_iter().collect();
        let mut pipe = self.store.pipeline();
        for (id, _) in &matches {
            pipe.push(Command::get(count_key(*id)));
        }
        let counts = pipe.execute().await?;

        let mut ranked = Vec::with_capacity(matches.len());
        for ((id, matched), reply) in matches.into_iter().zip(counts) {
            let candidate_count = parse_count(&count_key(id), reply.into_text()?)?;
            let score = self.ranker.rank(&matched, atoms.len(), candidate_count);
            ranked.push(RankedCandidate { id, score, matched });
        }

        tracing::debug!(
            "Search over {} atom(s) matched {} candidate(s)",
            atoms.len(),
            ranked.len()
        );
        select_top(&mut ranked, RESULT_LIMIT);
        Ok(SearchResults::new(self.store.clone(), ranked))
    }

    /// Reads the full record for `id`, or `None` if it was never created.
    pub async fn record(&self, id: ExprId) -> Result<Option<ExpressionRecord>> {
        let mut pipe = self.store.pipeline();
        pipe.push(Command::get(text_key(id)))
            .push(Command::get(count_key(id)))
            .push(Command::smembers(documents_key(id)));
        let mut replies = pipe.execute().await?.into_iter();

        let (Some(text), Some(count), Some(documents)) =
            (replies.next(), replies.next(), replies.next())
        else {
            return Ok(None);
        };
        let text = text.into_text()?;
        let count = count.into_text()?;
        let documents: BTreeSet<String> = documents.into_members()?;

        let Some(text) = text else {
            if count.is_none() && documents.is_empty() {
                return Ok(None);
            }
            return Err(IndexError::MissingValue { key: text_key(id) });
        };
        let atom_count = parse_count(&count_key(id), count)?;

        Ok(Some(ExpressionRecord {
            id,
            text,
            atom_count,
            documents,
        }))
    }
}

fn lock_stripe(atoms: &AtomSet) -> usize {
    let mut hasher = DefaultHasher::new();
    atoms.hash(&mut hasher);
    (hasher.finish() % INSERT_LOCK_STRIPES as u64) as usize
}
