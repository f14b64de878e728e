use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use crate::clustering::types::PairKey;

/// A score value usable as a map key: bitwise equality and hashing, total
/// ordering via `f64::total_cmp`. Scores flow through identical arithmetic
/// on every run, so bitwise identity is exactly the reproducibility the
/// selector needs.
#[derive(Debug, Clone, Copy)]
struct ScoreKey(f64);

impl PartialEq for ScoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for ScoreKey {}

impl Hash for ScoreKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.to_bits());
    }
}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Amortized "find the current maximum similarity" structure with lazy
/// deletion.
///
/// Similarity values constantly go stale as clusters merge, but entries are
/// only ever removed, never decreased in place, so a full decrease-key
/// priority queue is more machinery than the loop needs. Instead the
/// selector keeps a reverse index from score to the pairs currently holding
/// it, plus a flat list of every score ever seen. Removals touch only the
/// reverse index; the flat list is filtered lazily when the maximum is
/// popped, and re-sorted once per merge iteration rather than per update.
#[derive(Debug, Default)]
pub struct MaxSimilaritySelector {
    pairs_by_score: HashMap<ScoreKey, BTreeSet<PairKey>>,
    all_scores: Vec<ScoreKey>,
    sorted: bool,
}

impl MaxSimilaritySelector {
    pub fn new() -> Self {
        MaxSimilaritySelector::default()
    }

    /// Registers a pair as holding `score`. The flat list is appended to and
    /// left unsorted until the next [`resort`](Self::resort).
    pub fn add(&mut self, score: f64, pair: PairKey) {
        let key = ScoreKey(score);
        self.pairs_by_score.entry(key).or_default().insert(pair);
        self.all_scores.push(key);
        self.sorted = false;
    }

    /// Unregisters a pair from `score`. Only the reverse index is updated;
    /// the flat list keeps its stale copy until `pop_max` filters it out.
    pub fn remove(&mut self, score: f64, pair: PairKey) {
        let key = ScoreKey(score);
        if let Some(pairs) = self.pairs_by_score.get_mut(&key) {
            pairs.remove(&pair);
            if pairs.is_empty() {
                self.pairs_by_score.remove(&key);
            }
        }
    }

    /// Sorts the flat list ascending so that popping from the end yields the
    /// maximum. Called once per merge iteration, after the batch of updates.
    pub fn resort(&mut self) {
        self.all_scores.sort();
        self.sorted = true;
    }

    /// Pops score values off the flat list until one is still genuinely held
    /// by some pair, and returns it. Values invalidated by earlier removals
    /// are discarded as they surface. Returns `None` when the list is
    /// exhausted.
    ///
    /// The returned value is consumed from the flat list whether or not the
    /// caller goes on to merge: every `add` pushed exactly one copy, so one
    /// pop balances one registration of that score.
    pub fn pop_max(&mut self) -> Option<f64> {
        debug_assert!(self.sorted, "pop_max called before resort");
        loop {
            let key = self.all_scores.pop()?;
            if self.pairs_by_score.contains_key(&key) {
                return Some(key.0);
            }
        }
    }

    /// The pair to merge for a score returned by `pop_max`: of all pairs
    /// currently holding it, the lexicographically largest `(idA, idB)`
    /// tuple. This tie-break must be stable across runs for the merge
    /// sequence to be reproducible.
    pub fn pair_at(&self, score: f64) -> Option<PairKey> {
        self.pairs_by_score
            .get(&ScoreKey(score))
            .and_then(|pairs| pairs.iter().next_back())
            .copied()
    }

    /// True if no pair currently holds any score. Stale flat-list entries do
    /// not count.
    pub fn is_exhausted(&self) -> bool {
        self.pairs_by_score.is_empty()
    }
}
