use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::clustering::store::ClusterStore;
use crate::clustering::types::{Cluster, ClusterId, PairKey, SimilarityEntry};
use crate::scores::PairScoreTable;

/// The changes [`SimilarityIndex::combine_on_merge`] makes, so the caller can
/// mirror them into the max-similarity selector. Entries listed in `removed`
/// were deleted from the index; `added` (if any) was inserted.
#[derive(Debug, Default)]
pub struct MergeDelta {
    pub removed: Vec<(PairKey, SimilarityEntry)>,
    pub added: Option<(PairKey, SimilarityEntry)>,
}

/// Sparse upper-triangular table of pairwise cluster similarity.
///
/// An entry exists for a pair of live clusters only if at least one element
/// pair across them has a score in the table. After each merge the affected
/// entries are recombined incrementally instead of rescanning element pairs,
/// which is what keeps repeated merging tractable: O(k) work per merge
/// rather than O(k · cluster-size²).
#[derive(Debug, Default)]
pub struct SimilarityIndex {
    entries: HashMap<PairKey, SimilarityEntry>,
}

impl SimilarityIndex {
    /// Scans every element pair across two clusters and aggregates the
    /// scores that exist. Unmatched element pairs contribute nothing and are
    /// not counted, so they never depress the average. Returns `None` when
    /// no pair at all was scored: such clusters have no edge and must never
    /// become merge candidates through the selector.
    pub fn compute_entry(
        table: &PairScoreTable,
        a: &Cluster,
        b: &Cluster,
    ) -> Option<SimilarityEntry> {
        let mut total = 0.0;
        let mut count = 0u64;

        for e1 in &a.elements {
            for e2 in &b.elements {
                if let Some(score) = table.lookup(e1, e2) {
                    total += score;
                    count += 1;
                }
            }
        }

        if count == 0 {
            None
        } else {
            Some(SimilarityEntry::new(total, count))
        }
    }

    /// Builds the all-pairs index for the initial partition. This is the
    /// O(k²) step that dominates initialization, so the candidate pairs are
    /// scanned in parallel; the score table is read-only and shared across
    /// workers without synchronization.
    pub fn build(store: &ClusterStore, table: &PairScoreTable) -> Self {
        let ids = store.ids();
        info!(
            "computing pairwise similarities across {} initial clusters",
            ids.len()
        );

        let mut candidates = Vec::new();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                candidates.push(PairKey::new(a, b));
            }
        }

        let entries: HashMap<PairKey, SimilarityEntry> = candidates
            .par_iter()
            .filter_map(|&key| {
                let a = store.get(key.lo())?;
                let b = store.get(key.hi())?;
                Self::compute_entry(table, a, b).map(|entry| (key, entry))
            })
            .collect();

        info!(
            "similarity index built: {} entries from {} candidate pairs",
            entries.len(),
            candidates.len()
        );
        SimilarityIndex { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: PairKey) -> Option<SimilarityEntry> {
        self.entries.get(&key).copied()
    }

    pub fn remove(&mut self, key: PairKey) -> Option<SimilarityEntry> {
        self.entries.remove(&key)
    }

    /// Entries in ascending key order, for the graph writer.
    pub fn sorted_entries(&self) -> Vec<(PairKey, SimilarityEntry)> {
        let mut all: Vec<(PairKey, SimilarityEntry)> =
            self.entries.iter().map(|(&k, &v)| (k, v)).collect();
        all.sort_by_key(|(key, _)| *key);
        all
    }

    /// Recomputes `current`'s similarity to the merged cluster after `gone`
    /// was absorbed into `kept`, using the incremental rule: both stale
    /// entries are removed and their combination (if any) becomes the entry
    /// for `current ↔ kept`.
    pub fn combine_on_merge(
        &mut self,
        current: ClusterId,
        kept: ClusterId,
        gone: ClusterId,
    ) -> MergeDelta {
        let mut delta = MergeDelta::default();

        let kept_key = PairKey::new(current, kept);
        let kept_side = self.entries.remove(&kept_key);
        if let Some(entry) = kept_side {
            delta.removed.push((kept_key, entry));
        }

        let gone_key = PairKey::new(current, gone);
        let gone_side = self.entries.remove(&gone_key);
        if let Some(entry) = gone_side {
            delta.removed.push((gone_key, entry));
        }

        if let Some(combined) = SimilarityEntry::combine(kept_side, gone_side) {
            self.entries.insert(kept_key, combined);
            delta.added = Some((kept_key, combined));
        }

        delta
    }

    /// Purges every entry referencing a removed cluster. After a merge loop
    /// iteration this should find nothing; it exists to uphold the invariant
    /// that the index only ever names live clusters.
    pub fn remove_entries_for(&mut self, id: ClusterId) -> Vec<(PairKey, SimilarityEntry)> {
        let stale: Vec<PairKey> = self
            .entries
            .keys()
            .filter(|key| key.touches(id))
            .copied()
            .collect();
        if !stale.is_empty() {
            debug!("purging {} leftover entries for cluster {}", stale.len(), id);
        }
        stale
            .into_iter()
            .filter_map(|key| self.entries.remove(&key).map(|entry| (key, entry)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    fn el(language: &str, form: &str) -> Element {
        Element::new(language, form, "gloss")
    }

    fn table(pairs: &[(Element, Element, f64)]) -> PairScoreTable {
        let mut t = PairScoreTable::new();
        for (a, b, s) in pairs {
            t.insert(a.clone(), b.clone(), *s);
        }
        t
    }

    #[test]
    fn unmatched_pairs_do_not_count_toward_the_average() {
        let a = Cluster::new(0, vec![el("C", "a"), el("C", "b")]);
        let b = Cluster::new(1, vec![el("M", "c")]);
        let t = table(&[(el("C", "a"), el("M", "c"), 0.6)]);

        let entry = SimilarityIndex::compute_entry(&t, &a, &b).unwrap();
        assert_eq!(entry.count, 1);
        assert!((entry.avg - 0.6).abs() < 1e-12);
    }

    #[test]
    fn zero_scored_pairs_means_no_entry() {
        let a = Cluster::new(0, vec![el("C", "a")]);
        let b = Cluster::new(1, vec![el("M", "c")]);
        let t = table(&[(el("C", "a"), el("F", "z"), 0.9)]);
        assert_eq!(SimilarityIndex::compute_entry(&t, &a, &b), None);
    }

    #[test]
    fn build_only_creates_entries_with_scored_pairs() {
        let store = ClusterStore::from_singletons(vec![el("C", "a"), el("F", "c"), el("M", "b")]);
        // ids: 0 = (C,a), 1 = (F,c), 2 = (M,b)
        let t = table(&[(el("C", "a"), el("M", "b"), 0.8)]);

        let index = SimilarityIndex::build(&store, &t);
        assert_eq!(index.len(), 1);
        let entry = index.get(PairKey::new(0, 2)).unwrap();
        assert_eq!(entry.count, 1);
        assert!(index.get(PairKey::new(0, 1)).is_none());
        assert!(index.get(PairKey::new(1, 2)).is_none());
    }

    #[test]
    fn combine_on_merge_sums_both_sides() {
        let mut index = SimilarityIndex::default();
        index.entries.insert(PairKey::new(2, 0), SimilarityEntry::new(0.3, 1));
        index.entries.insert(PairKey::new(2, 1), SimilarityEntry::new(-0.1, 1));

        // cluster 1 absorbed into cluster 0; cluster 2 is the bystander
        let delta = index.combine_on_merge(2, 0, 1);
        assert_eq!(delta.removed.len(), 2);
        let (key, entry) = delta.added.unwrap();
        assert_eq!(key, PairKey::new(0, 2));
        assert_eq!(entry.count, 2);
        assert!((entry.avg - 0.1).abs() < 1e-12);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn combine_on_merge_reuses_a_lone_side() {
        let mut index = SimilarityIndex::default();
        index.entries.insert(PairKey::new(2, 1), SimilarityEntry::new(0.4, 2));

        let delta = index.combine_on_merge(2, 0, 1);
        assert_eq!(delta.removed.len(), 1);
        let (key, entry) = delta.added.unwrap();
        assert_eq!(key, PairKey::new(0, 2));
        assert_eq!(entry.count, 2);
        assert!((entry.total - 0.4).abs() < 1e-12);
    }

    #[test]
    fn combine_on_merge_with_no_information_adds_nothing() {
        let mut index = SimilarityIndex::default();
        let delta = index.combine_on_merge(2, 0, 1);
        assert!(delta.removed.is_empty());
        assert!(delta.added.is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn remove_entries_for_purges_every_reference() {
        let mut index = SimilarityIndex::default();
        index.entries.insert(PairKey::new(0, 1), SimilarityEntry::new(0.1, 1));
        index.entries.insert(PairKey::new(1, 2), SimilarityEntry::new(0.2, 1));
        index.entries.insert(PairKey::new(0, 2), SimilarityEntry::new(0.3, 1));

        let removed = index.remove_entries_for(1);
        assert_eq!(removed.len(), 2);
        assert_eq!(index.len(), 1);
        assert!(index.get(PairKey::new(0, 2)).is_some());
    }
}
