use anyhow::{anyhow, bail, Result};
use tracing::{debug, info};

use crate::clustering::selector::MaxSimilaritySelector;
use crate::clustering::similarity::SimilarityIndex;
use crate::clustering::store::ClusterStore;
use crate::clustering::types::PairKey;
use crate::scores::PairScoreTable;

/// How often the merge loop logs a progress checkpoint.
const PROGRESS_INTERVAL: u64 = 100;

/// Lifecycle of the engine. Each phase transition is one-way; `Done` permits
/// no further mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    SimilaritiesBuilt,
    Merging,
    Done,
}

/// Orchestrates greedy agglomerative merging: repeatedly take the two most
/// similar live clusters and merge them, until no pair's similarity exceeds
/// the threshold or one cluster remains.
///
/// The engine owns the cluster store, the similarity index, and the
/// max-similarity selector, and is the only component that touches more than
/// one of them; the components themselves communicate through nothing but
/// these calls.
pub struct ClusteringEngine {
    store: ClusterStore,
    table: PairScoreTable,
    index: SimilarityIndex,
    selector: MaxSimilaritySelector,
    threshold: f64,
    phase: Phase,
    merges: u64,
}

impl ClusteringEngine {
    /// Creates an engine over an initial partition and a read-only score
    /// table. Merging stops once the maximum similarity is ≤ `threshold`.
    pub fn new(store: ClusterStore, table: PairScoreTable, threshold: f64) -> Self {
        ClusteringEngine {
            store,
            table,
            index: SimilarityIndex::default(),
            selector: MaxSimilaritySelector::new(),
            threshold,
            phase: Phase::Init,
            merges: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn store(&self) -> &ClusterStore {
        &self.store
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// Number of merges performed so far.
    pub fn merges(&self) -> u64 {
        self.merges
    }

    /// Computes the all-pairs similarity table and fills the selector.
    /// This is the expensive O(k²) initialization step.
    pub fn build_similarities(&mut self) -> Result<()> {
        if self.phase != Phase::Init {
            bail!("similarities already built");
        }

        self.index = SimilarityIndex::build(&self.store, &self.table);
        for (key, entry) in self.index.sorted_entries() {
            self.selector.add(entry.avg, key);
        }
        self.selector.resort();

        self.phase = Phase::SimilaritiesBuilt;
        Ok(())
    }

    /// Runs the merge loop to completion and returns the number of merges.
    pub fn run(&mut self) -> Result<u64> {
        if self.phase != Phase::SimilaritiesBuilt {
            bail!("engine must build similarities before running");
        }
        self.phase = Phase::Merging;

        while self.store.len() > 1 {
            let Some(max_sim) = self.selector.pop_max() else {
                break;
            };
            if max_sim <= self.threshold {
                debug!(
                    "max similarity {:.4} at or below threshold {:.4}, stopping",
                    max_sim, self.threshold
                );
                break;
            }

            let pair = self
                .selector
                .pair_at(max_sim)
                .ok_or_else(|| anyhow!("selector returned a score with no live pair"))?;
            self.merge_pair(max_sim, pair)?;

            self.merges += 1;
            if self.merges % PROGRESS_INTERVAL == 0 {
                info!(
                    "{} merges done, {} clusters remain, current max {:.4}",
                    self.merges,
                    self.store.len(),
                    max_sim
                );
            }
        }

        self.phase = Phase::Done;
        info!(
            "clustering finished after {} merges, {} clusters remain",
            self.merges,
            self.store.len()
        );
        Ok(self.merges)
    }

    /// Performs one merge: the smaller id keeps the cluster, the larger id's
    /// cluster is absorbed, and every bystander's similarity to the merged
    /// result is recombined incrementally.
    fn merge_pair(&mut self, max_sim: f64, pair: PairKey) -> Result<()> {
        let keep = pair.lo();
        let gone = pair.hi();

        let entry = self
            .index
            .remove(pair)
            .ok_or_else(|| anyhow!("no similarity entry for merge pair {keep}/{gone}"))?;
        self.selector.remove(max_sim, pair);

        debug!(
            "merging clusters {} and {} (avg {:.4} over {} compares)",
            keep, gone, entry.avg, entry.count
        );
        self.store
            .merge(keep, gone, entry.avg, entry.total, entry.count)?;

        for current in self.store.ids() {
            if current == keep {
                continue;
            }
            let delta = self.index.combine_on_merge(current, keep, gone);
            for (stale_key, stale_entry) in &delta.removed {
                self.selector.remove(stale_entry.avg, *stale_key);
            }
            if let Some((new_key, new_entry)) = delta.added {
                self.selector.add(new_entry.avg, new_key);
            }
        }

        // Invariant sweep: nothing in the index may still reference the
        // absorbed cluster.
        for (stale_key, stale_entry) in self.index.remove_entries_for(gone) {
            self.selector.remove(stale_entry.avg, stale_key);
        }

        self.selector.resort();
        Ok(())
    }

    /// Consumes the engine and hands back the final partition. Only valid
    /// once the merge loop has finished.
    pub fn into_store(self) -> Result<ClusterStore> {
        if self.phase != Phase::Done {
            bail!("clustering has not finished");
        }
        Ok(self.store)
    }
}
