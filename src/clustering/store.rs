use anyhow::{bail, Result};
use std::collections::BTreeMap;
use tracing::debug;

use crate::clustering::types::{Cluster, ClusterId};
use crate::element::Element;

/// Owns all live clusters, keyed by id.
///
/// The backing map is a `BTreeMap` so that iteration order is the id order,
/// which keeps every scan over live clusters deterministic.
#[derive(Debug, Clone, Default)]
pub struct ClusterStore {
    clusters: BTreeMap<ClusterId, Cluster>,
}

impl ClusterStore {
    /// One cluster per element. Elements are sorted first so that id
    /// assignment does not depend on input order.
    pub fn from_singletons(mut elements: Vec<Element>) -> Self {
        elements.sort();
        elements.dedup();
        let clusters = elements
            .into_iter()
            .enumerate()
            .map(|(i, element)| (i as ClusterId, Cluster::new(i as ClusterId, vec![element])))
            .collect();
        ClusterStore { clusters }
    }

    /// One cluster per pre-existing group, ids following group order (which
    /// is the order of the definition-sets file that produced them).
    pub fn from_groups(groups: Vec<Vec<Element>>) -> Self {
        let clusters = groups
            .into_iter()
            .enumerate()
            .map(|(i, group)| (i as ClusterId, Cluster::new(i as ClusterId, group)))
            .collect();
        ClusterStore { clusters }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn get(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    pub fn contains(&self, id: ClusterId) -> bool {
        self.clusters.contains_key(&id)
    }

    /// Live cluster ids in ascending order.
    pub fn ids(&self) -> Vec<ClusterId> {
        self.clusters.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    /// Merges `lose` into `keep`, folding the consumed similarity entry into
    /// `keep`'s statistics and removing `lose` from the store.
    ///
    /// Merging an id that is not live is an invariant violation: the caller
    /// is driving the merge loop off the similarity index, which must only
    /// ever name live clusters. The error is fatal, not recoverable.
    pub fn merge(
        &mut self,
        keep: ClusterId,
        lose: ClusterId,
        avg: f64,
        total: f64,
        count: u64,
    ) -> Result<()> {
        if keep == lose {
            bail!("cannot merge cluster {keep} into itself");
        }
        let Some(loser) = self.clusters.remove(&lose) else {
            bail!("merge target {lose} is not a live cluster");
        };
        let Some(keeper) = self.clusters.get_mut(&keep) else {
            // leave the store intact before surfacing the violation
            self.clusters.insert(lose, loser);
            bail!("merge destination {keep} is not a live cluster");
        };
        keeper.absorb(loser, avg, total, count);
        debug!(
            "merged cluster {} into {} ({} elements, avg {:.4})",
            lose,
            keep,
            keeper.len(),
            avg
        );
        Ok(())
    }
}
