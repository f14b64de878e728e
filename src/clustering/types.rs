use serde::Serialize;

use crate::element::Element;

/// Identifier of a live cluster. Ids are assigned densely at initialization
/// and never reused; the id ordering drives all tie-breaking.
pub type ClusterId = u64;

/// An ordered pair of distinct cluster ids (`lo < hi`), the key of the
/// similarity index and the unit the max-similarity selector tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    lo: ClusterId,
    hi: ClusterId,
}

impl PairKey {
    /// Builds the canonical ordered key for two distinct cluster ids.
    ///
    /// # Panics
    /// Panics if `a == b`: a cluster has no similarity entry with itself and
    /// asking for one is a programming error.
    pub fn new(a: ClusterId, b: ClusterId) -> Self {
        assert_ne!(a, b, "a cluster cannot be paired with itself");
        if a < b {
            PairKey { lo: a, hi: b }
        } else {
            PairKey { lo: b, hi: a }
        }
    }

    pub fn lo(&self) -> ClusterId {
        self.lo
    }

    pub fn hi(&self) -> ClusterId {
        self.hi
    }

    /// True if either side of the pair is `id`.
    pub fn touches(&self, id: ClusterId) -> bool {
        self.lo == id || self.hi == id
    }
}

/// Aggregate similarity between two live clusters: the running average,
/// total, and the number of element pairs that actually had a score.
///
/// An entry exists only when `count > 0`; "no scored pairs" is represented by
/// the absence of an entry, never by a zeroed one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityEntry {
    pub avg: f64,
    pub total: f64,
    pub count: u64,
}

impl SimilarityEntry {
    pub fn new(total: f64, count: u64) -> Self {
        debug_assert!(count > 0, "similarity entry with zero comparisons");
        SimilarityEntry {
            avg: total / count as f64,
            total,
            count,
        }
    }

    /// Lance-Williams-style combination of the two partial entries left over
    /// from a merge. Reuses a lone side unchanged; sums totals and counts
    /// when both sides carry information.
    pub fn combine(kept: Option<SimilarityEntry>, gone: Option<SimilarityEntry>) -> Option<Self> {
        match (kept, gone) {
            (Some(a), Some(b)) => Some(SimilarityEntry::new(a.total + b.total, a.count + b.count)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

/// One step of a cluster's merge trail: the elements that were absorbed and
/// the average similarity that justified the merge (`None` for the founding
/// members, which were never scored against anything).
#[derive(Debug, Clone, Serialize)]
pub struct MergeStep {
    pub absorbed: Vec<Element>,
    pub avg: Option<f64>,
}

/// A mutable grouping of elements with running similarity statistics and
/// merge provenance.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub elements: Vec<Element>,
    /// `total / count`; `None` while the cluster has absorbed nothing.
    pub avg_sim: Option<f64>,
    pub total_sim: f64,
    pub num_compares: u64,
    pub history: Vec<MergeStep>,
}

impl Cluster {
    pub fn new(id: ClusterId, elements: Vec<Element>) -> Self {
        let founding = MergeStep {
            absorbed: elements.clone(),
            avg: None,
        };
        Cluster {
            id,
            elements,
            avg_sim: None,
            total_sim: 0.0,
            num_compares: 0,
            history: vec![founding],
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.elements.len() == 1
    }

    /// Absorbs another cluster: appends its elements, folds the consumed
    /// similarity entry into the running statistics, and records the step in
    /// the merge trail.
    pub fn absorb(&mut self, other: Cluster, avg: f64, total: f64, count: u64) {
        self.total_sim += total;
        self.num_compares += count;
        self.avg_sim = Some(self.total_sim / self.num_compares as f64);
        self.history.push(MergeStep {
            absorbed: other.elements.clone(),
            avg: Some(avg),
        });
        self.elements.extend(other.elements);
    }

    /// Members in sorted order, the order the report prints them in.
    pub fn sorted_elements(&self) -> Vec<&Element> {
        let mut members: Vec<&Element> = self.elements.iter().collect();
        members.sort();
        members
    }
}
