use std::collections::{BTreeSet, HashMap};

use crate::element::Element;

/// How to treat a scored pair whose two elements come from the same language.
///
/// The classifier scores such pairs, but same-language words cannot be
/// cognates of each other in the sense the pipeline cares about, so they are
/// either neutralized or dropped before clustering begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameLanguagePolicy {
    /// Keep the pair but force its score to 0.0.
    #[default]
    Zero,
    /// Leave the pair out of the table entirely.
    Exclude,
}

/// Undirected lookup from an unordered pair of elements to a similarity
/// score, produced by an external pairwise classifier.
///
/// Absence of an entry means the pair was never compared, which is distinct
/// from a score of zero: absent pairs contribute nothing to cluster
/// similarity averages. The table is read-only for the engine's lifetime.
#[derive(Debug, Clone, Default)]
pub struct PairScoreTable {
    scores: HashMap<Element, HashMap<Element, f64>>,
    len: usize,
}

impl PairScoreTable {
    pub fn new() -> Self {
        PairScoreTable::default()
    }

    /// Records a score for a pair. The source data does not store pairs in a
    /// canonical direction, so if either orientation is already present the
    /// first recorded score wins, matching lookup order.
    pub fn insert(&mut self, e1: Element, e2: Element, score: f64) {
        if self.lookup(&e1, &e2).is_some() {
            return;
        }
        self.scores.entry(e1).or_default().insert(e2, score);
        self.len += 1;
    }

    /// Looks up the score for an unordered pair, trying both orientations.
    pub fn lookup(&self, e1: &Element, e2: &Element) -> Option<f64> {
        if let Some(&score) = self.scores.get(e1).and_then(|inner| inner.get(e2)) {
            return Some(score);
        }
        self.scores.get(e2).and_then(|inner| inner.get(e1)).copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Scored pairs in storage orientation.
    pub fn iter(&self) -> impl Iterator<Item = (&Element, &Element, f64)> {
        self.scores
            .iter()
            .flat_map(|(e1, inner)| inner.iter().map(move |(e2, &score)| (e1, e2, score)))
    }

    /// Every element mentioned by at least one scored pair, in sorted order.
    /// This defines the comparable universe when clustering starts from
    /// singletons rather than a pre-grouped partition.
    pub fn elements(&self) -> Vec<Element> {
        let mut set = BTreeSet::new();
        for (e1, e2, _) in self.iter() {
            set.insert(e1.clone());
            set.insert(e2.clone());
        }
        set.into_iter().collect()
    }

    /// Combines a general-purpose classifier's scores with a domain-specific
    /// one's as `specific * weight + general * (1 - weight)`.
    ///
    /// The blended table is keyed on the specific table's pairs: where only
    /// the specific table has an entry its score is used alone, and pairs
    /// present only in the general table are dropped (they failed the
    /// domain-specific model and are not merge candidates).
    pub fn blend(general: &PairScoreTable, specific: &PairScoreTable, weight: f64) -> Self {
        let mut blended = PairScoreTable::new();
        for (e1, e2, specific_score) in specific.iter() {
            let score = match general.lookup(e1, e2) {
                Some(general_score) => {
                    specific_score * weight + general_score * (1.0 - weight)
                }
                None => specific_score,
            };
            blended.insert(e1.clone(), e2.clone(), score);
        }
        blended
    }
}
