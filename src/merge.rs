//! Merging candidates from overlapping bounds and multiple passes.
//!
//! The same entity can come back more than once: adjacent bounds may share
//! their edge key, and a two-pass search reads most of the disc twice. The
//! merge set keeps one candidate per identity, the one with the smallest
//! distance observed. Distances are compared unrounded.

use crate::entity::Business;
use rustc_hash::FxHashMap;

/// A business with its exact distance from the search center.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub business: Business,
    pub distance_meters: f64,
}

impl Candidate {
    pub fn new(business: Business, distance_meters: f64) -> Self {
        Self {
            business,
            distance_meters,
        }
    }

    pub fn id(&self) -> &str {
        &self.business.id
    }
}

/// Identity-keyed set of best candidates for one query.
#[derive(Debug, Default)]
pub struct MergeSet {
    best: FxHashMap<String, Candidate>,
    offered: usize,
    superseded: usize,
}

impl MergeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate. Returns `true` if it is now the best for its
    /// identity. Ties keep the candidate already held.
    pub fn offer(&mut self, candidate: Candidate) -> bool {
        self.offered += 1;
        self.keep(candidate)
    }

    /// Fold another set into this one.
    pub fn merge(&mut self, other: MergeSet) {
        self.offered += other.offered;
        self.superseded += other.superseded;
        for candidate in other.best.into_values() {
            self.keep(candidate);
        }
    }

    fn keep(&mut self, candidate: Candidate) -> bool {
        match self.best.get_mut(candidate.id()) {
            Some(existing) => {
                if candidate.distance_meters < existing.distance_meters {
                    *existing = candidate;
                    self.superseded += 1;
                    true
                } else {
                    false
                }
            }
            None => {
                self.best.insert(candidate.business.id.clone(), candidate);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Candidate> {
        self.best.get(id)
    }

    pub fn len(&self) -> usize {
        self.best.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }

    /// Total candidates offered, duplicates included.
    pub fn offered(&self) -> usize {
        self.offered
    }

    /// How many times a held candidate was replaced by a closer one.
    pub fn superseded(&self) -> usize {
        self.superseded
    }

    /// Remaining candidates, in no particular order.
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.best.into_values().collect()
    }
}

impl Extend<Candidate> for MergeSet {
    fn extend<I: IntoIterator<Item = Candidate>>(&mut self, iter: I) {
        for candidate in iter {
            self.offer(candidate);
        }
    }
}

impl FromIterator<Candidate> for MergeSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = MergeSet::new();
        set.extend(iter);
        set
    }
}
