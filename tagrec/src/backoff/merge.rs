//! Merge policies for ensemble results
//!
//! Partial lists are folded into a [`MergeAccumulator`] one at a time by a
//! single reducer. Scores and tie-break keys are combined with commutative
//! operations, so the merged list does not depend on completion order.

use crate::types::{Property, PropertyId, RecommendationItem, RecommendationList};
use std::collections::{HashMap, HashSet};

/// How per-variant scores combine into one score per property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Highest probability seen for the property
    #[default]
    Max,
    /// Mean over all merged lists (absent counts as 0)
    Average,
    /// Weighted mean over all merged lists using the variant weights
    WeightedSum,
}

impl std::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergePolicy::Max => write!(f, "max"),
            MergePolicy::Average => write!(f, "average"),
            MergePolicy::WeightedSum => write!(f, "weighted-sum"),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    property: Property,
    max: f32,
    sum: f32,
    weighted: f32,
    /// (variant index, rank within that variant) of the earliest sighting
    discovery: (usize, usize),
}

/// Single-threaded reducer over partial recommendation lists
#[derive(Debug, Clone)]
pub struct MergeAccumulator {
    policy: MergePolicy,
    entries: HashMap<PropertyId, Entry>,
    excluded: HashSet<PropertyId>,
    lists: usize,
    total_weight: f32,
}

impl MergeAccumulator {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            excluded: HashSet::new(),
            lists: 0,
            total_weight: 0.0,
        }
    }

    /// Never emit these properties (typically the original input)
    pub fn excluding<'a>(mut self, properties: impl IntoIterator<Item = &'a Property>) -> Self {
        self.excluded.extend(properties.into_iter().map(|p| p.id));
        self
    }

    /// Fold one variant's list into the accumulator
    ///
    /// An empty list still counts towards `Average` and `WeightedSum`
    /// denominators.
    pub fn absorb(&mut self, variant_index: usize, weight: f32, list: &RecommendationList) {
        let weight = weight.max(0.0);
        self.lists += 1;
        self.total_weight += weight;

        for (rank, item) in list.iter().enumerate() {
            if self.excluded.contains(&item.property.id) {
                continue;
            }
            let key = (variant_index, rank);
            self.entries
                .entry(item.property.id)
                .and_modify(|e| {
                    e.max = e.max.max(item.probability);
                    e.sum += item.probability;
                    e.weighted += item.probability * weight;
                    if key < e.discovery {
                        e.discovery = key;
                    }
                })
                .or_insert_with(|| Entry {
                    property: item.property.clone(),
                    max: item.probability,
                    sum: item.probability,
                    weighted: item.probability * weight,
                    discovery: key,
                });
        }
    }

    /// Number of lists merged so far
    pub fn lists_merged(&self) -> usize {
        self.lists
    }

    /// Number of distinct properties merged so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn score(&self, entry: &Entry) -> f32 {
        match self.policy {
            MergePolicy::Max => entry.max,
            MergePolicy::Average => {
                if self.lists == 0 {
                    0.0
                } else {
                    entry.sum / self.lists as f32
                }
            }
            MergePolicy::WeightedSum => {
                if self.total_weight > 0.0 {
                    entry.weighted / self.total_weight
                } else {
                    0.0
                }
            }
        }
    }

    /// Current merged list: score descending, ties by discovery order
    pub fn snapshot(&self) -> RecommendationList {
        let mut scored: Vec<(&Entry, f32)> = self
            .entries
            .values()
            .map(|e| (e, self.score(e)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.0.discovery.cmp(&b.0.discovery))
        });

        scored
            .into_iter()
            .map(|(e, score)| RecommendationItem::new(e.property.clone(), score))
            .collect()
    }

    /// Final merged list
    pub fn finish(self) -> RecommendationList {
        self.snapshot()
    }
}

/// Merge complete lists with equal weights, in the given order
pub fn merge_lists(policy: MergePolicy, lists: &[RecommendationList]) -> RecommendationList {
    let mut acc = MergeAccumulator::new(policy);
    for (index, list) in lists.iter().enumerate() {
        acc.absorb(index, 1.0, list);
    }
    acc.finish()
}
