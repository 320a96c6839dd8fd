//! Split-Property-Set backoff
//!
//! Partition the input into smaller independent subsets, recommend for each
//! subset and recombine the per-property scores.

use super::{
    run_ensemble, BackoffStrategy, InternalCondition, MergeAccumulator, MergePolicy, Variant,
    VariantOrigin,
};
use crate::store::Recommender;
use crate::types::{Property, RecommendationList};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Partitioning scheme for the input set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splitter {
    /// Alternate items: even positions form one subset, odd positions the other
    EverySecondItem,
}

impl Splitter {
    /// Split `input` into non-empty subsets
    pub fn split(&self, input: &[Property]) -> Vec<Vec<Property>> {
        match self {
            Splitter::EverySecondItem => {
                let (even, odd): (Vec<_>, Vec<_>) = input
                    .iter()
                    .cloned()
                    .enumerate()
                    .partition(|(i, _)| i % 2 == 0);
                [even, odd]
                    .into_iter()
                    .map(|part| part.into_iter().map(|(_, p)| p).collect::<Vec<_>>())
                    .filter(|part| !part.is_empty())
                    .collect()
            }
        }
    }
}

/// Split-Property-Set ensemble
pub struct SplitPropertySet {
    recommender: Arc<dyn Recommender>,
    parallelism: usize,
    splitter: Splitter,
    policy: MergePolicy,
    stop: Box<dyn InternalCondition>,
}

impl SplitPropertySet {
    pub fn new(
        recommender: Arc<dyn Recommender>,
        parallelism: usize,
        splitter: Splitter,
        policy: MergePolicy,
        stop: Box<dyn InternalCondition>,
    ) -> Self {
        Self {
            recommender,
            parallelism: parallelism.max(1),
            splitter,
            policy,
            stop,
        }
    }

    /// Variants (one per subset) for `input`
    pub fn variants(&self, input: &[Property]) -> Vec<Variant> {
        let total = input.len().max(1) as f32;
        self.splitter
            .split(input)
            .into_iter()
            .enumerate()
            .map(|(index, props)| Variant {
                index,
                weight: props.len() as f32 / total,
                props,
                origin: VariantOrigin::Partition(index),
            })
            .collect()
    }
}

#[async_trait]
impl BackoffStrategy for SplitPropertySet {
    fn name(&self) -> &'static str {
        "splitproperty"
    }

    async fn recommend(&self, input: &[Property]) -> RecommendationList {
        let variants = self.variants(input);
        info!(
            input = input.len(),
            subsets = variants.len(),
            parallelism = self.parallelism,
            policy = %self.policy,
            "Running split-property-set backoff"
        );

        let accumulator = MergeAccumulator::new(self.policy).excluding(input);
        run_ensemble(
            self.name(),
            &self.recommender,
            variants.into_iter(),
            self.parallelism,
            accumulator,
            self.stop.as_ref(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(n: usize) -> Vec<Property> {
        (0..n)
            .map(|i| Property::new(i as u32, format!("p{}", i), 1))
            .collect()
    }

    fn tags(part: &[Property]) -> Vec<&str> {
        part.iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn test_every_second_item_alternates() {
        let parts = Splitter::EverySecondItem.split(&props(5));
        assert_eq!(parts.len(), 2);
        assert_eq!(tags(&parts[0]), vec!["p0", "p2", "p4"]);
        assert_eq!(tags(&parts[1]), vec!["p1", "p3"]);
    }

    #[test]
    fn test_split_skips_empty_subsets() {
        assert_eq!(Splitter::EverySecondItem.split(&props(1)).len(), 1);
        assert!(Splitter::EverySecondItem.split(&props(0)).is_empty());
    }

    #[test]
    fn test_partitions_are_disjoint_and_cover_input() {
        let input = props(7);
        let parts = Splitter::EverySecondItem.split(&input);
        let mut all: Vec<u32> = parts.iter().flatten().map(|p| p.id).collect();
        all.sort_unstable();
        assert_eq!(all, (0..7).collect::<Vec<u32>>());
    }
}
