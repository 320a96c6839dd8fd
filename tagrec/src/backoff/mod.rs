//! Backoff ensemble strategies
//!
//! A backoff strategy derives variant input sets from the original input,
//! computes direct recommendations for each variant on a bounded worker pool
//! and folds the partial lists into one ranked list.
//!
//! # Architecture
//! - Variants are produced lazily by a strategy-specific generator
//! - At most `parallelism` variants run at once via
//!   `futures::stream::buffer_unordered(parallelism)`; each runs on
//!   `spawn_blocking` because the recommender is CPU-bound
//! - A single reducer ([`MergeAccumulator`]) consumes completions and checks
//!   the stop condition after every one
//!
//! # Error Handling
//! Per-variant error isolation: a failed or panicking variant contributes an
//! empty list and never affects its siblings.

pub mod delete_low_frequency;
pub mod merge;
pub mod split_property_set;

pub use delete_low_frequency::{DeleteLowFrequency, StepSize};
pub use merge::{merge_lists, MergeAccumulator, MergePolicy};
pub use split_property_set::{SplitPropertySet, Splitter};

use crate::store::Recommender;
use crate::types::{Property, RecommendationList};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Ensemble recommendation strategy
#[async_trait]
pub trait BackoffStrategy: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Recommend for the original input set
    async fn recommend(&self, input: &[Property]) -> RecommendationList;
}

// ============================================================================
// Variants
// ============================================================================

/// What distinguishes a variant from the original input
#[derive(Debug, Clone, PartialEq)]
pub enum VariantOrigin {
    /// Properties removed relative to the original input
    Removed(Vec<Property>),
    /// Partition index produced by a splitter
    Partition(usize),
}

/// A derived input set
#[derive(Debug, Clone)]
pub struct Variant {
    /// Generation order (used for deterministic tie-breaking)
    pub index: usize,
    /// Input properties for this variant
    pub props: Vec<Property>,
    /// Weight for weighted merges (0.0-1.0)
    pub weight: f32,
    pub origin: VariantOrigin,
}

// ============================================================================
// Internal conditions
// ============================================================================

/// Stop predicate over the running merged result
pub trait InternalCondition: Send + Sync {
    fn is_satisfied(&self, merged: &RecommendationList) -> bool;
}

/// Satisfied once the merged result holds more than `count` items
#[derive(Debug, Clone, Copy)]
pub struct MoreThan {
    pub count: usize,
}

impl InternalCondition for MoreThan {
    fn is_satisfied(&self, merged: &RecommendationList) -> bool {
        merged.len() > self.count
    }
}

/// Never satisfied: every variant is consumed
#[derive(Debug, Clone, Copy)]
pub struct Never;

impl InternalCondition for Never {
    fn is_satisfied(&self, _merged: &RecommendationList) -> bool {
        false
    }
}

/// Stop once more than `count` merged items exist
pub fn more_than(count: usize) -> Box<dyn InternalCondition> {
    Box::new(MoreThan { count })
}

/// Consume all variants
pub fn never() -> Box<dyn InternalCondition> {
    Box::new(Never)
}

// ============================================================================
// Worker pool
// ============================================================================

/// Run variants on a bounded pool and reduce their results
///
/// Variants are pulled from `variants` only when a worker slot is free, so a
/// satisfied stop condition prevents any further variant from starting.
/// Variants still in flight at that point are dropped.
pub(crate) async fn run_ensemble<I>(
    strategy: &'static str,
    recommender: &Arc<dyn Recommender>,
    variants: I,
    parallelism: usize,
    accumulator: MergeAccumulator,
    stop: &dyn InternalCondition,
) -> RecommendationList
where
    I: Iterator<Item = Variant> + Send,
{
    let parallelism = parallelism.max(1);
    let mut accumulator = accumulator;

    let mut completions = stream::iter(variants)
        .map(|variant| {
            let recommender = Arc::clone(recommender);
            async move {
                let index = variant.index;
                let weight = variant.weight;
                let size = variant.props.len();

                debug!(strategy, variant = index, size, "Variant computation starting");
                let outcome =
                    tokio::task::spawn_blocking(move || recommender.recommend(&variant.props))
                        .await;

                let list = match outcome {
                    Ok(Ok(list)) => list,
                    Ok(Err(e)) => {
                        warn!(strategy, variant = index, error = %e, "Variant computation failed");
                        RecommendationList::new()
                    }
                    Err(e) => {
                        warn!(strategy, variant = index, error = %e, "Variant worker aborted");
                        RecommendationList::new()
                    }
                };
                (index, weight, list)
            }
        })
        .buffer_unordered(parallelism);

    while let Some((index, weight, list)) = completions.next().await {
        accumulator.absorb(index, weight, &list);
        let merged = accumulator.snapshot();

        debug!(
            strategy,
            variant = index,
            contributed = list.len(),
            merged = merged.len(),
            "Variant merged"
        );

        if stop.is_satisfied(&merged) {
            debug!(
                strategy,
                variants_merged = accumulator.lists_merged(),
                "Stop condition satisfied"
            );
            return merged;
        }
    }

    accumulator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecommendationItem;

    #[test]
    fn test_more_than_condition() {
        let cond = more_than(1);
        let one: RecommendationList = vec![RecommendationItem::new(Property::new(1, "a", 1), 0.5)]
            .into_iter()
            .collect();
        assert!(!cond.is_satisfied(&one));

        let two: RecommendationList = vec![
            RecommendationItem::new(Property::new(1, "a", 1), 0.5),
            RecommendationItem::new(Property::new(2, "b", 1), 0.5),
        ]
        .into_iter()
        .collect();
        assert!(cond.is_satisfied(&two));
    }

    #[test]
    fn test_never_condition() {
        assert!(!never().is_satisfied(&RecommendationList::new()));
    }
}
