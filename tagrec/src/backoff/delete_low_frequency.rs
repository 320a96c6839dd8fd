//! Delete-Low-Frequency backoff
//!
//! When the full input is too specific to match known patterns, progressively
//! relax it by dropping the rarest properties first. Each variant is strictly
//! smaller than the one before and never empty, so at most `n - 1` variants
//! exist for `n` input properties whatever the step size.

use super::{
    run_ensemble, BackoffStrategy, InternalCondition, MergeAccumulator, MergePolicy, Variant,
    VariantOrigin,
};
use crate::store::Recommender;
use crate::types::{Property, RecommendationList};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Default fraction removed per step by [`StepSize::proportional`]
pub const DEFAULT_PROPORTIONAL_FRACTION: f32 = 0.25;

/// Number of properties removed per step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepSize {
    /// One property per step
    Linear,
    /// `ceil(remaining * fraction)` properties per step
    Proportional { fraction: f32 },
}

impl StepSize {
    /// Proportional step with the default fraction
    pub fn proportional() -> Self {
        StepSize::Proportional {
            fraction: DEFAULT_PROPORTIONAL_FRACTION,
        }
    }

    /// Properties to remove given `remaining` properties (always at least 1)
    pub fn remove_count(&self, remaining: usize) -> usize {
        let count = match self {
            StepSize::Linear => 1,
            StepSize::Proportional { fraction } => {
                let fraction = if fraction.is_finite() {
                    fraction.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (remaining as f32 * fraction).ceil() as usize
            }
        };
        count.max(1)
    }
}

/// Lazy generator of progressively reduced input sets
#[derive(Debug, Clone)]
pub struct LowFrequencyVariants {
    /// Input sorted by ascending frequency (stable on input order)
    sorted: Vec<Property>,
    removed: usize,
    next_index: usize,
    step_size: StepSize,
}

impl LowFrequencyVariants {
    pub fn new(input: &[Property], step_size: StepSize) -> Self {
        let mut sorted = input.to_vec();
        sorted.sort_by_key(|p| p.frequency);
        Self {
            sorted,
            removed: 0,
            next_index: 0,
            step_size,
        }
    }
}

impl Iterator for LowFrequencyVariants {
    type Item = Variant;

    fn next(&mut self) -> Option<Variant> {
        let remaining = self.sorted.len() - self.removed;
        if remaining <= 1 {
            return None;
        }

        let count = self.step_size.remove_count(remaining).min(remaining - 1);
        let start = self.removed;
        self.removed += count;

        let variant = Variant {
            index: self.next_index,
            props: self.sorted[self.removed..].to_vec(),
            weight: (self.sorted.len() - self.removed) as f32 / self.sorted.len() as f32,
            origin: VariantOrigin::Removed(self.sorted[start..self.removed].to_vec()),
        };
        self.next_index += 1;
        Some(variant)
    }
}

/// Delete-Low-Frequency ensemble
pub struct DeleteLowFrequency {
    recommender: Arc<dyn Recommender>,
    parallelism: usize,
    step_size: StepSize,
    stop: Box<dyn InternalCondition>,
    policy: MergePolicy,
}

impl DeleteLowFrequency {
    /// Create strategy merging with [`MergePolicy::Max`]
    pub fn new(
        recommender: Arc<dyn Recommender>,
        parallelism: usize,
        step_size: StepSize,
        stop: Box<dyn InternalCondition>,
    ) -> Self {
        Self {
            recommender,
            parallelism: parallelism.max(1),
            step_size,
            stop,
            policy: MergePolicy::Max,
        }
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Variants this strategy would generate for `input`
    pub fn variants(&self, input: &[Property]) -> LowFrequencyVariants {
        LowFrequencyVariants::new(input, self.step_size)
    }
}

#[async_trait]
impl BackoffStrategy for DeleteLowFrequency {
    fn name(&self) -> &'static str {
        "deletelowfrequency"
    }

    async fn recommend(&self, input: &[Property]) -> RecommendationList {
        info!(
            input = input.len(),
            parallelism = self.parallelism,
            step_size = ?self.step_size,
            policy = %self.policy,
            "Running delete-low-frequency backoff"
        );

        let accumulator = MergeAccumulator::new(self.policy).excluding(input);
        run_ensemble(
            self.name(),
            &self.recommender,
            self.variants(input),
            self.parallelism,
            accumulator,
            self.stop.as_ref(),
        )
        .await
    }
}
