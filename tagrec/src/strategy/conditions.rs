//! Workflow conditions
//!
//! Size-based conditions only look at the input. Quality-based conditions read
//! the context's memoized direct recommendations, so the recommender runs at
//! most once per request however many of them are evaluated.

use crate::instance::Instance;
use crate::types::TOP_K_QUALITY;

/// Predicate gating a workflow rule
pub trait Condition: Send + Sync {
    fn evaluate(&self, ctx: &Instance) -> bool;

    /// Human-readable form for logs
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy)]
struct Always;

impl Condition for Always {
    fn evaluate(&self, _ctx: &Instance) -> bool {
        true
    }

    fn describe(&self) -> String {
        "always".to_string()
    }
}

#[derive(Debug, Clone, Copy)]
struct InputSizeBelow(usize);

impl Condition for InputSizeBelow {
    fn evaluate(&self, ctx: &Instance) -> bool {
        ctx.props().len() < self.0
    }

    fn describe(&self) -> String {
        format!("input size < {}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct InputSizeAbove(usize);

impl Condition for InputSizeAbove {
    fn evaluate(&self, ctx: &Instance) -> bool {
        ctx.props().len() > self.0
    }

    fn describe(&self) -> String {
        format!("input size > {}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct TooFew(usize);

impl Condition for TooFew {
    fn evaluate(&self, ctx: &Instance) -> bool {
        ctx.calc_recommendations().len() < self.0
    }

    fn describe(&self) -> String {
        format!("fewer than {} recommendations", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct TooMany(usize);

impl Condition for TooMany {
    fn evaluate(&self, ctx: &Instance) -> bool {
        ctx.calc_recommendations().len() > self.0
    }

    fn describe(&self) -> String {
        format!("more than {} recommendations", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct TooUnlikely(f32);

impl Condition for TooUnlikely {
    fn evaluate(&self, ctx: &Instance) -> bool {
        ctx.calc_recommendations().top10_avg_probability() < self.0
    }

    fn describe(&self) -> String {
        format!("top-{} mean probability < {}", TOP_K_QUALITY, self.0)
    }
}

/// Always true; use as the terminal fallback rule
pub fn always() -> Box<dyn Condition> {
    Box::new(Always)
}

/// True when the input has fewer than `n` properties
pub fn below_threshold(n: usize) -> Box<dyn Condition> {
    Box::new(InputSizeBelow(n))
}

/// True when the input has more than `n` properties
pub fn above_threshold(n: usize) -> Box<dyn Condition> {
    Box::new(InputSizeAbove(n))
}

/// True when direct recommendations yield fewer than `n` items
pub fn too_few_recommendations(n: usize) -> Box<dyn Condition> {
    Box::new(TooFew(n))
}

/// True when direct recommendations yield more than `n` items
pub fn too_many_recommendations(n: usize) -> Box<dyn Condition> {
    Box::new(TooMany(n))
}

/// True when the mean probability of the top 10 direct recommendations is
/// below `threshold` (clamped to 0.0-1.0)
pub fn too_unlikely_recommendations(threshold: f32) -> Box<dyn Condition> {
    Box::new(TooUnlikely(threshold.clamp(0.0, 1.0)))
}
