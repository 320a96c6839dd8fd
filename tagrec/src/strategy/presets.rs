//! Named workflow presets
//!
//! | Selector | Rules |
//! |---|---|
//! | `direct` | always: direct |
//! | `best` | fewer than 1 recommendation: delete-low-frequency (linear); always: direct |
//! | `deletelowfrequency` | always: delete-low-frequency (proportional) |
//! | `splitproperty` | more than 2 inputs: split every second item (max merge); always: direct |
//! | `toofewrecommendations` | fewer than 10 recommendations: delete-low-frequency (proportional); always: direct |
//! | `a`, `model-a` | always: top 8 |
//! | `c`, `model-c` | always: LLM re-rank of the top 30 |

use super::conditions::{above_threshold, always, too_few_recommendations};
use super::procedures::{BackoffProcedure, DirectProcedure, LlmRerankProcedure, TopNProcedure};
use super::Workflow;
use crate::backoff::{
    more_than, never, DeleteLowFrequency, MergePolicy, SplitPropertySet, Splitter, StepSize,
};
use crate::llm::LlmReranker;
use crate::store::Recommender;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Worker pool size for delete-low-frequency presets
pub const BACKOFF_PARALLELISM: usize = 4;

/// Result size for "Model A"
pub const MODEL_A_TOP_N: usize = 8;

/// Preset construction errors
#[derive(Debug, Error, PartialEq)]
pub enum PresetError {
    #[error("Unknown workflow preset: {0}")]
    Unknown(String),

    #[error("Workflow preset '{0}' requires an LLM client")]
    LlmRequired(WorkflowPreset),
}

/// Named workflow configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPreset {
    Direct,
    Best,
    DeleteLowFrequency,
    SplitProperty,
    TooFewRecommendations,
    ModelA,
    ModelC,
}

impl WorkflowPreset {
    pub const ALL: [WorkflowPreset; 7] = [
        WorkflowPreset::Direct,
        WorkflowPreset::Best,
        WorkflowPreset::DeleteLowFrequency,
        WorkflowPreset::SplitProperty,
        WorkflowPreset::TooFewRecommendations,
        WorkflowPreset::ModelA,
        WorkflowPreset::ModelC,
    ];

    /// Canonical selector name
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowPreset::Direct => "direct",
            WorkflowPreset::Best => "best",
            WorkflowPreset::DeleteLowFrequency => "deletelowfrequency",
            WorkflowPreset::SplitProperty => "splitproperty",
            WorkflowPreset::TooFewRecommendations => "toofewrecommendations",
            WorkflowPreset::ModelA => "model-a",
            WorkflowPreset::ModelC => "model-c",
        }
    }

    /// Whether building this preset needs an LLM re-ranker
    pub fn requires_llm(&self) -> bool {
        matches!(self, WorkflowPreset::ModelC)
    }
}

impl fmt::Display for WorkflowPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkflowPreset {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(WorkflowPreset::Direct),
            "best" => Ok(WorkflowPreset::Best),
            "deletelowfrequency" => Ok(WorkflowPreset::DeleteLowFrequency),
            "splitproperty" => Ok(WorkflowPreset::SplitProperty),
            "toofewrecommendations" => Ok(WorkflowPreset::TooFewRecommendations),
            "a" | "model-a" => Ok(WorkflowPreset::ModelA),
            "c" | "model-c" => Ok(WorkflowPreset::ModelC),
            _ => Err(PresetError::Unknown(s.to_string())),
        }
    }
}

/// Shared dependencies injected into preset workflows
#[derive(Clone)]
pub struct PresetDeps {
    pub recommender: Arc<dyn Recommender>,
    pub reranker: Option<Arc<LlmReranker>>,
}

impl PresetDeps {
    pub fn new(recommender: Arc<dyn Recommender>) -> Self {
        Self {
            recommender,
            reranker: None,
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<LlmReranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }
}

/// Build the workflow for `preset`
pub fn make_preset_workflow(
    preset: WorkflowPreset,
    deps: &PresetDeps,
) -> Result<Workflow, PresetError> {
    let recommender = &deps.recommender;
    let mut workflow = Workflow::new();

    match preset {
        WorkflowPreset::Direct => {
            workflow.push(always(), Box::new(DirectProcedure), "direct");
        }
        WorkflowPreset::Best => {
            let backoff = DeleteLowFrequency::new(
                Arc::clone(recommender),
                BACKOFF_PARALLELISM,
                StepSize::Linear,
                more_than(4),
            );
            workflow.push(
                too_few_recommendations(1),
                Box::new(BackoffProcedure::new(backoff)),
                "no direct recommendations: delete-low-frequency (linear)",
            );
            workflow.push(always(), Box::new(DirectProcedure), "direct");
        }
        WorkflowPreset::DeleteLowFrequency => {
            let backoff = DeleteLowFrequency::new(
                Arc::clone(recommender),
                BACKOFF_PARALLELISM,
                StepSize::proportional(),
                more_than(10),
            );
            workflow.push(
                always(),
                Box::new(BackoffProcedure::new(backoff)),
                "delete-low-frequency (proportional)",
            );
        }
        WorkflowPreset::SplitProperty => {
            let backoff = SplitPropertySet::new(
                Arc::clone(recommender),
                BACKOFF_PARALLELISM,
                Splitter::EverySecondItem,
                MergePolicy::Max,
                never(),
            );
            workflow.push(
                above_threshold(2),
                Box::new(BackoffProcedure::new(backoff)),
                "more than 2 inputs: split every second item",
            );
            workflow.push(always(), Box::new(DirectProcedure), "direct");
        }
        WorkflowPreset::TooFewRecommendations => {
            let backoff = DeleteLowFrequency::new(
                Arc::clone(recommender),
                BACKOFF_PARALLELISM,
                StepSize::proportional(),
                more_than(10),
            );
            workflow.push(
                too_few_recommendations(10),
                Box::new(BackoffProcedure::new(backoff)),
                "fewer than 10 recommendations: delete-low-frequency (proportional)",
            );
            workflow.push(always(), Box::new(DirectProcedure), "direct");
        }
        WorkflowPreset::ModelA => {
            workflow.push(
                always(),
                Box::new(TopNProcedure::new(MODEL_A_TOP_N)),
                "top 8 direct",
            );
        }
        WorkflowPreset::ModelC => {
            let reranker = deps
                .reranker
                .as_ref()
                .ok_or(PresetError::LlmRequired(preset))?;
            workflow.push(
                always(),
                Box::new(LlmRerankProcedure::new(Arc::clone(reranker))),
                "LLM re-rank of top 30 direct",
            );
        }
    }

    info!(preset = %preset, rules = workflow.len(), "Workflow preset built");
    Ok(workflow)
}
