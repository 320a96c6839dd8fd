//! Recommendation workflows
//!
//! A [`Workflow`] is an ordered decision list of rules. Each rule pairs a
//! [`Condition`] with a [`Procedure`]; the first rule whose condition holds
//! runs its procedure and its result is returned as-is.

pub mod conditions;
pub mod presets;
pub mod procedures;

pub use conditions::{
    above_threshold, always, below_threshold, too_few_recommendations,
    too_many_recommendations, too_unlikely_recommendations, Condition,
};
pub use presets::{make_preset_workflow, PresetDeps, PresetError, WorkflowPreset};
pub use procedures::{
    BackoffProcedure, DirectProcedure, LlmRerankProcedure, Procedure, ProcedureError,
    TopNProcedure,
};

use crate::instance::Instance;
use crate::types::RecommendationList;
use thiserror::Error;
use tracing::{debug, info};

/// Workflow evaluation errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No rules configured
    #[error("Workflow has no rules")]
    Empty,

    /// Every condition evaluated false
    #[error("No workflow rule matched the input")]
    NoRuleMatched,

    /// The selected procedure failed
    #[error("Rule {rule} failed: {source}")]
    Procedure {
        rule: usize,
        #[source]
        source: ProcedureError,
    },
}

/// A (condition, procedure) pair
pub struct Rule {
    condition: Box<dyn Condition>,
    procedure: Box<dyn Procedure>,
    description: String,
}

impl Rule {
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Ordered decision list of rules
#[derive(Default)]
pub struct Workflow {
    rules: Vec<Rule>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule; rules are evaluated in insertion order
    pub fn push(
        &mut self,
        condition: Box<dyn Condition>,
        procedure: Box<dyn Procedure>,
        description: impl Into<String>,
    ) {
        self.rules.push(Rule {
            condition,
            procedure,
            description: description.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule descriptions in evaluation order
    pub fn descriptions(&self) -> Vec<&str> {
        self.rules.iter().map(Rule::description).collect()
    }

    /// Run the first rule whose condition holds for `ctx`
    pub async fn recommend(&self, ctx: &Instance) -> Result<RecommendationList, WorkflowError> {
        if self.rules.is_empty() {
            return Err(WorkflowError::Empty);
        }

        for (index, rule) in self.rules.iter().enumerate() {
            let matched = rule.condition.evaluate(ctx);
            debug!(
                request_id = %ctx.request_id,
                rule = index,
                condition = %rule.condition.describe(),
                matched,
                "Evaluated rule condition"
            );
            if !matched {
                continue;
            }

            info!(
                request_id = %ctx.request_id,
                rule = index,
                description = %rule.description,
                "Workflow rule fired"
            );
            return rule
                .procedure
                .execute(ctx)
                .await
                .map_err(|source| WorkflowError::Procedure { rule: index, source });
        }

        Err(WorkflowError::NoRuleMatched)
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("rules", &self.descriptions())
            .finish()
    }
}
