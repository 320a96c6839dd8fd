//! tagrec - Adaptive Tag Recommendation Workflows
//!
//! Given a partial set of tags describing an item, recommend the tags most
//! likely to complete it. A [`Workflow`] inspects the request and chooses a
//! procedure: direct lookup in the co-occurrence model, a backoff ensemble
//! over reduced or partitioned inputs, or LLM re-ranking of direct candidates.

pub mod backoff;
pub mod evaluation;
pub mod instance;
pub mod llm;
pub mod model;
pub mod output;
pub mod store;
pub mod strategy;
pub mod types;

pub use instance::Instance;
pub use model::CooccurrenceModel;
pub use store::{PropertyMap, PropertyStore, Recommender, RecommenderError};
pub use strategy::{make_preset_workflow, PresetDeps, Workflow, WorkflowError, WorkflowPreset};
pub use types::{Property, PropertyId, RecommendationItem, RecommendationList};
