//! External collaborator interfaces
//!
//! The statistical model and the tag vocabulary are long-lived and read-only
//! after load. Both traits require `Send + Sync` so a single instance can be
//! shared across requests and backoff workers without locking.

use crate::types::{Property, PropertyId, RecommendationList};
use std::collections::HashMap;
use thiserror::Error;

/// Tag vocabulary lookup
pub trait PropertyStore: Send + Sync {
    /// Look up a tag; absence is not an error
    fn lookup(&self, tag: &str) -> Option<Property>;

    /// Number of known properties
    fn count(&self) -> usize;
}

/// Statistical co-occurrence recommender
pub trait Recommender: Send + Sync {
    /// Rank the properties likely to co-occur with `input`
    ///
    /// The returned list must not contain duplicate properties.
    fn recommend(&self, input: &[Property]) -> Result<RecommendationList, RecommenderError>;
}

/// Recommender failure
#[derive(Debug, Clone, Error)]
pub enum RecommenderError {
    /// Model has no data for the request
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    /// Internal computation error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// In-memory property store keyed by tag
///
/// Identifiers are assigned densely in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    by_tag: HashMap<String, Property>,
    by_id: Vec<Property>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the property for `tag`, creating it with `frequency` if new
    pub fn get_or_insert(&mut self, tag: &str, frequency: u64) -> Property {
        if let Some(existing) = self.by_tag.get(tag) {
            return existing.clone();
        }
        let property = Property::new(self.by_id.len() as PropertyId, tag, frequency);
        self.by_tag.insert(tag.to_string(), property.clone());
        self.by_id.push(property.clone());
        property
    }

    /// Property by identifier
    pub fn get(&self, id: PropertyId) -> Option<&Property> {
        self.by_id.get(id as usize)
    }

    /// All properties in identifier order
    pub fn properties(&self) -> &[Property] {
        &self.by_id
    }
}

impl PropertyStore for PropertyMap {
    fn lookup(&self, tag: &str) -> Option<Property> {
        self.by_tag.get(tag).cloned()
    }

    fn count(&self) -> usize {
        self.by_id.len()
    }
}
