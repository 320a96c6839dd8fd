//! Per-request recommendation context
//!
//! An [`Instance`] holds the input properties of one request and memoizes the
//! direct recommendation computation so that any number of conditions and the
//! final procedure share a single recommender call.

use crate::store::{PropertyStore, Recommender};
use crate::types::{Property, RecommendationList};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Recommendation context for a single request
pub struct Instance {
    /// Request identifier for log correlation
    pub request_id: Uuid,
    props: Vec<Property>,
    recommender: Arc<dyn Recommender>,
    direct: OnceCell<RecommendationList>,
}

impl Instance {
    /// Create context from resolved properties (duplicates are collapsed)
    pub fn new(props: Vec<Property>, recommender: Arc<dyn Recommender>) -> Self {
        let mut seen = HashSet::new();
        let props = props.into_iter().filter(|p| seen.insert(p.id)).collect();
        Self {
            request_id: Uuid::new_v4(),
            props,
            recommender,
            direct: OnceCell::new(),
        }
    }

    /// Create context from raw tags, silently skipping tags unknown to the store
    pub fn from_tags<S: AsRef<str>>(
        tags: &[S],
        store: &dyn PropertyStore,
        recommender: Arc<dyn Recommender>,
    ) -> Self {
        let props = tags
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .filter_map(|tag| match store.lookup(tag) {
                Some(property) => Some(property),
                None => {
                    debug!(tag, "Input tag unknown to property store, skipping");
                    None
                }
            })
            .collect();
        Self::new(props, recommender)
    }

    /// Input properties
    pub fn props(&self) -> &[Property] {
        &self.props
    }

    /// Input tag strings
    pub fn tags(&self) -> Vec<String> {
        self.props.iter().map(|p| p.tag.to_string()).collect()
    }

    /// Shared recommender
    pub fn recommender(&self) -> &Arc<dyn Recommender> {
        &self.recommender
    }

    /// Direct recommendations for the full input set, computed at most once
    ///
    /// A recommender failure is logged and cached as an empty list.
    pub fn calc_recommendations(&self) -> &RecommendationList {
        self.direct.get_or_init(|| {
            debug!(
                request_id = %self.request_id,
                input = self.props.len(),
                "Computing direct recommendations"
            );
            match self.recommender.recommend(&self.props) {
                Ok(list) => list,
                Err(e) => {
                    warn!(
                        request_id = %self.request_id,
                        error = %e,
                        "Direct recommendation failed, treating as empty"
                    );
                    RecommendationList::new()
                }
            }
        })
    }

    /// Whether the direct computation already ran
    pub fn has_cached_recommendations(&self) -> bool {
        self.direct.get().is_some()
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("request_id", &self.request_id)
            .field("props", &self.tags())
            .field("cached", &self.has_cached_recommendations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{PropertyMap, RecommenderError};
    use crate::types::RecommendationItem;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRecommender {
        calls: AtomicUsize,
        result: RecommendationList,
    }

    impl Recommender for CountingRecommender {
        fn recommend(&self, _input: &[Property]) -> Result<RecommendationList, RecommenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    struct FailingRecommender;

    impl Recommender for FailingRecommender {
        fn recommend(&self, _input: &[Property]) -> Result<RecommendationList, RecommenderError> {
            Err(RecommenderError::Internal("boom".to_string()))
        }
    }

    #[test]
    fn test_from_tags_skips_unknown_and_duplicates() {
        let mut map = PropertyMap::new();
        map.get_or_insert("bus_stop", 3);
        map.get_or_insert("shelter", 2);

        let recommender = Arc::new(FailingRecommender);
        let instance = Instance::from_tags(
            &["bus_stop", "nonexistent", " shelter ", "bus_stop", ""],
            &map,
            recommender,
        );
        assert_eq!(instance.tags(), vec!["bus_stop", "shelter"]);
    }

    #[test]
    fn test_calc_recommendations_memoized() {
        let shelter = Property::new(1, "shelter", 2);
        let recommender = Arc::new(CountingRecommender {
            calls: AtomicUsize::new(0),
            result: vec![RecommendationItem::new(shelter, 0.9)].into_iter().collect(),
        });

        let instance = Instance::new(vec![Property::new(0, "bus_stop", 3)], recommender.clone());
        assert!(!instance.has_cached_recommendations());
        assert_eq!(instance.calc_recommendations().len(), 1);
        assert_eq!(instance.calc_recommendations().len(), 1);
        assert_eq!(recommender.calls.load(Ordering::SeqCst), 1);
        assert!(instance.has_cached_recommendations());
    }

    #[test]
    fn test_recommender_failure_cached_as_empty() {
        let instance = Instance::new(vec![], Arc::new(FailingRecommender));
        assert!(instance.calc_recommendations().is_empty());
    }
}
