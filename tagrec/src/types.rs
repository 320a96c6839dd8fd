//! Core Types for tagrec
//!
//! - [`Property`]: vocabulary entry owned by a property store
//! - [`RecommendationItem`]: a property with its co-occurrence probability
//! - [`RecommendationList`]: ranked list of items, unique per property

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Opaque property identifier assigned by the property store
pub type PropertyId = u32;

/// Number of leading items used by the top-10 quality signal
pub const TOP_K_QUALITY: usize = 10;

// ============================================================================
// Property
// ============================================================================

/// A tag known to the property store
///
/// Immutable once created. Clones share the display string.
#[derive(Debug, Clone)]
pub struct Property {
    /// Store-assigned identifier
    pub id: PropertyId,
    /// Display string (the tag itself, e.g. "cuisine")
    pub tag: Arc<str>,
    /// Number of items in the corpus carrying this tag
    pub frequency: u64,
}

impl Property {
    pub fn new(id: PropertyId, tag: impl Into<Arc<str>>, frequency: u64) -> Self {
        Self {
            id,
            tag: tag.into(),
            frequency,
        }
    }

    /// Tag string
    pub fn as_str(&self) -> &str {
        &self.tag
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Property {}

impl std::hash::Hash for Property {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

// ============================================================================
// Recommendations
// ============================================================================

/// A recommended property with its relative likelihood of co-occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationItem {
    pub property: Property,
    /// Probability (0.0-1.0)
    pub probability: f32,
}

impl RecommendationItem {
    /// Create new item with clamped probability (0.0-1.0)
    pub fn new(property: Property, probability: f32) -> Self {
        Self {
            property,
            probability: probability.clamp(0.0, 1.0),
        }
    }
}

/// Ranked recommendation list
///
/// Invariant: a property appears at most once. Order is whatever the producer
/// emitted; call [`RecommendationList::sort_descending`] when a fixed order is
/// required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationList {
    items: Vec<RecommendationItem>,
}

impl RecommendationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list, keeping the first occurrence of each property
    pub fn from_items(items: impl IntoIterator<Item = RecommendationItem>) -> Self {
        let mut seen = HashSet::new();
        let items = items
            .into_iter()
            .filter(|item| seen.insert(item.property.id))
            .collect();
        Self { items }
    }

    /// Append an item unless its property is already present
    ///
    /// Returns `true` if the item was added.
    pub fn push(&mut self, item: RecommendationItem) -> bool {
        if self.contains(&item.property) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecommendationItem> {
        self.items.iter()
    }

    pub fn items(&self) -> &[RecommendationItem] {
        &self.items
    }

    pub fn contains(&self, property: &Property) -> bool {
        self.position_of(property).is_some()
    }

    /// Rank of a property within the list
    pub fn position_of(&self, property: &Property) -> Option<usize> {
        self.items.iter().position(|i| i.property.id == property.id)
    }

    /// Probability of a property, if listed
    pub fn probability_of(&self, property: &Property) -> Option<f32> {
        self.items
            .iter()
            .find(|i| i.property.id == property.id)
            .map(|i| i.probability)
    }

    /// Keep only the first `n` items
    pub fn truncate(&mut self, n: usize) {
        self.items.truncate(n);
    }

    /// Copy of the first `n` items
    pub fn top(&self, n: usize) -> Self {
        Self {
            items: self.items.iter().take(n).cloned().collect(),
        }
    }

    /// Stable sort by descending probability
    pub fn sort_descending(&mut self) {
        self.items
            .sort_by(|a, b| b.probability.total_cmp(&a.probability));
    }

    /// Drop every item whose property is in `excluded`
    pub fn without<'a>(self, excluded: impl IntoIterator<Item = &'a Property>) -> Self {
        let excluded: HashSet<PropertyId> = excluded.into_iter().map(|p| p.id).collect();
        Self {
            items: self
                .items
                .into_iter()
                .filter(|i| !excluded.contains(&i.property.id))
                .collect(),
        }
    }

    /// Mean probability of the first `k` items (0.0 for an empty list)
    pub fn top_k_avg_probability(&self, k: usize) -> f32 {
        let top: Vec<f32> = self.items.iter().take(k).map(|i| i.probability).collect();
        if top.is_empty() {
            return 0.0;
        }
        top.iter().sum::<f32>() / top.len() as f32
    }

    /// Mean probability of the top 10 items
    pub fn top10_avg_probability(&self) -> f32 {
        self.top_k_avg_probability(TOP_K_QUALITY)
    }

    /// Tag strings in list order
    pub fn tags(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|i| i.property.tag.to_string())
            .collect()
    }

    pub fn into_items(self) -> Vec<RecommendationItem> {
        self.items
    }
}

impl IntoIterator for RecommendationList {
    type Item = RecommendationItem;
    type IntoIter = std::vec::IntoIter<RecommendationItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecommendationList {
    type Item = &'a RecommendationItem;
    type IntoIter = std::slice::Iter<'a, RecommendationItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<RecommendationItem> for RecommendationList {
    fn from_iter<I: IntoIterator<Item = RecommendationItem>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

// ============================================================================
// Tests
// ============================================================================
