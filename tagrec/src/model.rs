//! Reference co-occurrence model
//!
//! Implements both [`Recommender`] and [`PropertyStore`] over a plain
//! transaction file: one item per line, tags separated by tabs or commas,
//! `#` starts a comment line.
//!
//! Probability of a candidate tag is the fraction of items carrying every input
//! tag that also carry the candidate. An empty input falls back to global tag
//! frequency.

use crate::store::{PropertyMap, PropertyStore, Recommender, RecommenderError};
use crate::types::{Property, PropertyId, RecommendationItem, RecommendationList};
use std::collections::{BTreeSet, HashMap};
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Model loading errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model file contains no items")]
    Empty,
}

/// Transaction-backed co-occurrence model
#[derive(Debug, Clone)]
pub struct CooccurrenceModel {
    properties: PropertyMap,
    /// Sorted tag ids per item
    transactions: Vec<Vec<PropertyId>>,
    /// Sorted item indices per tag id
    postings: Vec<Vec<u32>>,
}

impl CooccurrenceModel {
    /// Load a model from a transaction file
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);

        let mut rows = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            rows.push(split_tags(trimmed));
        }

        let model = Self::from_transactions(rows)?;
        info!(
            path = %path.display(),
            items = model.transactions.len(),
            properties = model.properties.count(),
            "Loaded co-occurrence model"
        );
        Ok(model)
    }

    /// Build a model from in-memory transactions
    pub fn from_transactions<I, T, S>(transactions: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Deduplicate tags per item, preserving first-seen order of tags overall
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut frequency: HashMap<String, u64> = HashMap::new();
        let mut first_seen: Vec<String> = Vec::new();

        for transaction in transactions {
            let mut row: Vec<String> = Vec::new();
            for tag in transaction {
                let tag = tag.as_ref().trim();
                if tag.is_empty() || row.iter().any(|t| t == tag) {
                    continue;
                }
                row.push(tag.to_string());
            }
            if row.is_empty() {
                continue;
            }
            for tag in &row {
                let count = frequency.entry(tag.clone()).or_insert(0);
                if *count == 0 {
                    first_seen.push(tag.clone());
                }
                *count += 1;
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(ModelError::Empty);
        }

        let mut properties = PropertyMap::new();
        for tag in &first_seen {
            properties.get_or_insert(tag, frequency.get(tag).copied().unwrap_or(0));
        }

        let mut postings: Vec<Vec<u32>> = vec![Vec::new(); properties.count()];
        let mut encoded = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let mut ids: Vec<PropertyId> = row
                .iter()
                .filter_map(|tag| properties.lookup(tag).map(|p| p.id))
                .collect();
            ids.sort_unstable();
            for id in &ids {
                postings[*id as usize].push(index as u32);
            }
            encoded.push(ids);
        }

        Ok(Self {
            properties,
            transactions: encoded,
            postings,
        })
    }

    /// Underlying property map
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Number of items in the model
    pub fn item_count(&self) -> usize {
        self.transactions.len()
    }

    /// Indices of items carrying every input property
    fn matching_items(&self, input: &[Property]) -> Vec<u32> {
        let mut lists: Vec<&Vec<u32>> = Vec::with_capacity(input.len());
        for property in input {
            match self.postings.get(property.id as usize) {
                Some(list) => lists.push(list),
                None => return Vec::new(),
            }
        }
        lists.sort_by_key(|l| l.len());

        let Some((first, rest)) = lists.split_first() else {
            return Vec::new();
        };
        first
            .iter()
            .copied()
            .filter(|item| rest.iter().all(|l| l.binary_search(item).is_ok()))
            .collect()
    }

    fn rank(&self, counts: HashMap<PropertyId, u64>, support: u64) -> RecommendationList {
        let mut scored: Vec<(PropertyId, u64)> = counts.into_iter().collect();
        // Descending count, ties by id for a deterministic order
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .filter_map(|(id, count)| {
                self.properties
                    .get(id)
                    .map(|p| RecommendationItem::new(p.clone(), count as f32 / support as f32))
            })
            .collect()
    }
}

impl Recommender for CooccurrenceModel {
    fn recommend(&self, input: &[Property]) -> Result<RecommendationList, RecommenderError> {
        if input.is_empty() {
            let counts = self
                .properties
                .properties()
                .iter()
                .map(|p| (p.id, p.frequency))
                .collect();
            return Ok(self.rank(counts, self.transactions.len() as u64));
        }

        let excluded: BTreeSet<PropertyId> = input.iter().map(|p| p.id).collect();
        let items = self.matching_items(input);
        debug!(
            input = input.len(),
            support = items.len(),
            "Computing co-occurrence recommendations"
        );
        if items.is_empty() {
            return Ok(RecommendationList::new());
        }

        let mut counts: HashMap<PropertyId, u64> = HashMap::new();
        for item in &items {
            for id in &self.transactions[*item as usize] {
                if !excluded.contains(id) {
                    *counts.entry(*id).or_insert(0) += 1;
                }
            }
        }

        Ok(self.rank(counts, items.len() as u64))
    }
}

impl PropertyStore for CooccurrenceModel {
    fn lookup(&self, tag: &str) -> Option<Property> {
        self.properties.lookup(tag)
    }

    fn count(&self) -> usize {
        self.properties.count()
    }
}

/// Split a transaction line on tabs, or on commas when no tab is present
fn split_tags(line: &str) -> Vec<String> {
    let separator = if line.contains('\t') { '\t' } else { ',' };
    line.split(separator)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
