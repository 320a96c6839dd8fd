//! Offline evaluation against ground truth
//!
//! Cases are JSON Lines records of the form
//! `{"input": ["amenity=restaurant", "La Thai"], "truth": ["cuisine", "phone"]}`.
//! Predictions and truth are compared as normalized tag sets and scored with
//! micro-averaged precision, recall and F1.

use crate::instance::Instance;
use crate::store::{PropertyStore, Recommender};
use crate::strategy::Workflow;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Tags dropped from predictions and truth by default
pub const DEFAULT_IGNORED_TAGS: [&str; 4] = ["name", "amenity", "osm_id", "osm_type"];

/// Evaluation errors
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid case on line {line}: {message}")]
    InvalidCase { line: usize, message: String },
}

/// One labelled example
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvaluationCase {
    pub input: Vec<String>,
    pub truth: Vec<String>,
}

/// Load cases from a JSON Lines file (blank lines are skipped)
pub fn load_cases(path: &Path) -> Result<Vec<EvaluationCase>, EvaluationError> {
    let content = std::fs::read_to_string(path)?;
    parse_cases(&content)
}

/// Parse JSON Lines content
pub fn parse_cases(content: &str) -> Result<Vec<EvaluationCase>, EvaluationError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| EvaluationError::InvalidCase {
                line: i + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Tag normalization shared by predictions and truth
#[derive(Debug, Clone)]
pub struct TagNormalizer {
    ignored: HashSet<String>,
}

impl Default for TagNormalizer {
    fn default() -> Self {
        Self::with_ignored(DEFAULT_IGNORED_TAGS)
    }
}

impl TagNormalizer {
    pub fn with_ignored<I, S>(ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored: ignored.into_iter().map(Into::into).collect(),
        }
    }

    /// Normalized form of `tag`, or `None` when it is ignored or blank
    pub fn normalize(&self, tag: &str) -> Option<String> {
        let tag = tag.trim();
        if tag.is_empty() || self.ignored.contains(tag) {
            return None;
        }
        let normalized = tag
            .replace("contact:phone", "phone")
            .replace("contact:website", "website");
        if self.ignored.contains(&normalized) {
            return None;
        }
        Some(normalized)
    }

    pub fn normalize_all<S: AsRef<str>>(&self, tags: &[S]) -> HashSet<String> {
        tags.iter()
            .filter_map(|t| self.normalize(t.as_ref()))
            .collect()
    }
}

/// Micro-averaged confusion counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scores {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl Scores {
    /// Accumulate one case
    pub fn add_case(&mut self, predicted: &HashSet<String>, truth: &HashSet<String>) {
        let hits = predicted.intersection(truth).count();
        self.true_positives += hits;
        self.false_positives += predicted.len() - hits;
        self.false_negatives += truth.len() - hits;
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Outcome of an evaluation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    /// Cases scored
    pub evaluated: usize,
    /// Cases skipped because nothing remained in their truth set
    pub skipped: usize,
    /// Cases whose workflow returned an error
    pub failed: usize,
    pub scores: Scores,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Cases: {} evaluated, {} skipped, {} failed",
            self.evaluated, self.skipped, self.failed
        )?;
        writeln!(f, "Precision: {:.3}", self.scores.precision())?;
        writeln!(f, "Recall:    {:.3}", self.scores.recall())?;
        write!(f, "F1 Score:  {:.3}", self.scores.f1())
    }
}

/// Evaluates a workflow over labelled cases
pub struct Evaluator<'a> {
    workflow: &'a Workflow,
    store: &'a dyn PropertyStore,
    recommender: Arc<dyn Recommender>,
    top: usize,
    normalizer: TagNormalizer,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        workflow: &'a Workflow,
        store: &'a dyn PropertyStore,
        recommender: Arc<dyn Recommender>,
        top: usize,
    ) -> Self {
        Self {
            workflow,
            store,
            recommender,
            top,
            normalizer: TagNormalizer::default(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: TagNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Score every case in order
    pub async fn run(&self, cases: &[EvaluationCase]) -> EvaluationReport {
        let mut report = EvaluationReport::default();

        for (index, case) in cases.iter().enumerate() {
            let inputs = self.normalizer.normalize_all(&case.input);
            let truth: HashSet<String> = self
                .normalizer
                .normalize_all(&case.truth)
                .difference(&inputs)
                .cloned()
                .collect();
            if truth.is_empty() {
                debug!(case = index, "Empty truth set, skipping case");
                report.skipped += 1;
                continue;
            }

            let ctx = Instance::from_tags(&case.input, self.store, Arc::clone(&self.recommender));
            let list = match self.workflow.recommend(&ctx).await {
                Ok(list) => list,
                Err(e) => {
                    warn!(case = index, error = %e, "Workflow failed for case");
                    report.failed += 1;
                    continue;
                }
            };

            let predicted = self.normalizer.normalize_all(&list.top(self.top).tags());
            debug!(
                case = index,
                predicted = predicted.len(),
                truth = truth.len(),
                "Case scored"
            );
            report.scores.add_case(&predicted, &truth);
            report.evaluated += 1;
        }

        info!(
            evaluated = report.evaluated,
            skipped = report.skipped,
            failed = report.failed,
            precision = report.scores.precision(),
            recall = report.scores.recall(),
            "Evaluation complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tags: &[&str]) -> HashSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_normalizer_maps_contact_keys() {
        let n = TagNormalizer::default();
        assert_eq!(n.normalize("contact:phone").as_deref(), Some("phone"));
        assert_eq!(n.normalize(" contact:website ").as_deref(), Some("website"));
        assert_eq!(n.normalize("cuisine").as_deref(), Some("cuisine"));
        assert_eq!(n.normalize("name"), None);
        assert_eq!(n.normalize("osm_id"), None);
        assert_eq!(n.normalize("  "), None);
    }

    #[test]
    fn test_micro_scores() {
        let mut scores = Scores::default();
        // tp 2, fp 1, fn 1
        scores.add_case(&set(&["a", "b", "c"]), &set(&["a", "b", "d"]));
        // tp 0, fp 1, fn 1
        scores.add_case(&set(&["x"]), &set(&["y"]));

        assert_eq!(scores.true_positives, 2);
        assert_eq!(scores.false_positives, 2);
        assert_eq!(scores.false_negatives, 2);
        assert!((scores.precision() - 0.5).abs() < 1e-9);
        assert!((scores.recall() - 0.5).abs() < 1e-9);
        assert!((scores.f1() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_division_scores_are_zero() {
        let scores = Scores::default();
        assert_eq!(scores.precision(), 0.0);
        assert_eq!(scores.recall(), 0.0);
        assert_eq!(scores.f1(), 0.0);
    }

    #[test]
    fn test_parse_cases_skips_blank_lines() {
        let content = "{\"input\": [\"a\"], \"truth\": [\"b\"]}\n\n{\"input\": [], \"truth\": []}\n";
        let cases = parse_cases(content).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].truth, vec!["b"]);
    }

    #[test]
    fn test_parse_cases_reports_line() {
        let err = parse_cases("{\"input\": [], \"truth\": []}\nnot json\n").unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidCase { line: 2, .. }));
    }
}
