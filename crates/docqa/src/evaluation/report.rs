//! Aggregated evaluation results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

use super::evaluators::{EvaluationResult, Metric, CORRECTNESS_MAX_SCORE};

/// Percentage of passing results, `None` when there are none
pub fn pass_percentage(passing: &[bool]) -> Option<f64> {
    if passing.is_empty() {
        return None;
    }
    let passed = passing.iter().filter(|p| **p).count() as f64;
    Some(passed / passing.len() as f64 * 100.0)
}

/// Mean correctness score as a percentage of the maximum, `None` when there are none
pub fn correctness_percentage(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    Some(mean / CORRECTNESS_MAX_SCORE * 100.0)
}

/// One line of the correctness export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectnessRow {
    pub question: String,
    pub ground_truth: String,
    pub response: String,
    pub score: Option<f64>,
}

/// Per-metric results of an evaluation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    results: BTreeMap<Metric, Vec<EvaluationResult>>,
    /// Number of questions answered
    pub total_questions: usize,
    /// Evaluator calls that failed and were left out
    pub skipped: usize,
}

impl EvaluationReport {
    pub fn new(metrics: &[Metric], total_questions: usize) -> Self {
        Self {
            results: metrics.iter().map(|m| (*m, Vec::new())).collect(),
            total_questions,
            skipped: 0,
        }
    }

    pub(crate) fn push(&mut self, result: EvaluationResult) {
        self.results.entry(result.metric).or_default().push(result);
    }

    /// Metrics that were run, in a stable order
    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.results.keys().copied()
    }

    /// Results for one metric, in question order
    pub fn results(&self, metric: Metric) -> &[EvaluationResult] {
        self.results.get(&metric).map(Vec::as_slice).unwrap_or_default()
    }

    /// Percentage score for a metric
    ///
    /// Pass/fail metrics report the share of passing results. Correctness
    /// reports the mean 0-5 score scaled to 100.
    pub fn score(&self, metric: Metric) -> Option<f64> {
        let results = self.results(metric);
        match metric {
            Metric::Correctness => {
                let scores: Vec<f64> = results.iter().filter_map(|r| r.score).collect();
                correctness_percentage(&scores)
            }
            Metric::Relevancy | Metric::Faithfulness => {
                let passing: Vec<bool> = results.iter().map(|r| r.passing).collect();
                pass_percentage(&passing)
            }
        }
    }

    /// Question, reference, answer and raw score for each correctness result
    pub fn correctness_rows(&self) -> Vec<CorrectnessRow> {
        self.results(Metric::Correctness)
            .iter()
            .map(|r| CorrectnessRow {
                question: r.query.clone(),
                ground_truth: r.reference.clone().unwrap_or_default(),
                response: r.response.clone(),
                score: r.score,
            })
            .collect()
    }

    /// Write the correctness rows as CSV for manual review
    pub fn export_correctness_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let rows = self.correctness_rows();
        if rows.is_empty() {
            writer.write_record(["question", "ground_truth", "response", "score"])?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::info!("Exported correctness results to {}", path.display());
        Ok(())
    }
}
