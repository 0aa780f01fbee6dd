//! Batch evaluation of a chat engine against a dataset

use futures_util::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::agent::ChatEngine;
use crate::config::EvaluationConfig;
use crate::error::{Error, Result};
use crate::providers::LlmProvider;

use super::dataset::EvalDataset;
use super::evaluators::{
    CorrectnessEvaluator, EvalSample, Evaluator, FaithfulnessEvaluator, Metric, RelevancyEvaluator,
};
use super::report::EvaluationReport;

/// Default number of concurrent evaluator calls
pub const DEFAULT_WORKERS: usize = 4;

/// Runs a set of metric evaluators over a chat engine's answers
pub struct ResponseEvaluator {
    evaluators: Vec<Arc<dyn Evaluator>>,
    workers: usize,
    show_progress: bool,
}

impl ResponseEvaluator {
    /// Relevancy and faithfulness, plus correctness when requested
    pub fn new(llm: Arc<dyn LlmProvider>, use_correctness: bool) -> Self {
        let mut evaluators: Vec<Arc<dyn Evaluator>> = vec![
            Arc::new(RelevancyEvaluator::new(llm.clone())),
            Arc::new(FaithfulnessEvaluator::new(llm.clone())),
        ];
        if use_correctness {
            evaluators.push(Arc::new(CorrectnessEvaluator::new(llm)));
        }
        Self::with_evaluators(evaluators)
    }

    pub fn with_evaluators(evaluators: Vec<Arc<dyn Evaluator>>) -> Self {
        Self {
            evaluators,
            workers: DEFAULT_WORKERS,
            show_progress: false,
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_config(self, config: &EvaluationConfig) -> Self {
        self.workers(config.workers).show_progress(config.show_progress)
    }

    pub fn metrics(&self) -> Vec<Metric> {
        self.evaluators.iter().map(|e| e.metric()).collect()
    }

    fn progress_bar(&self, len: usize, message: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(message);
        bar
    }

    /// Answer every question, then score the answers
    ///
    /// Answers are generated one at a time and the engine is reset after each
    /// question. Scoring runs with at most `workers` evaluator calls in flight;
    /// a failing call is logged and left out of the report.
    pub async fn evaluate(&self, dataset: &EvalDataset, engine: &dyn ChatEngine) -> Result<EvaluationReport> {
        let start = Instant::now();

        if dataset.ground_truth().is_none() {
            if let Some(metric) = self.metrics().into_iter().find(Metric::requires_reference) {
                return Err(Error::invalid_input(format!(
                    "{} evaluation requires a ground_truth column",
                    metric
                )));
            }
        }

        let samples = self.collect_responses(dataset, engine).await?;
        let report = self.score(samples).await;

        tracing::info!(
            "Evaluated {} questions on {} metrics in {:.1}s ({} evaluations skipped)",
            report.total_questions,
            self.evaluators.len(),
            start.elapsed().as_secs_f64(),
            report.skipped
        );

        Ok(report)
    }

    async fn collect_responses(&self, dataset: &EvalDataset, engine: &dyn ChatEngine) -> Result<Vec<Arc<EvalSample>>> {
        let progress = self.progress_bar(dataset.len(), "Generating responses");
        let mut samples = Vec::with_capacity(dataset.len());

        for (i, question) in dataset.questions().iter().enumerate() {
            let response = engine.chat(question).await;
            engine.reset();
            let response = response?;

            samples.push(Arc::new(EvalSample {
                query: question.clone(),
                contexts: response.contexts(),
                response: response.text,
                reference: dataset.ground_truth().map(|gt| gt[i].clone()),
            }));
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(samples)
    }

    async fn score(&self, samples: Vec<Arc<EvalSample>>) -> EvaluationReport {
        let mut report = EvaluationReport::new(&self.metrics(), samples.len());
        let total = samples.len() * self.evaluators.len();
        let progress = self.progress_bar(total, "Evaluating responses");
        let semaphore = Arc::new(Semaphore::new(self.workers));

        // Evaluator-major order so each metric's results come back in question order
        let jobs: Vec<(Arc<dyn Evaluator>, Arc<EvalSample>)> = self
            .evaluators
            .iter()
            .flat_map(|evaluator| samples.iter().map(move |sample| (evaluator.clone(), sample.clone())))
            .collect();

        let futures = jobs.into_iter().map(|(evaluator, sample)| {
            let semaphore = semaphore.clone();
            let progress = progress.clone();

            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| Error::internal(format!("Evaluation worker pool closed: {}", e)))?;
                let result = evaluator.evaluate(&sample).await;
                progress.inc(1);
                result.map_err(|e| {
                    tracing::warn!(
                        metric = %evaluator.metric(),
                        query = %sample.query,
                        "Evaluation failed, skipping: {}",
                        e
                    );
                    e
                })
            }
        });

        for result in join_all(futures).await {
            match result {
                Ok(result) => report.push(result),
                Err(_) => report.skipped += 1,
            }
        }
        progress.finish_and_clear();

        report
    }
}
