//! Batch quality evaluation of chat answers

pub mod dataset;
pub mod evaluators;
pub mod report;
pub mod runner;

pub use dataset::{EvalDataset, QuestionGenerator};
pub use evaluators::{
    CorrectnessEvaluator, EvalSample, EvaluationResult, Evaluator, FaithfulnessEvaluator, Metric,
    RelevancyEvaluator,
};
pub use report::{correctness_percentage, pass_percentage, CorrectnessRow, EvaluationReport};
pub use runner::ResponseEvaluator;
