//! LLM-judged response quality metrics

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::types::response::ChatMessage;

/// Correctness score at or above which a response passes
pub const CORRECTNESS_PASSING_THRESHOLD: f64 = 4.0;

/// Upper bound of the correctness scale
pub const CORRECTNESS_MAX_SCORE: f64 = 5.0;

/// Quality metric judged by an evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Retrieved context and answer address the question
    Relevancy,
    /// Answer is supported by the retrieved context
    Faithfulness,
    /// Answer agrees with a reference answer (0-5)
    Correctness,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Relevancy => "relevancy",
            Metric::Faithfulness => "faithfulness",
            Metric::Correctness => "correctness",
        }
    }

    /// Whether the metric needs a ground-truth answer
    pub fn requires_reference(&self) -> bool {
        matches!(self, Metric::Correctness)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One question/answer pair to be judged
#[derive(Debug, Clone)]
pub struct EvalSample {
    pub query: String,
    pub response: String,
    pub contexts: Vec<String>,
    pub reference: Option<String>,
}

/// Outcome of one evaluator on one sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub metric: Metric,
    pub query: String,
    pub response: String,
    pub contexts: Vec<String>,
    pub reference: Option<String>,
    pub passing: bool,
    pub score: Option<f64>,
    pub feedback: Option<String>,
}

impl EvaluationResult {
    fn new(metric: Metric, sample: &EvalSample, passing: bool, score: f64, feedback: String) -> Self {
        Self {
            metric,
            query: sample.query.clone(),
            response: sample.response.clone(),
            contexts: sample.contexts.clone(),
            reference: sample.reference.clone(),
            passing,
            score: Some(score),
            feedback: Some(feedback),
        }
    }
}

/// Judges a sample on a single metric
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn metric(&self) -> Metric;

    async fn evaluate(&self, sample: &EvalSample) -> Result<EvaluationResult>;
}

const RELEVANCY_TEMPLATE: &str = "Your task is to evaluate if the response for the query \
is in line with the context information provided.\n\
You have two options to answer. Either YES or NO.\n\
Answer YES if the response for the query is in line with the context information, otherwise NO.\n\
Query and Response:\n{query}\n\
Context:\n{context}\n\
Answer: ";

const FAITHFULNESS_TEMPLATE: &str = "Please tell if a given piece of information \
is supported by the context.\n\
You need to answer with either YES or NO.\n\
Answer YES if any of the context supports the information, even \
if most of the context is unrelated.\n\
Information:\n{query}\n\
Context:\n{context}\n\
Answer: ";

const CORRECTNESS_SYSTEM_PROMPT: &str = "You are an expert evaluation system for a question answering chatbot.\n\n\
You are given the following information:\n\
- a user query,\n\
- a reference answer, and\n\
- a generated answer.\n\n\
Your job is to judge the relevance and correctness of the generated answer.\n\
Output a single score that represents a holistic evaluation.\n\
You must return your response in a line with only the score.\n\
Do not return answers in any other format.\n\
On a separate line provide your reasoning for the score as well.\n\n\
The score must be between 1 and 5, where 1 is the worst and 5 is the best.\n\
If the generated answer is not relevant to the user query, give a score of 1.\n\
If the generated answer is relevant but contains mistakes, give a score between 2 and 3.\n\
If the generated answer is relevant and fully correct, give a score between 4 and 5.";

fn render(template: &str, query: &str, context: &str) -> String {
    template.replace("{query}", query).replace("{context}", context)
}

/// Interpret a YES/NO verdict
fn parse_verdict(reply: &str) -> bool {
    reply.to_lowercase().contains("yes")
}

/// Parse a correctness reply: score on the first line, reasoning after
fn parse_correctness(reply: &str) -> Result<(f64, String)> {
    let mut lines = reply.trim().lines();
    let first = lines.next().unwrap_or_default().trim();

    let score = first
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter_map(|s| s.parse::<f64>().ok())
        .next()
        .ok_or_else(|| Error::evaluation(format!("No correctness score in reply: {:?}", first)))?;

    let reasoning = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    Ok((score.clamp(0.0, CORRECTNESS_MAX_SCORE), reasoning))
}

/// Did the answer and its context address the question
pub struct RelevancyEvaluator {
    llm: Arc<dyn LlmProvider>,
}

impl RelevancyEvaluator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Evaluator for RelevancyEvaluator {
    fn metric(&self) -> Metric {
        Metric::Relevancy
    }

    async fn evaluate(&self, sample: &EvalSample) -> Result<EvaluationResult> {
        let query = format!("Query: {}\nResponse: {}", sample.query, sample.response);
        let prompt = render(RELEVANCY_TEMPLATE, &query, &sample.contexts.join("\n\n"));

        let reply = self.llm.complete(&prompt).await?;
        let passing = parse_verdict(&reply);
        let score = if passing { 1.0 } else { 0.0 };

        Ok(EvaluationResult::new(self.metric(), sample, passing, score, reply))
    }
}

/// Is the answer supported by the retrieved context
pub struct FaithfulnessEvaluator {
    llm: Arc<dyn LlmProvider>,
}

impl FaithfulnessEvaluator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Evaluator for FaithfulnessEvaluator {
    fn metric(&self) -> Metric {
        Metric::Faithfulness
    }

    async fn evaluate(&self, sample: &EvalSample) -> Result<EvaluationResult> {
        let prompt = render(FAITHFULNESS_TEMPLATE, &sample.response, &sample.contexts.join("\n\n"));

        let reply = self.llm.complete(&prompt).await?;
        let passing = parse_verdict(&reply);
        let score = if passing { 1.0 } else { 0.0 };

        Ok(EvaluationResult::new(self.metric(), sample, passing, score, reply))
    }
}

/// How close the answer is to a reference answer, scored 0-5
pub struct CorrectnessEvaluator {
    llm: Arc<dyn LlmProvider>,
}

impl CorrectnessEvaluator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Evaluator for CorrectnessEvaluator {
    fn metric(&self) -> Metric {
        Metric::Correctness
    }

    async fn evaluate(&self, sample: &EvalSample) -> Result<EvaluationResult> {
        let reference = sample
            .reference
            .as_deref()
            .ok_or_else(|| Error::invalid_input("Correctness needs a reference answer"))?;

        let messages = [
            ChatMessage::system(CORRECTNESS_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "## User Query\n{}\n\n## Reference Answer\n{}\n\n## Generated Answer\n{}",
                sample.query, reference, sample.response
            )),
        ];

        let reply = self.llm.chat(&messages).await?;
        let (score, reasoning) = parse_correctness(&reply)?;

        Ok(EvaluationResult::new(
            self.metric(),
            sample,
            score >= CORRECTNESS_PASSING_THRESHOLD,
            score,
            reasoning,
        ))
    }
}
