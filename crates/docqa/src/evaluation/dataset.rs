//! Evaluation datasets and question generation

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::types::Document;

/// Column holding the questions
pub const QUESTIONS_COLUMN: &str = "questions";

/// Optional column holding reference answers
pub const GROUND_TRUTH_COLUMN: &str = "ground_truth";

/// Questions to ask, with optional reference answers
#[derive(Debug, Clone, PartialEq)]
pub struct EvalDataset {
    questions: Vec<String>,
    ground_truth: Option<Vec<String>>,
}

impl EvalDataset {
    /// Fails when reference answers are given but do not line up with the questions
    pub fn new(questions: Vec<String>, ground_truth: Option<Vec<String>>) -> Result<Self> {
        if let Some(gt) = &ground_truth {
            if gt.len() != questions.len() {
                return Err(Error::invalid_input(format!(
                    "{} questions but {} ground truth answers",
                    questions.len(),
                    gt.len()
                )));
            }
        }
        Ok(Self {
            questions,
            ground_truth,
        })
    }

    /// Read a CSV with a `questions` column and an optional `ground_truth` column
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();

        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let questions_idx = position(QUESTIONS_COLUMN).ok_or_else(|| {
            Error::invalid_input(format!(
                "{} has no '{}' column",
                path.display(),
                QUESTIONS_COLUMN
            ))
        })?;
        let ground_truth_idx = position(GROUND_TRUTH_COLUMN);

        let mut questions = Vec::new();
        let mut ground_truth = ground_truth_idx.map(|_| Vec::new());

        for record in reader.records() {
            let record = record?;
            questions.push(record.get(questions_idx).unwrap_or_default().to_string());
            if let (Some(idx), Some(answers)) = (ground_truth_idx, ground_truth.as_mut()) {
                answers.push(record.get(idx).unwrap_or_default().to_string());
            }
        }

        tracing::info!(
            "Loaded {} evaluation questions from {}{}",
            questions.len(),
            path.display(),
            if ground_truth.is_some() { " with ground truth" } else { "" }
        );

        Self::new(questions, ground_truth)
    }

    /// Write the dataset in the same layout `from_csv` reads
    pub fn to_csv(&self, path: &Path) -> Result<()> {
        let writer = csv::Writer::from_path(path)?;
        self.write_csv(writer)
    }

    pub fn write_csv<W: std::io::Write>(&self, mut writer: csv::Writer<W>) -> Result<()> {
        match &self.ground_truth {
            Some(answers) => {
                writer.write_record([QUESTIONS_COLUMN, GROUND_TRUTH_COLUMN])?;
                for (question, answer) in self.questions.iter().zip(answers) {
                    writer.write_record([question, answer])?;
                }
            }
            None => {
                writer.write_record([QUESTIONS_COLUMN])?;
                for question in &self.questions {
                    writer.write_record([question])?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn ground_truth(&self) -> Option<&[String]> {
        self.ground_truth.as_deref()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Drafts quiz questions from document pages
pub struct QuestionGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl QuestionGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    fn build_prompt(context: &str, num_questions: usize) -> String {
        format!(
            "Context information is below.\n\
             ---------------------\n\
             {}\n\
             ---------------------\n\
             Given the context information and not prior knowledge, \
             generate only questions based on the below query.\n\
             You are a Teacher/Professor. Your task is to setup {} questions \
             for an upcoming quiz/examination. The questions should be diverse \
             in nature across the document. Restrict the questions to the \
             context information provided.\n",
            context.trim(),
            num_questions
        )
    }

    /// Generate up to `num_questions` questions per page
    ///
    /// A page whose request fails is logged and skipped.
    pub async fn generate(&self, documents: &[Document], num_questions: usize) -> Result<Vec<String>> {
        if num_questions == 0 {
            return Err(Error::invalid_input("num_questions must be a positive integer"));
        }

        let mut questions = Vec::new();
        for doc in documents {
            for page in doc.pages.iter().filter(|p| !p.content.trim().is_empty()) {
                let prompt = Self::build_prompt(&page.content, num_questions);
                match self.llm.complete(&prompt).await {
                    Ok(reply) => {
                        questions.extend(parse_questions(&reply).into_iter().take(num_questions));
                    }
                    Err(e) => {
                        tracing::warn!(
                            filename = %doc.filename,
                            page = ?page.page_number,
                            "Question generation failed: {}",
                            e
                        );
                    }
                }
            }
        }

        tracing::info!("Generated {} questions from {} documents", questions.len(), documents.len());
        Ok(questions)
    }
}

/// One question per non-blank line, with list numbering removed
fn parse_questions(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches(['.', ')', '-', '*'])
                .trim()
                .to_string()
        })
        .filter(|q| !q.is_empty())
        .collect()
}
