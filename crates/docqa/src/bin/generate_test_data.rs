//! Draft an evaluation question set from documents
//!
//! Run with: cargo run -p docqa --bin docqa-generate-test-data -- --num_questions 2 --input_dir ./docs

use clap::Parser;
use std::path::PathBuf;

use docqa::{
    evaluation::QuestionGenerator, logging, providers::OllamaProvider, EvalDataset, RagConfig,
    Vectorizer,
};

#[derive(Parser, Debug)]
#[command(name = "docqa-generate-test-data")]
#[command(about = "Generate quiz questions from documents as an evaluation CSV")]
struct Args {
    /// Number of questions to generate per page
    #[arg(long = "num_questions")]
    num_questions: usize,

    /// Directory to load PDF/DOCX files from (recursively)
    #[arg(long = "input_dir")]
    input_dir: Option<PathBuf>,

    /// Individual files to load; takes precedence over --input_dir
    #[arg(long = "input_files", num_args = 1..)]
    input_files: Option<Vec<PathBuf>>,

    /// CSV file to write; prints to stdout when omitted
    #[arg(long = "output_path")]
    output_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let args = Args::parse();

    let config = RagConfig::load()?;
    let providers = OllamaProvider::from_config(&config)?;
    providers.warn_if_unavailable().await;

    let vectorizer = Vectorizer::new(&config, providers.embedder(), providers.llm());
    let documents = vectorizer
        .load_documents(args.input_dir.as_deref(), args.input_files.as_deref())
        .await?;

    let questions = QuestionGenerator::new(providers.llm())
        .generate(&documents, args.num_questions)
        .await?;
    let dataset = EvalDataset::new(questions, None)?;

    match &args.output_path {
        Some(path) => {
            dataset.to_csv(path)?;
            println!("Wrote {} questions to {}", dataset.len(), path.display());
        }
        None => dataset.write_csv(csv::Writer::from_writer(std::io::stdout()))?,
    }
    Ok(())
}
