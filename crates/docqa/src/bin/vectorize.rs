//! Build and persist a vector index from PDF/DOCX documents
//!
//! Run with: cargo run -p docqa --bin docqa-vectorize -- --vector_path ./index --input_dir ./docs

use clap::Parser;
use std::path::PathBuf;

use docqa::{logging, providers::OllamaProvider, RagConfig, Vectorizer};

#[derive(Parser, Debug)]
#[command(name = "docqa-vectorize")]
#[command(about = "Split, embed and index documents for question answering")]
struct Args {
    /// Directory to load PDF/DOCX files from (recursively)
    #[arg(long = "input_dir")]
    input_dir: Option<PathBuf>,

    /// Individual files to load; takes precedence over --input_dir
    #[arg(long = "input_files", num_args = 1..)]
    input_files: Option<Vec<PathBuf>>,

    /// Directory the index is persisted to
    #[arg(long = "vector_path")]
    vector_path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let args = Args::parse();

    let config = RagConfig::load()?;
    let providers = OllamaProvider::from_config(&config)?;
    providers.warn_if_unavailable().await;

    tracing::info!("Embedding model: {}", config.embeddings.require_model()?);
    tracing::info!("LLM model: {}", config.llm.require_model()?);

    let vectorizer = Vectorizer::new(&config, providers.embedder(), providers.llm());

    let index = vectorizer
        .build_vector_index(
            args.input_dir.as_deref(),
            args.input_files.as_deref(),
            Some(args.vector_path.as_path()),
        )
        .await?;

    println!(
        "Indexed {} chunks into {}",
        index.len(),
        args.vector_path.display()
    );
    Ok(())
}
