//! Score the research agent against an evaluation CSV
//!
//! Run with: cargo run -p docqa --bin docqa-run-evaluator -- --path_to_csv_file eval.csv --use_correctness

use clap::Parser;
use std::path::PathBuf;

use docqa::{
    logging, providers::OllamaProvider, ChatSession, EvalDataset, RagConfig, ResearchAgent,
    ResponseEvaluator,
};

#[derive(Parser, Debug)]
#[command(name = "docqa-run-evaluator")]
#[command(about = "Evaluate the trained chatbot")]
struct Args {
    /// CSV with a `questions` column and an optional `ground_truth` column
    #[arg(long = "path_to_csv_file")]
    path_to_csv_file: PathBuf,

    /// Also score answers against the ground truth
    #[arg(long = "use_correctness")]
    use_correctness: bool,

    /// Where to write the correctness details as CSV
    #[arg(long = "export_results_path")]
    export_results_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let args = Args::parse();

    let config = RagConfig::load()?;
    let dataset = EvalDataset::from_csv(&args.path_to_csv_file)?;

    let providers = OllamaProvider::from_config(&config)?;
    providers.warn_if_unavailable().await;

    let agent = ResearchAgent::load_from_storage_with(
        &config,
        providers.embedder(),
        providers.llm(),
        None,
    )
    .await?;
    let session = ChatSession::new(agent.into());

    let evaluator = ResponseEvaluator::new(providers.llm(), args.use_correctness)
        .with_config(&config.evaluation);
    let report = evaluator.evaluate(&dataset, &session).await?;

    for metric in report.metrics() {
        match report.score(metric) {
            Some(score) => println!("Score for {}: {}%", metric, score),
            None => println!("Score for {}: n/a (no successful evaluations)", metric),
        }
    }

    if let Some(path) = &args.export_results_path {
        report.export_correctness_csv(path)?;
    }
    Ok(())
}
