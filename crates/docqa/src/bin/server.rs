//! Chat server binary
//!
//! Run with: cargo run -p docqa --bin docqa-server

use clap::Parser;

use docqa::{logging, server::ChatServer, RagConfig};

#[derive(Parser, Debug)]
#[command(name = "docqa-server")]
#[command(about = "Serve the research agent over HTTP")]
struct Args {
    /// Address to bind (overrides configuration)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides configuration)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let args = Args::parse();

    let mut config = RagConfig::load()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Assistant: {}", config.model_name());
    tracing::info!("  - LLM model: {}", config.llm.model.as_deref().unwrap_or("<unset>"));
    tracing::info!(
        "  - Embedding model: {}",
        config.embeddings.model.as_deref().unwrap_or("<unset>")
    );

    let server = ChatServer::from_config(config).await?;

    println!("\nServer starting...");
    println!("  Health: http://{}/health", server.address());
    println!("  Chat:   POST http://{}/api/chat", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;
    Ok(())
}
