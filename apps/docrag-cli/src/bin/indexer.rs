use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use docrag_cli::{load_settings, logging};
use docrag_engine::{EngineContext, Ingestor};

/// Convert, chunk and embed every supported document in the input directory.
#[derive(Parser)]
#[command(name = "docrag-indexer", version)]
struct Args {
    /// Input directory (overrides `paths.input_dir`).
    data_dir: Option<PathBuf>,

    /// Directory holding `config.toml`.
    #[arg(long, env = "DOCRAG_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();
    let settings = load_settings(args.config_dir, args.data_dir)?;
    info!(input = %settings.input_dir().display(), storage = %settings.storage_dir().display(), "docrag indexer");

    let ctx = EngineContext::from_settings(settings).await?;
    let report = Ingestor::new(&ctx)?.run().await?;

    println!("Files seen:    {}", report.files_seen);
    println!("Files indexed: {}", report.files_indexed);
    println!("Chunks:        {}", report.chunks_written);
    if !report.files_failed.is_empty() {
        println!("Failed files:");
        for (source, reason) in &report.files_failed {
            println!("  {}: {}", source, reason);
        }
    }
    Ok(())
}
