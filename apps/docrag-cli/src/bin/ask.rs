use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use docrag_cli::delivery::{render, MediaResolver, SourceSubstringResolver};
use docrag_cli::{load_settings, logging};
use docrag_engine::{EngineContext, QueryEngine};

const TECHNICAL_DIFFICULTY: &str = "Sorry, a technical problem occurred while processing your request. Please try again later.";

/// Answer one question from the indexed documents.
#[derive(Parser)]
#[command(name = "docrag-ask", version)]
struct Args {
    /// The question; multiple words are joined with spaces.
    #[arg(required = true)]
    question: Vec<String>,

    /// Directory holding `config.toml`.
    #[arg(long, env = "DOCRAG_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Skip listing matching images from the input directory.
    #[arg(long)]
    no_media: bool,
}

async fn ask(args: Args) -> anyhow::Result<String> {
    let settings = load_settings(args.config_dir, None)?;
    let media_dir = settings.input_dir();
    let ctx = Arc::new(EngineContext::from_settings(settings).await?);
    let engine = QueryEngine::load(ctx)?;

    let answer = engine.generate_response(&args.question.join(" ")).await?;
    let mut out = render(&answer);
    if !args.no_media {
        let images = SourceSubstringResolver::new(media_dir).resolve(&answer.sources);
        for image in images {
            out.push_str(&format!("\nImage: {}", image.display()));
        }
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();
    match ask(args).await {
        Ok(out) => {
            println!("{}", out);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let detail = format!("{e:#}");
            error!(error = %detail, "query failed");
            println!("{}", TECHNICAL_DIFFICULTY);
            ExitCode::FAILURE
        }
    }
}
