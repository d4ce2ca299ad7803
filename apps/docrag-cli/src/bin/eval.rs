use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use docrag_cli::{load_settings, logging};
use docrag_core::request::EvalCase;
use docrag_engine::judge::{summarize, Judge, Verdict};
use docrag_engine::prompt::build_context;
use docrag_engine::{EngineContext, QueryEngine};

/// Run a JSONL question dataset through the engine and record the answers.
#[derive(Parser)]
#[command(name = "docrag-eval", version)]
struct Args {
    /// JSONL dataset; each row is a question string or an object with `input`/`question` and optional `output`.
    dataset: PathBuf,

    /// Where to write one JSON result per answered row.
    #[arg(long, default_value = "eval_results.jsonl")]
    output: PathBuf,

    /// Also score relevance and faithfulness with the language model.
    #[arg(long)]
    judge: bool,

    /// Directory holding `config.toml`.
    #[arg(long, env = "DOCRAG_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct EvalRecord {
    question: String,
    prediction: String,
    ground_truth: Option<String>,
    sources: Vec<String>,
    latency_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    relevance: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    faithfulness: Option<Verdict>,
}

fn read_rows(path: &PathBuf) -> anyhow::Result<Vec<(usize, String)>> {
    let file = File::open(path).with_context(|| format!("opening dataset {}", path.display()))?;
    let mut rows = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if !line.trim().is_empty() {
            rows.push((i + 1, line));
        }
    }
    Ok(rows)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();
    let settings = load_settings(args.config_dir, None)?;
    let ctx = Arc::new(EngineContext::from_settings(settings).await?);
    let engine = QueryEngine::load(ctx.clone())?;
    let judge = args.judge.then(|| Judge::new(ctx.llm.clone()));

    let rows = read_rows(&args.dataset)?;
    info!(rows = rows.len(), dataset = %args.dataset.display(), judge = args.judge, "evaluation started");
    let mut out = BufWriter::new(File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?);

    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let (mut answered, mut skipped, mut failed) = (0usize, 0usize, 0usize);
    let (mut relevance, mut faithfulness) = (Vec::new(), Vec::new());
    let mut total_latency = 0.0;

    for (line_no, line) in rows {
        pb.inc(1);
        let case = match serde_json::from_str::<serde_json::Value>(&line).map_err(anyhow::Error::from).and_then(|v| Ok(EvalCase::from_value(&v)?)) {
            Ok(case) => case,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping dataset row");
                skipped += 1;
                continue;
            }
        };

        let started = Instant::now();
        let (answer, context) = match engine.respond_detailed(&case.request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(line = line_no, error = %e, "query failed");
                failed += 1;
                continue;
            }
        };
        let latency = started.elapsed().as_secs_f64();
        total_latency += latency;
        answered += 1;

        let question = case.request.question().to_string();
        let (rel, faith) = match &judge {
            Some(j) => {
                let reference = build_context(&context);
                (Some(j.relevance(&question, &answer.text).await), Some(j.faithfulness(&question, &reference, &answer.text).await))
            }
            None => (None, None),
        };
        relevance.extend(rel.clone());
        faithfulness.extend(faith.clone());

        let record = EvalRecord {
            question,
            prediction: answer.text,
            ground_truth: case.ground_truth,
            sources: answer.sources,
            latency_seconds: (latency * 100.0).round() / 100.0,
            relevance: rel,
            faithfulness: faith,
        };
        serde_json::to_writer(&mut out, &record)?;
        out.write_all(b"\n")?;
    }
    pb.finish_with_message("done");
    out.flush()?;

    println!("Answered: {}  Failed: {}  Skipped rows: {}", answered, failed, skipped);
    if answered > 0 {
        println!("Mean latency: {:.2}s", total_latency / answered as f64);
    }
    if args.judge {
        for (name, verdicts) in [("Answer relevance", &relevance), ("Faithfulness", &faithfulness)] {
            match summarize(verdicts.iter()) {
                (Some(mean), unscored) => println!("{}: {:.2} ({} not scored)", name, mean, unscored),
                (None, unscored) => println!("{}: n/a ({} not scored)", name, unscored),
            }
        }
    }
    println!("Results written to {}", args.output.display());
    Ok(())
}
