use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use uuid::Uuid;

use brain::analysis::providers::{
  HttpReasoningProvider, HttpSearchProvider, OfflineReasoningProvider, OfflineSearchProvider,
  ReasoningProvider, WebSearchProvider,
};
use brain::embedding::{Embedder, HashingEmbedder, HttpEmbedder};
use brain::memory::MemoryStore;
use brain::types::{Outcome, RawInput, Resolution};
use brain::{BrainConfig, BrainCore};

#[derive(Parser)]
#[command(name = "brain")]
#[command(
  about = "SmartFix Brain - Problem Memory and Solution Ranking\nAnswers troubleshooting queries from learned memory before calling external analysis"
)]
#[command(version)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Resolve a troubleshooting query
  Ask {
    /// The query text (or transcript / OCR text, see the source flags)
    #[arg(required_unless_present = "log_file")]
    query: Vec<String>,
    /// Treat the query text as a speech transcript
    #[arg(long, conflicts_with_all = ["ocr", "log_file"])]
    transcript: bool,
    /// Treat the query text as image-derived (OCR) text
    #[arg(long, conflicts_with = "log_file")]
    ocr: bool,
    /// Read a parsed log summary from a file instead of the arguments
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Extra free-text hint (device name, model, symptoms)
    #[arg(long)]
    hint: Option<String>,
    /// Device category hint, folded into the query hints
    #[arg(short, long)]
    device: Option<String>,
  },
  /// Report whether a delivered solution worked
  Feedback {
    /// The query id printed with the solution
    query_id: Uuid,
    /// The solution fixed the problem
    #[arg(long, conflicts_with = "unsolved")]
    solved: bool,
    /// The solution did not fix the problem
    #[arg(long)]
    unsolved: bool,
    /// Optional satisfaction score, 1-5
    #[arg(short, long)]
    score: Option<u8>,
  },
  /// Show memory statistics
  Stats,
}

async fn handle(core: &BrainCore, command: Command) -> Result<()> {
  match command {
    Command::Ask { query, transcript, ocr, log_file, hint, device } => {
      let input = build_input(query, transcript, ocr, log_file)?;
      let hint = combine_hints(hint, device);
      let resolution = core.resolve(input, hint.as_deref()).await?;
      display_resolution(&resolution);
      Ok(())
    }
    Command::Feedback { query_id, solved, unsolved, score } => {
      if solved == unsolved {
        return Err(anyhow!("pass exactly one of --solved or --unsolved"));
      }
      core.feedback(query_id, solved, score).await;
      println!("{} feedback recorded", "ok:".green().bold());
      Ok(())
    }
    Command::Stats => {
      let stats = core.stats().await;
      println!("{}", "memory statistics".bold());
      println!("  problems:        {}", stats.total_problems);
      println!("  avg confidence:  {:.2}", stats.average_confidence);
      println!("  avg success:     {:.2}", stats.average_success_rate);
      println!("  total matches:   {}", stats.total_usage);
      Ok(())
    }
  }
}

fn build_input(
  query: Vec<String>,
  transcript: bool,
  ocr: bool,
  log_file: Option<PathBuf>,
) -> Result<RawInput> {
  if let Some(path) = log_file {
    let parsed_log_summary = std::fs::read_to_string(&path)
      .map_err(|e| anyhow!("cannot read {}: {e}", path.display()))?;
    return Ok(RawInput::Logs { parsed_log_summary });
  }

  let text = query.join(" ");
  if transcript {
    Ok(RawInput::Audio { transcript: text })
  } else if ocr {
    Ok(RawInput::Image { ocr_text: text })
  } else {
    Ok(RawInput::Text { text })
  }
}

fn combine_hints(hint: Option<String>, device: Option<String>) -> Option<String> {
  match (hint, device) {
    (Some(hint), Some(device)) => Some(format!("{hint} {device}")),
    (hint, None) => hint,
    (None, device) => device,
  }
}

fn display_resolution(resolution: &Resolution) {
  match &resolution.outcome {
    Outcome::Solved { solution } => {
      println!("{} {}", "issue:".blue().bold(), solution.issue);
      println!(
        "{} {:.0}%",
        "confidence:".blue().bold(),
        solution.confidence_score * 100.0
      );

      if !solution.possible_causes.is_empty() {
        println!("{}", "possible causes:".blue().bold());
        for cause in &solution.possible_causes {
          println!("  - {cause}");
        }
      }

      if !solution.recommended_steps.is_empty() {
        println!("{}", "recommended steps:".blue().bold());
        for step in &solution.recommended_steps {
          println!("  {}. {}", step.step_number, step.description);
        }
      }

      if !solution.external_sources.is_empty() {
        println!("{}", "see also:".blue().bold());
        for source in &solution.external_sources {
          println!("  {} - {}", source.title.yellow(), source.url);
        }
      }

      println!();
      println!(
        "query id {} (report back with: brain feedback {} --solved|--unsolved)",
        resolution.query_id.to_string().dimmed(),
        resolution.query_id
      );
    }
    Outcome::NoSolutionFound => {
      println!("{} no solution found for this query", "sorry:".yellow().bold());
      println!("try rephrasing, or add a device hint with --device");
    }
  }
}

fn data_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("BRAIN_DATA_DIR") {
    return PathBuf::from(dir);
  }
  dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("smartfix").join("brain")
}

fn build_embedder(config: &BrainConfig) -> Arc<dyn Embedder> {
  match std::env::var("BRAIN_EMBED_URL") {
    Ok(url) => {
      Arc::new(HttpEmbedder::new(url, config.embedding_dimension, config.embed_timeout))
    }
    Err(_) => Arc::new(HashingEmbedder::new(config.embedding_dimension)),
  }
}

fn build_reasoning() -> Arc<dyn ReasoningProvider> {
  match std::env::var("BRAIN_REASONING_URL") {
    Ok(url) => Arc::new(HttpReasoningProvider::new(url)),
    Err(_) => Arc::new(OfflineReasoningProvider),
  }
}

fn build_search() -> Arc<dyn WebSearchProvider> {
  match std::env::var("BRAIN_SEARCH_URL") {
    Ok(url) => Arc::new(HttpSearchProvider::new(url)),
    Err(_) => Arc::new(OfflineSearchProvider),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

  let cli = Cli::parse();

  let config = BrainConfig::from_env();
  let store = MemoryStore::open(&data_dir(), &config).await?;
  let core = BrainCore::new(
    config.clone(),
    store,
    build_embedder(&config),
    build_reasoning(),
    build_search(),
  )
  .await?;

  handle(&core, cli.command).await?;
  Ok(())
}
