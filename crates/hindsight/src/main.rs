use clap::{Parser, Subcommand};
use std::path::PathBuf;

use hindsight::commands::{
  self, index::IndexArgs, readiness::ReadinessArgs, recommend::RecommendArgs, triage::TriageArgs,
};
use hindsight::{logging, HindsightConfig, HindsightError};

#[derive(Parser)]
#[command(name = "hindsight")]
#[command(about = "Hindsight - lessons from past initiatives\n\
History indexing, similarity recommendations, and readiness labelling")]
#[command(version)]
struct Cli {
  /// Policy configuration file (defaults to .hindsight.yml when present)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Rebuild the History Store from closed initiative issues
  Index(IndexArgs),
  /// Recommend lessons for an initiative from similar past initiatives
  Recommend(RecommendArgs),
  /// Score an initiative's readiness and apply the readiness label
  Readiness(ReadinessArgs),
  /// Recommend lessons, then score and label readiness, for one issue
  Triage(TriageArgs),
}

async fn run(cli: Cli) -> anyhow::Result<()> {
  let config = HindsightConfig::load(cli.config.as_deref())?;

  match cli.command {
    Commands::Index(args) => commands::index::handle(&args, &config).await,
    Commands::Recommend(args) => commands::recommend::handle(&args, &config).await,
    Commands::Readiness(args) => commands::readiness::handle(&args, &config).await,
    Commands::Triage(args) => commands::triage::handle(&args, &config).await,
  }
}

#[tokio::main]
async fn main() {
  let cli = Cli::parse();
  logging::init(cli.verbose);

  if let Err(err) = run(cli).await {
    logging::fail(&format!("{err:#}"));
    let code = err.downcast_ref::<HindsightError>().map(HindsightError::exit_code).unwrap_or(1);
    std::process::exit(code);
  }
}
