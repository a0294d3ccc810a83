use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lake_indexer::{Dependencies, IndexingError, LogFormat, Settings};
use lake_indexer_ingest::orchestrator::select_targets;

#[derive(Parser)]
#[command(name = "lake-indexer")]
#[command(about = "Incremental security lake to vector search indexer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Restrict the run to one family, by index name or datasource key
    /// (overrides RUN_INDEX_NAME)
    #[arg(long, global = true)]
    family: Option<String>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Purge expired documents, then index the next window of every family
    Ingest,
    /// Delete the family indices, then ingest from scratch
    Rebuild,
    /// Delete the family indices
    DeleteIndices,
    /// List the telemetry indices with their sizes
    ListIndices,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn run(cli: Cli) -> Result<(), IndexingError> {
    let settings = Settings::from_env()?;
    let selector = cli.family.as_deref().or(settings.run_index.as_deref());
    let targets = select_targets(settings.targets(), selector);
    if targets.is_empty() {
        return Err(IndexingError::config("no family has both a source table and an index"));
    }

    let deps = Dependencies::new(&settings).await?;
    let orchestrator = deps.orchestrator;

    match cli.command.unwrap_or(Command::Ingest) {
        Command::Ingest => {
            orchestrator.run(&targets).await;
        }
        Command::Rebuild => {
            orchestrator.rebuild(&targets).await?;
        }
        Command::DeleteIndices => {
            orchestrator.delete_indices(&targets).await?;
        }
        Command::ListIndices => {
            let only = match targets.as_slice() {
                [single] if selector.is_some() => Some(single.index.as_str()),
                _ => None,
            };
            orchestrator.list_indices(only).await?;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing(LogFormat::from_env());

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => {
            info!("Lake indexer finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Lake indexer failed");
            ExitCode::FAILURE
        }
    }
}
