// Scout AI coding agent
// Main entry point for the scout binary

use clap::Parser;
use scout_engine::cli::Cli;
use scout_engine::config::Config;
use scout_engine::handlers::{handle_run, OutputFormat};
use scout_engine::telemetry::init_telemetry_with_level;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments (usage errors exit here with clap's status)
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration (or use custom path if provided)
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(workspace) = &cli.workspace {
        config = config.with_workspace(workspace)?;
    }
    if let Some(max_iterations) = cli.max_iterations {
        config.agent.max_iterations = max_iterations;
    }

    // `--log` wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!("Scout v{}", env!("CARGO_PKG_VERSION"));
    scout_engine::secrets::load_dotenv();
    tracing::debug!("Workspace: {:?}", config.core.workspace);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    handle_run(cli.prompt_text(), &config, format, cli.verbose).await
}
