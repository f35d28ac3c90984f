use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use pm_preprocessor::config::AppConfig;
use pm_preprocessor::logging;
use pm_preprocessor::pipeline::Pipeline;
use pm_preprocessor::server;
use pm_preprocessor::storage;

#[derive(Parser)]
#[command(name = "pm_preprocessor")]
#[command(about = "Sanitizes property-management CSV exports before import")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the upload web service (default)
    Serve {
        /// Address to bind, overrides the config file
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on, overrides the config file
        #[arg(long)]
        port: Option<u16>,
    },
    /// Clean a local CSV export without starting the server
    Process {
        /// Export to clean
        input: PathBuf,
        /// Where to write the cleaned file (default: <sanitized input stem>_processed.csv
        /// alongside it, the same name the web service uses)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(storage::processed_file_name(&name))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = logging::init_logging(&config.logging).with_context(|| {
        format!("Failed to create log directory {}", config.logging.dir.display())
    })?;

    match cli.command.unwrap_or(Commands::Serve { host: None, port: None }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::start_server(&config).await?;
        }
        Commands::Process { input, output } => {
            let output = output.unwrap_or_else(|| default_output(&input));
            info!("🔧 Processing {}", input.display());

            match Pipeline::new().preprocess_file(&input, &output) {
                Ok(result) => {
                    println!("\n📊 Results for {}:", input.display());
                    println!("   Vendor: {}", result.vendor);
                    println!("   Plan: {}", result.plan);
                    println!("   Rows: {}", result.rows);
                    println!("   Validated columns: {}", result.report.applied.join(", "));
                    if !result.report.skipped.is_empty() {
                        println!("   Missing columns: {}", result.report.skipped.join(", "));
                    }
                    println!("   Output file: {}", output.display());
                }
                Err(e) => {
                    error!("Processing failed: {}", e);
                    return Err(e).with_context(|| format!("Failed to process {}", input.display()));
                }
            }
        }
    }

    Ok(())
}
