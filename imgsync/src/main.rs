use anyhow::Result;
use clap::{Parser, Subcommand};
use libimgsync::Cloud;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod context;
mod format;
mod server;

/// imgsync - container image metadata aggregator
///
/// Builds a report of every vendor container image: tags, digests,
/// architectures and pull credentials.
#[derive(Parser, Debug)]
#[command(name = "imgsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose output (enables debug logging)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: $XDG_CONFIG_HOME/imgsync/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Cloud region: us-1, us-2, eu-1, us-gov-1, us-gov-2
    #[arg(long, global = true)]
    cloud: Option<Cloud>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve POST /sync-images
    Serve {
        /// Listen address (default: 0.0.0.0:8080)
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Run one sync and print the report
    Sync {
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
        /// Vendor API access token; the report is uploaded when set
        #[arg(long, env = "IMGSYNC_BEARER", hide_env_values = true)]
        bearer: Option<String>,
    },
    /// Display version information
    Version,
}

fn init_tracing(default_directives: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        commands::version::print_version();
        return Ok(());
    }

    // Build context with precedence: defaults > config file > env vars > CLI flags
    let listen = match &cli.command {
        Commands::Serve { listen } => listen.clone(),
        _ => None,
    };
    let ctx = context::AppContext::build(context::CliOverrides {
        config_path: cli.config,
        verbose: cli.verbose,
        cloud: cli.cloud,
        listen,
    })?;
    init_tracing(ctx.log_directives());

    match cli.command {
        Commands::Serve { .. } => commands::serve::handle_serve(&ctx).await,
        Commands::Sync { format, bearer } => {
            let fmt = format::OutputFormat::from(format.as_str());
            commands::sync::handle_sync(&ctx, bearer.as_deref(), fmt).await
        }
        Commands::Version => Ok(()),
    }
}
