//! cms-stack
//!
//! Composes one bucket, a set of handlers and an HTTP API into a deployable
//! template.
//!
//! # Architecture Overview
//!
//! ```text
//!   deploy.toml
//!       │
//!       ▼
//!  ┌──────────┐    ┌──────────────┐    ┌──────────────┐    ┌────────────┐
//!  │  config  │───▶│   routing    │───▶│    grants    │───▶│   stack    │
//!  │ load +   │    │ materializer │    │   resolver   │    │   plan     │
//!  │ validate │    │ + integration│    │              │    │            │
//!  └──────────┘    └──────────────┘    └──────────────┘    └─────┬──────┘
//!                                                                │ apply
//!                                                                ▼
//!                                                        ┌──────────────┐
//!                                                        │  provision   │
//!                                                        │  template    │──▶ template.json
//!                                                        └──────────────┘
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use cms_stack::config::{load_config, watcher::ConfigWatcher, DeploymentConfig};
use cms_stack::lifecycle::{signals::shutdown_on_ctrl_c, Shutdown};
use cms_stack::observability::logging;
use cms_stack::{compose, StackError};

#[derive(Parser)]
#[command(name = "cms-stack")]
#[command(about = "Compose storage, handlers and routes into a deployable template", long_about = None)]
struct Cli {
    /// Deployment file
    #[arg(short, long, default_value = "deploy.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the deployment file and its routes
    Validate,
    /// Print route bindings and resolved grants
    Plan,
    /// Write the deployment template
    Synth {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Re-synthesize whenever the deployment file changes
    Watch {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.observability.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    logging::init(&level);

    let config = loaded.map_err(StackError::from)?;
    tracing::info!(
        path = %cli.config.display(),
        stack = %config.stack,
        handlers = config.handlers.len(),
        routes = config.routes.len(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Validate => {
            compose(&config).map_err(StackError::from)?;
            println!("{}: ok", cli.config.display());
        }
        Commands::Plan => {
            let plan = compose(&config).map_err(StackError::from)?;
            print!("{plan}");
        }
        Commands::Synth { out } => {
            synth(&config, out.as_deref())?;
        }
        Commands::Watch { out } => {
            watch(&cli.config, config, out).await?;
        }
    }

    Ok(())
}

fn synth(config: &DeploymentConfig, out: Option<&Path>) -> Result<(), StackError> {
    let plan = compose(config)?;
    let template = plan.synthesize()?;
    let json = template.to_string_pretty()?;

    match out {
        Some(path) => {
            fs::write(path, json)?;
            tracing::info!(
                path = %path.display(),
                resources = template.resources.len(),
                "Template written"
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn watch(path: &Path, initial: DeploymentConfig, out: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = synth(&initial, out.as_deref()) {
        tracing::error!(error = %e, "Initial synthesis failed");
    }

    let (watcher, mut updates) = ConfigWatcher::new(path);
    let _watcher = watcher.run()?;

    let shutdown = Shutdown::new();
    let mut stop = shutdown.listener();
    tokio::spawn(shutdown_on_ctrl_c(shutdown));

    loop {
        tokio::select! {
            Some(config) = updates.recv() => {
                // A failed plan keeps the previous template on disk.
                if let Err(e) = synth(&config, out.as_deref()) {
                    tracing::error!(error = %e, "Re-planning failed");
                }
            }
            _ = stop.wait() => break,
        }
    }

    tracing::info!("Watch stopped");
    Ok(())
}
