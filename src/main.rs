// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! assetflow - front-end asset task runner
//!
//! Build HTML, styles, scripts and images from a declared task graph.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assetflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "assetflow=debug"
    } else {
        "assetflow=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let taskfile = cli.taskfile;

    // Dispatch to command handlers
    match cli.command {
        Commands::Init { name, force } => {
            assetflow::cli::init::run(taskfile, name, force, cli.verbose).await
        }
        Commands::Run {
            tasks,
            port,
            dry_run,
        } => assetflow::cli::run::run(taskfile, tasks, port, dry_run, cli.verbose).await,
        Commands::Watch { port } => assetflow::cli::watch::run(taskfile, port, cli.verbose).await,
        Commands::Validate => assetflow::cli::validate::run(taskfile, cli.verbose).await,
        Commands::Tasks => assetflow::cli::tasks::run(taskfile, cli.verbose).await,
        Commands::Graph { format } => {
            assetflow::cli::graph::run(taskfile, format, cli.verbose).await
        }
    }
}
