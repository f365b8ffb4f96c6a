// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Watch command - serve and rebuild on file changes

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::{RunOptions, TaskRunner};
use crate::watch::watch_and_serve;

/// Run the watch command
pub async fn run(taskfile_path: PathBuf, port: Option<u16>, verbose: bool) -> Result<()> {
    let mut taskfile = super::load_taskfile(&taskfile_path)?;
    if let Some(port) = port {
        taskfile.server.port = port;
    }

    super::ensure_valid(&taskfile, verbose)?;

    println!("{}", "Starting watch mode...".bold());
    println!(
        "Rebuilding on change (debounce: {}ms)",
        taskfile.watch.debounce_ms
    );
    println!();

    let root = super::project_root(&taskfile_path)?;
    let runner = TaskRunner::new(&taskfile, root)?.options(RunOptions {
        dry_run: false,
        verbose,
    });

    watch_and_serve(runner).await?;
    Ok(())
}
