// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Run command - execute tasks

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::time::Instant;

use crate::pipeline::{RunOptions, TaskRunner, DEFAULT_TASK};

/// Run the given tasks one after another
pub async fn run(
    taskfile_path: PathBuf,
    tasks: Vec<String>,
    port: Option<u16>,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let mut taskfile = super::load_taskfile(&taskfile_path)?;
    if let Some(port) = port {
        taskfile.server.port = port;
    }

    super::ensure_valid(&taskfile, verbose)?;

    let root = super::project_root(&taskfile_path)?;
    let runner = TaskRunner::new(&taskfile, root)?.options(RunOptions { dry_run, verbose });

    let tasks = if tasks.is_empty() {
        vec![DEFAULT_TASK.to_string()]
    } else {
        tasks
    };

    // Fail on unknown names before anything runs
    for task in &tasks {
        runner.graph().plan(task)?;
    }

    if !dry_run {
        println!("{} {}", "Running".bold(), tasks.join(", ").cyan());
        println!();
    }

    let start = Instant::now();
    let mut written = 0;
    for task in &tasks {
        let summary = runner.run(task).await?;
        written += summary.written();
    }

    if !dry_run {
        println!();
        println!(
            "{}",
            format!(
                "Finished in {:.2}s ({} file(s) written)",
                start.elapsed().as_secs_f64(),
                written
            )
            .green()
        );
    }

    Ok(())
}
