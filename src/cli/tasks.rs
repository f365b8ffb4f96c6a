// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Tasks command - list registered tasks

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::{TaskGraph, TaskKind};

/// Run the tasks command
pub async fn run(taskfile_path: PathBuf, verbose: bool) -> Result<()> {
    let taskfile = super::load_taskfile(&taskfile_path)?;
    let graph = TaskGraph::build(&taskfile)?;

    println!("{} {}", "Tasks in".bold(), taskfile.name.cyan());
    println!();

    let width = taskfile
        .tasks
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(0);

    for task in &taskfile.tasks {
        let detail = match &task.kind {
            TaskKind::Pipeline { src, steps } => {
                let steps: Vec<&str> = steps.iter().map(|s| s.name()).collect();
                format!("{} → {}", src.patterns().join(", "), steps.join(" → "))
            }
            TaskKind::Clean { paths } => paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            TaskKind::Serve => format!(
                "http://{}:{}",
                taskfile.server.host, taskfile.server.port
            ),
            TaskKind::Series { .. } | TaskKind::Parallel { .. } => graph.plan(&task.name)?.to_string(),
        };

        println!(
            "  {}  {} {}",
            format!("{:width$}", task.name).bold(),
            format!("{:9}", task.kind_name()).dimmed(),
            task.description.as_deref().unwrap_or("")
        );
        if verbose || task.description.is_none() {
            println!("  {:width$}  {}", "", detail.dimmed(), width = width + 10);
        }
    }

    Ok(())
}
