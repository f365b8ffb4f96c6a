// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Validate command - check taskfile configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::bundler::{Bundler, CommandBundler};
use crate::pipeline::{StepConfig, TaskKind, Taskfile, TaskfileValidator};
use crate::utils::{print_heading, print_status, Status};

/// Run the validate command
pub async fn run(taskfile_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating taskfile...".bold());
    println!();

    let taskfile = match super::load_taskfile(&taskfile_path) {
        Ok(t) => t,
        Err(e) => {
            print_status(Status::Failed, "Failed to load taskfile");
            eprintln!();
            return Err(e);
        }
    };

    print_status(Status::Done, "Taskfile is valid YAML");

    let validation = TaskfileValidator::validate(&taskfile);
    let missing_tools = missing_tools(&taskfile, &super::project_root(&taskfile_path)?).await;

    if !validation.errors.is_empty() {
        print_heading("Errors".red().bold());
        for error in &validation.errors {
            print_status(Status::Failed, error);
        }
    }

    if !missing_tools.is_empty() {
        print_heading("Missing tools".yellow().bold());
        for tool in &missing_tools {
            print_status(Status::Warning, tool);
        }
    }

    if !validation.warnings.is_empty() {
        print_heading("Warnings".yellow().bold());
        for warning in &validation.warnings {
            print_status(Status::Warning, warning);
        }
    }

    if verbose {
        print_heading("Taskfile summary");
        println!("  Name: {}", taskfile.name);
        println!("  Tasks: {}", taskfile.tasks.len());
        for task in &taskfile.tasks {
            let deps = if task.depends_on.is_empty() {
                String::new()
            } else {
                format!(" [depends: {}]", task.depends_on.join(", "))
            };
            println!("    - {} ({}){}", task.name, task.kind_name(), deps.dimmed());
        }
        println!("  Watch rules: {}", taskfile.watch.rules.len());
    }

    println!();

    if !validation.is_valid() {
        return Err(miette::miette!("Taskfile validation failed"));
    }

    if validation.has_warnings() || !missing_tools.is_empty() {
        println!("{}", "Taskfile is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Taskfile is valid!".green().bold());
    }
    Ok(())
}

/// External executables the taskfile needs that are not on PATH
async fn missing_tools(taskfile: &Taskfile, root: &std::path::Path) -> Vec<String> {
    let steps = || {
        taskfile.tasks.iter().flat_map(|t| match &t.kind {
            TaskKind::Pipeline { steps, .. } => steps.iter().collect::<Vec<_>>(),
            _ => vec![],
        })
    };

    let mut missing = Vec::new();

    let mut compilers: Vec<&str> = steps()
        .filter_map(|s| match s {
            StepConfig::Sass(sass) => Some(sass.command.as_str()),
            _ => None,
        })
        .collect();
    compilers.sort_unstable();
    compilers.dedup();
    for command in compilers {
        if which::which(command).is_err() {
            missing.push(format!("'{}' is needed by sass steps", command));
        }
    }

    let needs_bundler = steps().any(|s| matches!(s, StepConfig::Bundle(_) | StepConfig::MinifyJs(_)));
    if needs_bundler {
        let bundler = CommandBundler::new(&taskfile.bundler, root.to_path_buf());
        if !bundler.check_available().await {
            missing.push(format!(
                "'{}' is needed by bundle and minify_js steps",
                bundler.name()
            ));
        }
    }

    missing
}
