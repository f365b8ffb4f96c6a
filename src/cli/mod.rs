// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for assetflow.

pub mod graph;
pub mod init;
pub mod run;
pub mod tasks;
pub mod validate;
pub mod watch;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};

use crate::pipeline::{Taskfile, TaskfileValidator, DEFAULT_TASKFILE};
use crate::utils::Status;

/// Front-end asset task runner
///
/// Build HTML, styles, scripts, images and sprites from a declared task graph.
#[derive(Parser, Debug)]
#[clap(
    name = "assetflow",
    version,
    about = "Front-end asset task runner with live reload",
    long_about = None,
    after_help = "Examples:\n\
        assetflow init                  Write a starter .assetflow.yaml\n\
        assetflow run                   Build, then serve with live reload\n\
        assetflow run build             Build once\n\
        assetflow run styles scripts    Run individual tasks\n\
        assetflow graph -f mermaid      Show the task graph\n\n\
        See 'assetflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Taskfile to load
    #[clap(
        short = 't',
        long,
        global = true,
        env = "ASSETFLOW_TASKFILE",
        default_value = DEFAULT_TASKFILE
    )]
    pub taskfile: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the built-in taskfile
    Init {
        /// Project name (defaults to current directory name)
        name: Option<String>,

        /// Overwrite an existing taskfile
        #[clap(long)]
        force: bool,
    },

    /// Run one or more tasks (default: "default")
    Run {
        /// Tasks to run, one after another
        tasks: Vec<String>,

        /// Dev server port for serve tasks
        #[clap(short, long, env = "ASSETFLOW_PORT")]
        port: Option<u16>,

        /// Dry run (show the plan without running it)
        #[clap(long)]
        dry_run: bool,
    },

    /// Serve the build directory and rebuild on change, without an initial build
    Watch {
        /// Dev server port
        #[clap(short, long, env = "ASSETFLOW_PORT")]
        port: Option<u16>,
    },

    /// Validate taskfile configuration
    Validate,

    /// List registered tasks
    Tasks,

    /// Show the task graph
    Graph {
        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// Tasks in execution order with their plans
    Text,
    /// Graphviz
    Dot,
    /// Mermaid flowchart
    Mermaid,
}

/// Load a taskfile, turning library errors into reports
pub(crate) fn load_taskfile(path: &Path) -> Result<Taskfile> {
    Ok(Taskfile::from_file(path)?)
}

/// Directory the taskfile lives in; all task paths resolve against it
pub(crate) fn project_root(taskfile: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    Ok(match taskfile.parent() {
        Some(parent) => cwd.join(parent),
        None => cwd,
    })
}

/// Refuse to run an invalid taskfile
pub(crate) fn ensure_valid(taskfile: &Taskfile, verbose: bool) -> Result<()> {
    let validation = TaskfileValidator::validate(taskfile);

    if !validation.is_valid() {
        eprintln!("{}", "Taskfile validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("{}", Status::Failed.line(error));
        }
        return Err(miette::miette!("Taskfile configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Taskfile warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("{}", Status::Warning.line(warning));
        }
        eprintln!();
    }

    Ok(())
}
