// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Error types
//!
//! Every failure carries a diagnostic code and, where there is something the
//! user can do about it, a help message.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for assetflow operations
pub type AssetflowResult<T> = Result<T, AssetflowError>;

/// Main error type for assetflow
#[derive(Error, Debug, Diagnostic)]
pub enum AssetflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Taskfile not found: {path}")]
    #[diagnostic(
        code(assetflow::taskfile_not_found),
        help("Create one with 'assetflow init' or pass --taskfile <PATH>")
    )]
    TaskfileNotFound { path: PathBuf },

    #[error("Task '{task}' is not registered")]
    #[diagnostic(
        code(assetflow::unknown_task),
        help("Run 'assetflow tasks' to list the registered tasks")
    )]
    UnknownTask { task: String },

    #[error("Task '{task}' references unknown task '{reference}'")]
    #[diagnostic(
        code(assetflow::unknown_reference),
        help("Check that '{reference}' is defined in the taskfile")
    )]
    UnknownReference { task: String, reference: String },

    #[error("Task '{task}' is defined more than once")]
    #[diagnostic(code(assetflow::duplicate_task))]
    DuplicateTask { task: String },

    #[error("Circular task dependency: {}", tasks.join(" → "))]
    #[diagnostic(
        code(assetflow::circular_dependency),
        help("Review 'depends_on' and series/parallel members to remove the cycle")
    )]
    CircularDependency { tasks: Vec<String> },

    #[error("Task '{task}' is invalid: {reason}")]
    #[diagnostic(code(assetflow::invalid_task))]
    InvalidTask { task: String, reason: String },

    #[error("Invalid taskfile: {reason}")]
    #[diagnostic(code(assetflow::invalid_taskfile))]
    InvalidTaskfile {
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step '{step}' of task '{task}' failed: {message}")]
    #[diagnostic(code(assetflow::step_failed))]
    StepFailed {
        task: String,
        step: String,
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Tool '{tool}' not found")]
    #[diagnostic(code(assetflow::tool_not_found), help("{suggestion}"))]
    ToolNotFound { tool: String, suggestion: String },

    #[error("Tool '{tool}' failed: {error}")]
    #[diagnostic(code(assetflow::tool_failed))]
    ToolFailed {
        tool: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("Could not process '{path}': {message}")]
    #[diagnostic(code(assetflow::transform_failed))]
    TransformFailed { path: PathBuf, message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(assetflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(assetflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("Failed to remove '{path}': {error}")]
    #[diagnostic(code(assetflow::file_remove_error))]
    FileRemoveError { path: PathBuf, error: String },

    #[error("No input files matched pattern: {pattern}")]
    #[diagnostic(
        code(assetflow::no_input_files),
        help("'{pattern}' has no wildcards, so the file it names must exist")
    )]
    NoInputFiles { pattern: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(assetflow::glob_error))]
    GlobPattern { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Serve / Watch Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Dev server error: {message}")]
    #[diagnostic(code(assetflow::server_error))]
    Server {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("File watcher error: {message}")]
    #[diagnostic(code(assetflow::watch_error))]
    Watch { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(assetflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(assetflow::yaml_error))]
    Yaml { message: String },
}

impl From<std::io::Error> for AssetflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for AssetflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for AssetflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl From<notify::Error> for AssetflowError {
    fn from(e: notify::Error) -> Self {
        Self::Watch { message: e.to_string() }
    }
}

impl AssetflowError {
    /// Create a tool not found error with installation suggestion
    pub fn tool_not_found(tool: &str) -> Self {
        let suggestion = match tool {
            "sass" => "Install Dart Sass: npm install -g sass (https://sass-lang.com/install)".to_string(),
            "esbuild" => "Install esbuild: npm install -g esbuild (https://esbuild.github.io)".to_string(),
            _ => format!("Install {} and ensure it's in your PATH", tool),
        };

        Self::ToolNotFound {
            tool: tool.to_string(),
            suggestion,
        }
    }

    /// Wrap an error raised inside a pipeline step, keeping its help text
    pub fn in_step(task: &str, step: &str, error: AssetflowError) -> Self {
        match error {
            already @ Self::StepFailed { .. } => already,
            other => {
                let help = other.help().map(|h| h.to_string());
                Self::StepFailed {
                    task: task.to_string(),
                    step: step.to_string(),
                    message: other.to_string(),
                    help,
                }
            }
        }
    }

    /// Convenience for a read failure on `path`
    pub fn read(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::FileReadError {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Convenience for a write failure on `path`
    pub fn write(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::FileWriteError {
            path: path.into(),
            error: error.to_string(),
        }
    }
}
