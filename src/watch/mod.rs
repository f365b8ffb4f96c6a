// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! File watching and rebuild-on-change
//!
//! Changes under the project root are debounced, mapped through the watch
//! rules to tasks, and handed to the [`WatchCoordinator`]. The dev server runs
//! alongside and receives a reload event after every rebuild.

mod coordinator;

pub use coordinator::{Dispatch, WatchCoordinator};

use async_trait::async_trait;
use colored::Colorize;
use glob::{MatchOptions, Pattern};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::errors::{AssetflowError, AssetflowResult};
use crate::pipeline::{TaskRunner, WatchRule};
use crate::steps::{expand_braces, normalize_pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Something that can run a task and report the files it wrote
#[async_trait]
pub trait TaskInvoker: Send + Sync {
    /// Run `task`, returning written paths relative to the project root
    async fn invoke(&self, task: &str) -> AssetflowResult<Vec<PathBuf>>;
}

#[async_trait]
impl TaskInvoker for TaskRunner {
    async fn invoke(&self, task: &str) -> AssetflowResult<Vec<PathBuf>> {
        Ok(self.run(task).await?.outputs())
    }
}

/// Compiled watch rules
#[derive(Debug, Clone)]
pub struct WatchRules {
    rules: Vec<(Vec<Pattern>, String)>,
}

impl WatchRules {
    /// Compile rules; `{a,b}` groups are expanded
    pub fn compile(rules: &[WatchRule]) -> AssetflowResult<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let patterns = expand_braces(normalize_pattern(&rule.pattern))
                .iter()
                .map(|p| Pattern::new(p))
                .collect::<Result<Vec<_>, _>>()?;
            compiled.push((patterns, rule.task.clone()));
        }
        Ok(Self { rules: compiled })
    }

    /// Tasks whose pattern matches `path` (relative to the project root)
    pub fn tasks_for(&self, path: &Path) -> Vec<&str> {
        let path = slash_path(path);
        let mut tasks: Vec<&str> = Vec::new();

        for (patterns, task) in &self.rules {
            let matched = patterns
                .iter()
                .any(|p| p.matches_with(&path, MATCH_OPTIONS));
            if matched && !tasks.contains(&task.as_str()) {
                tasks.push(task);
            }
        }
        tasks
    }

    /// Distinct task names, in rule order
    pub fn task_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (_, task) in &self.rules {
            if !names.contains(&task.as_str()) {
                names.push(task);
            }
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Project-relative changed paths, minus ignored prefixes, deduplicated
pub fn relevant_paths<'a>(
    root: &Path,
    ignore: &[PathBuf],
    changed: impl IntoIterator<Item = &'a Path>,
) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    for path in changed {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if relative.as_os_str().is_empty() || ignore.iter().any(|i| relative.starts_with(i)) {
            continue;
        }
        if !out.iter().any(|p| p == relative) {
            out.push(relative.to_path_buf());
        }
    }
    out
}

/// Serve the build directory and rebuild on change until Ctrl+C
pub async fn watch_and_serve(runner: TaskRunner) -> AssetflowResult<()> {
    let taskfile = runner.taskfile();
    let root = runner
        .root()
        .canonicalize()
        .unwrap_or_else(|_| runner.root().to_path_buf());
    let server = taskfile.server.clone();
    let rules = WatchRules::compile(&taskfile.watch.rules)?;

    let mut ignore = taskfile.watch.ignore.clone();
    ignore.push(server.root.clone());
    ignore.push(PathBuf::from(".git"));

    let coordinator = WatchCoordinator::new(
        rules.clone(),
        Arc::new(runner.clone()),
        runner.live_reload().clone(),
        server.root.clone(),
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut debouncer = new_debouncer(
        Duration::from_millis(taskfile.watch.debounce_ms),
        move |result: DebounceEventResult| {
            let _ = tx.send(result);
        },
    )?;
    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let serve_root = root.join(&server.root);
    let live_reload = runner.live_reload().clone();
    let mut server_task = tokio::spawn(async move {
        crate::server::serve(&server, serve_root, live_reload, async move {
            let _ = stop_rx.await;
        })
        .await
    });

    if rules.is_empty() {
        println!("  {} no watch rules configured", "!".yellow());
    } else {
        println!(
            "  {} Watching {} for {}",
            "●".green(),
            root.display(),
            rules.task_names().join(", ")
        );
    }
    println!("  Press {} to stop.", "Ctrl+C".cyan());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                println!("{}", "Stopping...".dimmed());
                break;
            }
            finished = &mut server_task => {
                // The server only stops on its own when it fails
                return match finished {
                    Ok(result) => result,
                    Err(e) => Err(AssetflowError::Server { message: e.to_string(), help: None }),
                };
            }
            Some(result) = rx.recv() => match result {
                Ok(events) => {
                    let changed = relevant_paths(&root, &ignore, events.iter().map(|e| e.path.as_path()));
                    for (task, outcome) in coordinator.dispatch(&changed) {
                        let note = match outcome {
                            Dispatch::Scheduled => "rebuilding",
                            Dispatch::Coalesced => "already queued",
                        };
                        println!("  {} {} {}", "↻".yellow(), task.bold(), note.dimmed());
                    }
                }
                Err(e) => {
                    tracing::warn!(error = ?e, "file watcher error");
                }
            }
        }
    }

    drop(coordinator);
    let _ = stop_tx.send(());
    match server_task.await {
        Ok(result) => result,
        Err(e) => Err(AssetflowError::Server {
            message: e.to_string(),
            help: None,
        }),
    }
}
