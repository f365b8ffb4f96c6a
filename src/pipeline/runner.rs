// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Task runner
//!
//! Compiles a task name into its plan and executes it: series members in
//! order, parallel members concurrently, stopping a series at the first
//! failure.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use futures::future::{join_all, BoxFuture, FutureExt};

use crate::bundler::{Bundler, CommandBundler};
use crate::errors::{AssetflowError, AssetflowResult};
use crate::pipeline::{PipelineExecutor, Plan, Task, TaskGraph, TaskKind, Taskfile};
use crate::server::LiveReload;
use crate::steps::{is_contained, TaskReport};
use crate::utils::Status;

/// Run options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only print the plan
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Result of running a task
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Reports of every executed task, in completion order
    pub reports: Vec<TaskReport>,
    /// Total execution time
    pub duration: Duration,
}

impl RunSummary {
    /// Files written across all tasks
    pub fn written(&self) -> usize {
        self.reports.iter().map(|r| r.written).sum()
    }

    /// Paths written across all tasks, relative to the project root
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.reports
            .iter()
            .flat_map(|r| r.outputs.iter().cloned())
            .collect()
    }

    /// Task names in plan order
    pub fn task_names(&self) -> Vec<&str> {
        self.reports.iter().map(|r| r.task.as_str()).collect()
    }
}

/// Executes tasks of a validated taskfile
///
/// Cheap to clone; the watch coordinator hands clones to its workers.
#[derive(Clone)]
pub struct TaskRunner {
    graph: Arc<TaskGraph>,
    root: PathBuf,
    executor: PipelineExecutor,
    live_reload: LiveReload,
    options: RunOptions,
}

impl TaskRunner {
    /// Validate `taskfile` and prepare a runner for the project at `root`
    ///
    /// Scripts are bundled with the bundler named in the taskfile.
    pub fn new(taskfile: &Taskfile, root: PathBuf) -> AssetflowResult<Self> {
        let bundler = Arc::new(CommandBundler::new(&taskfile.bundler, root.clone()));
        Self::with_bundler(taskfile, root, bundler)
    }

    /// Like [`TaskRunner::new`] with an explicit bundler
    pub fn with_bundler(
        taskfile: &Taskfile,
        root: PathBuf,
        bundler: Arc<dyn Bundler>,
    ) -> AssetflowResult<Self> {
        let graph = TaskGraph::build(taskfile)?;
        Ok(Self {
            graph: Arc::new(graph),
            executor: PipelineExecutor::new(root.clone(), bundler),
            root,
            live_reload: LiveReload::new(),
            options: RunOptions::default(),
        })
    }

    /// Set run options
    pub fn options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn taskfile(&self) -> &Taskfile {
        self.graph.taskfile()
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Live-reload service shared with the dev server
    pub fn live_reload(&self) -> &LiveReload {
        &self.live_reload
    }

    /// Run a task by name
    pub async fn run(&self, name: &str) -> AssetflowResult<RunSummary> {
        let start = Instant::now();
        let plan = self.graph.plan(name)?;

        if self.options.dry_run {
            self.print_plan(name, &plan);
            return Ok(RunSummary::default());
        }

        tracing::info!(task = name, plan = %plan, "running");
        let reports = self.run_plan(&plan).await?;

        Ok(RunSummary {
            reports,
            duration: start.elapsed(),
        })
    }

    fn run_plan<'a>(&'a self, plan: &'a Plan) -> BoxFuture<'a, AssetflowResult<Vec<TaskReport>>> {
        async move {
            match plan {
                Plan::Run(name) => Ok(vec![self.run_single(name).await?]),
                Plan::Series(plans) => {
                    let mut reports = Vec::new();
                    for member in plans {
                        reports.extend(self.run_plan(member).await?);
                    }
                    Ok(reports)
                }
                Plan::Parallel(plans) => {
                    let results = join_all(plans.iter().map(|member| self.run_plan(member))).await;
                    let mut reports = Vec::new();
                    for result in results {
                        reports.extend(result?);
                    }
                    Ok(reports)
                }
            }
        }
        .boxed()
    }

    async fn run_single(&self, name: &str) -> AssetflowResult<TaskReport> {
        let task = self
            .taskfile()
            .get_task(name)
            .ok_or_else(|| AssetflowError::UnknownTask {
                task: name.to_string(),
            })?;

        let start = Instant::now();
        let mut report = TaskReport::new(name);
        println!("  {} {}", "→".blue(), name);

        match self.execute(task, &mut report).await {
            Ok(()) => {
                report.duration = start.elapsed();
                println!(
                    "{}",
                    Status::Done.line(format!(
                        "{} {}",
                        name.bold(),
                        format!("({})", report.summary()).dimmed()
                    ))
                );
                if self.options.verbose {
                    for output in &report.outputs {
                        println!("      {}", output.display().to_string().dimmed());
                    }
                }
                tracing::info!(task = name, written = report.written, "task finished");
                Ok(report)
            }
            Err(e) => {
                println!("{}", Status::Failed.line(format!("{} failed", name.bold())));
                tracing::debug!(task = name, error = %e, "task failed");
                Err(e)
            }
        }
    }

    async fn execute(&self, task: &Task, report: &mut TaskReport) -> AssetflowResult<()> {
        match &task.kind {
            TaskKind::Pipeline { src, steps } => {
                self.executor.run(&task.name, src, steps, report).await
            }
            TaskKind::Clean { paths } => self.clean(&task.name, paths, report).await,
            TaskKind::Serve => crate::watch::watch_and_serve(self.clone()).await,
            // Compositions are expanded by the plan
            TaskKind::Series { .. } | TaskKind::Parallel { .. } => Ok(()),
        }
    }

    async fn clean(
        &self,
        task: &str,
        paths: &[PathBuf],
        report: &mut TaskReport,
    ) -> AssetflowResult<()> {
        for path in paths {
            let names_root = path.components().all(|c| matches!(c, Component::CurDir));
            if names_root || !is_contained(path) {
                return Err(AssetflowError::InvalidTask {
                    task: task.to_string(),
                    reason: format!("refusing to clean '{}' outside the project", path.display()),
                });
            }

            let full = self.root.join(path);
            let metadata = match tokio::fs::symlink_metadata(&full).await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(AssetflowError::FileRemoveError {
                        path: full,
                        error: e.to_string(),
                    })
                }
            };

            let removed = if metadata.is_dir() {
                tokio::fs::remove_dir_all(&full).await
            } else {
                tokio::fs::remove_file(&full).await
            };
            removed.map_err(|e| AssetflowError::FileRemoveError {
                path: full.clone(),
                error: e.to_string(),
            })?;

            tracing::debug!(task, path = %full.display(), "removed");
            report.removed += 1;
        }
        Ok(())
    }

    fn print_plan(&self, name: &str, plan: &Plan) {
        println!("{} {}", "Plan for".bold(), name.cyan());
        println!("  {}", plan);
        println!();
        for (i, leaf) in plan.leaves().iter().enumerate() {
            let kind = self
                .taskfile()
                .get_task(leaf)
                .map(|t| t.kind_name())
                .unwrap_or("?");
            println!("  {}. {} {}", i + 1, leaf, format!("({})", kind).dimmed());
        }
        println!();
        println!("{}", "Dry run - no tasks executed".yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::tests::StubBundler;
    use tempfile::TempDir;

    const SITE: &str = r#"
name: t
tasks:
  - name: clean
    kind: clean
    paths: [build]
  - name: html
    kind: pipeline
    src: src/*.html
    steps:
      - type: partials
        remove_tags: true
      - type: dest
        dir: build
  - name: misc
    kind: pipeline
    src: src/misc/**/*
    steps:
      - type: newer
        dest: build/misc
      - type: dest
        dir: build/misc
  - name: scripts
    kind: pipeline
    src: src/js/main.js
    steps:
      - type: bundle
      - type: rename
        suffix: .min
      - type: minify_js
      - type: dest
        dir: build/js
  - name: build
    kind: series
    tasks:
      - clean
      - html
      - parallel: [misc, scripts]
  - name: broken
    kind: series
    tasks: [clean, missing_src, html]
  - name: missing_src
    kind: pipeline
    src: src/nope.txt
"#;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/partials")).unwrap();
        std::fs::create_dir_all(root.join("src/misc")).unwrap();
        std::fs::create_dir_all(root.join("src/js")).unwrap();
        std::fs::write(
            root.join("src/index.html"),
            "<body><!-- partial:partials/nav.html --><!-- partial --></body>",
        )
        .unwrap();
        std::fs::write(root.join("src/partials/nav.html"), "<nav></nav>").unwrap();
        std::fs::write(root.join("src/misc/robots.txt"), "User-agent: *").unwrap();
        std::fs::write(root.join("src/js/main.js"), "let a = 1;").unwrap();
        dir
    }

    fn runner(dir: &TempDir) -> TaskRunner {
        let taskfile = Taskfile::from_yaml(SITE).unwrap();
        TaskRunner::with_bundler(
            &taskfile,
            dir.path().to_path_buf(),
            Arc::new(StubBundler::default()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_build_runs_clean_first() {
        let dir = project();
        std::fs::create_dir_all(dir.path().join("build")).unwrap();
        std::fs::write(dir.path().join("build/stale.html"), "old").unwrap();

        let summary = runner(&dir).run("build").await.unwrap();
        let names = summary.task_names();

        assert_eq!(names[0], "clean");
        assert_eq!(names[1], "html");
        assert_eq!(names.len(), 4);
        assert!(!dir.path().join("build/stale.html").exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("build/index.html")).unwrap(),
            "<body><nav></nav></body>"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("build/js/main.min.js")).unwrap(),
            "/*es2015*/leta=1;"
        );
        assert!(dir.path().join("build/misc/robots.txt").exists());
    }

    #[tokio::test]
    async fn test_rerun_without_clean_writes_nothing() {
        let dir = project();
        let runner = runner(&dir);

        for task in ["html", "misc", "scripts"] {
            runner.run(task).await.unwrap();
        }
        for task in ["html", "misc", "scripts"] {
            let summary = runner.run(task).await.unwrap();
            assert_eq!(summary.written(), 0, "{task} rewrote output");
        }
    }

    #[tokio::test]
    async fn test_clean_build_is_deterministic() {
        let dir = project();
        let runner = runner(&dir);

        let snapshot = |outputs: &[PathBuf]| -> Vec<(PathBuf, Vec<u8>)> {
            outputs
                .iter()
                .map(|p| (p.clone(), std::fs::read(dir.path().join(p)).unwrap()))
                .collect()
        };

        let first = runner.run("build").await.unwrap();
        let first_files = snapshot(&first.outputs());
        let second = runner.run("build").await.unwrap();

        assert!(!first.outputs().is_empty());
        assert_eq!(first.outputs(), second.outputs());
        assert_eq!(first.task_names(), second.task_names());
        assert_eq!(first_files, snapshot(&second.outputs()));
    }

    #[tokio::test]
    async fn test_failure_aborts_series() {
        let dir = project();
        let err = runner(&dir).run("broken").await.unwrap_err();

        assert!(matches!(err, AssetflowError::StepFailed { ref task, .. } if task == "missing_src"));
        assert!(!dir.path().join("build/index.html").exists());
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let dir = project();
        assert!(matches!(
            runner(&dir).run("deploy").await,
            Err(AssetflowError::UnknownTask { .. })
        ));
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let dir = project();
        let runner = runner(&dir).options(RunOptions {
            dry_run: true,
            verbose: false,
        });

        let summary = runner.run("build").await.unwrap();
        assert!(summary.reports.is_empty());
        assert!(!dir.path().join("build").exists());
    }

    #[tokio::test]
    async fn test_clean_refuses_paths_outside_root() {
        let dir = project();
        let yaml = r#"
name: t
tasks:
  - name: clean
    kind: clean
    paths: ["../elsewhere"]
"#;
        let taskfile = Taskfile::from_yaml(yaml).unwrap();
        let runner = TaskRunner::with_bundler(
            &taskfile,
            dir.path().to_path_buf(),
            Arc::new(StubBundler::default()),
        )
        .unwrap();

        assert!(matches!(
            runner.run("clean").await,
            Err(AssetflowError::InvalidTask { .. })
        ));
    }
}
