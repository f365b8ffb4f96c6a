// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Per-task rebuild scheduling
//!
//! Every watched task gets one worker with a single-slot queue. A change
//! while the task is idle starts it; a change while it runs fills the slot;
//! further changes before the slot drains are coalesced into that one re-run.

use colored::Colorize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use super::{TaskInvoker, WatchRules};
use crate::server::{LiveReload, ReloadEvent};
use crate::utils::Status;

/// What happened to a change for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The task will run for this change
    Scheduled,
    /// A re-run is already pending and will cover this change
    Coalesced,
}

/// Routes changed paths to task workers
pub struct WatchCoordinator {
    rules: WatchRules,
    workers: HashMap<String, mpsc::Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl WatchCoordinator {
    /// Start one worker per task named by `rules`
    ///
    /// After every successful run that wrote files, a reload event is
    /// published with paths relative to `server_root`.
    pub fn new(
        rules: WatchRules,
        invoker: Arc<dyn TaskInvoker>,
        live_reload: LiveReload,
        server_root: PathBuf,
    ) -> Self {
        let mut workers = HashMap::new();
        let mut handles = Vec::new();

        for task in rules.task_names() {
            let (tx, rx) = mpsc::channel(1);
            handles.push(tokio::spawn(worker(
                task.to_string(),
                rx,
                invoker.clone(),
                live_reload.clone(),
                server_root.clone(),
            )));
            workers.insert(task.to_string(), tx);
        }

        Self {
            rules,
            workers,
            handles,
        }
    }

    /// Schedule the tasks affected by `changed` (project-relative paths)
    pub fn dispatch(&self, changed: &[PathBuf]) -> Vec<(String, Dispatch)> {
        let mut tasks: Vec<&str> = Vec::new();
        for path in changed {
            for task in self.rules.tasks_for(path) {
                if !tasks.contains(&task) {
                    tasks.push(task);
                }
            }
        }

        let mut out = Vec::with_capacity(tasks.len());
        for task in tasks {
            let Some(tx) = self.workers.get(task) else {
                continue;
            };
            let outcome = match tx.try_send(()) {
                Ok(()) => Dispatch::Scheduled,
                Err(TrySendError::Full(())) => Dispatch::Coalesced,
                Err(TrySendError::Closed(())) => {
                    tracing::warn!(task, "watch worker stopped");
                    continue;
                }
            };
            tracing::debug!(task, ?outcome, "change dispatched");
            out.push((task.to_string(), outcome));
        }
        out
    }
}

impl Drop for WatchCoordinator {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

async fn worker(
    task: String,
    mut rx: mpsc::Receiver<()>,
    invoker: Arc<dyn TaskInvoker>,
    live_reload: LiveReload,
    server_root: PathBuf,
) {
    while rx.recv().await.is_some() {
        match invoker.invoke(&task).await {
            Ok(written) if written.is_empty() => {
                tracing::debug!(task = %task, "nothing changed, no reload");
            }
            Ok(written) => {
                let sessions = live_reload.notify(ReloadEvent::new(&task, &written, &server_root));
                tracing::debug!(task = %task, sessions, "reload sent");
            }
            // Keep watching after a failed rebuild
            Err(e) => {
                eprintln!("{}", Status::Failed.line(format!("{}: {}", task.bold(), e)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AssetflowResult;
    use crate::pipeline::WatchRule;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Invoker whose runs block until released
    struct GatedInvoker {
        runs: AtomicUsize,
        gate: Semaphore,
        written: Vec<PathBuf>,
    }

    impl GatedInvoker {
        fn new(written: Vec<PathBuf>) -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                gate: Semaphore::new(0),
                written,
            })
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskInvoker for GatedInvoker {
        async fn invoke(&self, _task: &str) -> AssetflowResult<Vec<PathBuf>> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            Ok(self.written.clone())
        }
    }

    async fn wait_for(invoker: &GatedInvoker, runs: usize) {
        for _ in 0..200 {
            if invoker.runs() >= runs {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {runs} runs, saw {}", invoker.runs());
    }

    fn rules() -> WatchRules {
        WatchRules::compile(&[
            WatchRule {
                pattern: "src/scss/**/*.scss".into(),
                task: "styles".into(),
            },
            WatchRule {
                pattern: "src/js/main.js".into(),
                task: "scripts".into(),
            },
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_events_during_run_are_coalesced() {
        let invoker = GatedInvoker::new(vec![]);
        let coordinator = WatchCoordinator::new(
            rules(),
            invoker.clone(),
            LiveReload::new(),
            PathBuf::from("build"),
        );
        let change = [PathBuf::from("src/scss/styles.scss")];

        assert_eq!(
            coordinator.dispatch(&change),
            vec![("styles".to_string(), Dispatch::Scheduled)]
        );
        wait_for(&invoker, 1).await;

        // First run is blocked: one change queues, the rest coalesce
        assert_eq!(coordinator.dispatch(&change)[0].1, Dispatch::Scheduled);
        assert_eq!(coordinator.dispatch(&change)[0].1, Dispatch::Coalesced);
        assert_eq!(coordinator.dispatch(&change)[0].1, Dispatch::Coalesced);

        invoker.gate.add_permits(10);
        wait_for(&invoker, 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(invoker.runs(), 2);
    }

    #[tokio::test]
    async fn test_unmatched_change_runs_nothing() {
        let invoker = GatedInvoker::new(vec![]);
        let coordinator = WatchCoordinator::new(
            rules(),
            invoker.clone(),
            LiveReload::new(),
            PathBuf::from("build"),
        );

        assert!(coordinator.dispatch(&[PathBuf::from("README.md")]).is_empty());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(invoker.runs(), 0);
    }

    #[tokio::test]
    async fn test_completed_run_publishes_reload() {
        let invoker = GatedInvoker::new(vec![PathBuf::from("build/css/styles.css")]);
        invoker.gate.add_permits(1);
        let live_reload = LiveReload::new();
        let mut events = live_reload.subscribe();

        let coordinator = WatchCoordinator::new(
            rules(),
            invoker.clone(),
            live_reload,
            PathBuf::from("build"),
        );
        coordinator.dispatch(&[PathBuf::from("src/scss/_vars.scss")]);

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.task, "styles");
        assert_eq!(event.paths, vec!["css/styles.css"]);
        assert!(event.css_only);
    }
}
