// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Live-reload broadcast service

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 16;

/// Pushed to every connected browser after a rebuild
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReloadEvent {
    /// Task that produced the change
    pub task: String,
    /// Changed files, as URL paths relative to the served directory
    pub paths: Vec<String>,
    /// Every changed file is a stylesheet, so the page can swap styles in place
    pub css_only: bool,
}

impl ReloadEvent {
    /// Build an event from written paths (relative to the project root)
    pub fn new(task: &str, written: &[PathBuf], server_root: &Path) -> Self {
        let paths: Vec<String> = written
            .iter()
            .map(|path| {
                let relative = path.strip_prefix(server_root).unwrap_or(path);
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect();

        let css_only = !paths.is_empty() && paths.iter().all(|p| p.ends_with(".css"));

        Self {
            task: task.to_string(),
            paths,
            css_only,
        }
    }
}

/// Process-wide live-reload channel
///
/// Cloning shares the channel: the dev server subscribes one receiver per
/// browser session, the watch coordinator publishes after each rebuild.
#[derive(Debug, Clone)]
pub struct LiveReload {
    sender: broadcast::Sender<ReloadEvent>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event, returning how many sessions received it
    pub fn notify(&self, event: ReloadEvent) -> usize {
        tracing::debug!(task = %event.task, files = event.paths.len(), "reload");
        // Sending fails only when nobody is connected
        self.sender.send(event).unwrap_or(0)
    }

    /// Register a new browser session
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.sender.subscribe()
    }

    /// Number of connected sessions
    pub fn sessions(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_paths_are_relative_to_server_root() {
        let event = ReloadEvent::new(
            "styles",
            &[
                PathBuf::from("build/css/styles.css"),
                PathBuf::from("build/css/styles.min.css"),
            ],
            Path::new("build"),
        );
        assert_eq!(event.paths, vec!["css/styles.css", "css/styles.min.css"]);
        assert!(event.css_only);
    }

    #[test]
    fn test_mixed_changes_need_full_reload() {
        let event = ReloadEvent::new(
            "html",
            &[PathBuf::from("build/index.html"), PathBuf::from("build/a.css")],
            Path::new("build"),
        );
        assert!(!event.css_only);

        let empty = ReloadEvent::new("clean", &[], Path::new("build"));
        assert!(!empty.css_only);
    }

    #[tokio::test]
    async fn test_notify_reaches_subscribers() {
        let live_reload = LiveReload::new();
        assert_eq!(live_reload.notify(ReloadEvent::new("a", &[], Path::new("build"))), 0);

        let mut rx = live_reload.subscribe();
        let clone = live_reload.clone();
        assert_eq!(clone.sessions(), 1);

        let event = ReloadEvent::new("scripts", &[PathBuf::from("build/js/bundle.js")], Path::new("build"));
        assert_eq!(clone.notify(event.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }
}
