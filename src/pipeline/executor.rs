// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! File pipeline executor
//!
//! Reads the files matched by a pipeline's source globs and threads the
//! resulting asset stream through its steps in declared order. Writes happen
//! inside `dest` steps and are not rolled back when a later step fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bundler::Bundler;
use crate::errors::{AssetflowError, AssetflowResult};
use crate::pipeline::{Sources, StepConfig};
use crate::steps::{resolve_sources, StepContext, TaskReport};

/// Runs pipeline tasks against a project root
#[derive(Clone)]
pub struct PipelineExecutor {
    root: PathBuf,
    bundler: Arc<dyn Bundler>,
}

impl PipelineExecutor {
    /// Create an executor for the project at `root`
    pub fn new(root: PathBuf, bundler: Arc<dyn Bundler>) -> Self {
        Self { root, bundler }
    }

    /// Project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Execute one pipeline, recording statistics in `report`
    ///
    /// Errors are attributed to the step that raised them; reading the sources
    /// counts as the `src` step.
    pub async fn run(
        &self,
        task: &str,
        sources: &Sources,
        steps: &[StepConfig],
        report: &mut TaskReport,
    ) -> AssetflowResult<()> {
        let mut assets = resolve_sources(&sources.patterns(), &self.root)
            .await
            .map_err(|e| AssetflowError::in_step(task, "src", e))?;
        report.files_read = assets.len();

        tracing::debug!(task, files = assets.len(), "sources resolved");

        let ctx = StepContext {
            task,
            root: &self.root,
            bundler: self.bundler.as_ref(),
        };

        for config in steps {
            let step = config.as_step();
            tracing::debug!(task, step = step.name(), assets = assets.len(), "applying step");

            assets = step
                .apply(assets, &ctx, report)
                .await
                .map_err(|e| AssetflowError::in_step(task, step.name(), e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::tests::StubBundler;
    use crate::pipeline::Taskfile;
    use crate::pipeline::TaskKind;
    use tempfile::TempDir;

    fn pipeline(yaml: &str) -> (Sources, Vec<StepConfig>) {
        let taskfile = Taskfile::from_yaml(yaml).unwrap();
        match taskfile.tasks.into_iter().next().unwrap().kind {
            TaskKind::Pipeline { src, steps } => (src, steps),
            other => panic!("expected pipeline, got {other:?}"),
        }
    }

    fn executor(dir: &TempDir) -> PipelineExecutor {
        PipelineExecutor::new(dir.path().to_path_buf(), Arc::new(StubBundler::default()))
    }

    const MISC: &str = r#"
name: t
tasks:
  - name: misc
    kind: pipeline
    src: src/misc/**/*
    steps:
      - type: newer
        dest: build/misc
      - type: dest
        dir: build/misc
"#;

    #[tokio::test]
    async fn test_copy_mirrors_layout() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/misc/fonts")).unwrap();
        std::fs::write(dir.path().join("src/misc/robots.txt"), "User-agent: *").unwrap();
        std::fs::write(dir.path().join("src/misc/fonts/a.woff2"), [1u8, 2, 3]).unwrap();

        let (src, steps) = pipeline(MISC);
        let mut report = TaskReport::new("misc");
        executor(&dir).run("misc", &src, &steps, &mut report).await.unwrap();

        assert_eq!(report.files_read, 2);
        assert_eq!(report.written, 2);
        assert_eq!(
            std::fs::read(dir.path().join("build/misc/fonts/a.woff2")).unwrap(),
            vec![1u8, 2, 3]
        );
        assert!(dir.path().join("build/misc/robots.txt").exists());
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/misc")).unwrap();
        std::fs::write(dir.path().join("src/misc/a.txt"), "a").unwrap();

        let (src, steps) = pipeline(MISC);
        let exec = executor(&dir);

        let mut first = TaskReport::new("misc");
        exec.run("misc", &src, &steps, &mut first).await.unwrap();
        assert_eq!(first.written, 1);

        let mut second = TaskReport::new("misc");
        exec.run("misc", &src, &steps, &mut second).await.unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.filtered, 1);
    }

    #[tokio::test]
    async fn test_step_failure_names_the_step() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/index.html"),
            "<!-- partial:missing.html --><!-- partial -->",
        )
        .unwrap();

        let (src, steps) = pipeline(
            r#"
name: t
tasks:
  - name: html
    kind: pipeline
    src: src/*.html
    steps:
      - type: partials
      - type: dest
        dir: build
"#,
        );
        let mut report = TaskReport::new("html");
        let err = executor(&dir)
            .run("html", &src, &steps, &mut report)
            .await
            .unwrap_err();

        match err {
            AssetflowError::StepFailed { task, step, .. } => {
                assert_eq!(task, "html");
                assert_eq!(step, "partials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dir.path().join("build/index.html").exists());
    }

    #[tokio::test]
    async fn test_missing_literal_source_is_a_src_failure() {
        let dir = TempDir::new().unwrap();
        let (src, steps) = pipeline(
            r#"
name: t
tasks:
  - name: styles
    kind: pipeline
    src: src/scss/styles.scss
"#,
        );
        let mut report = TaskReport::new("styles");
        let err = executor(&dir)
            .run("styles", &src, &steps, &mut report)
            .await
            .unwrap_err();
        assert!(matches!(err, AssetflowError::StepFailed { ref step, .. } if step == "src"));
    }
}
