// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Taskfile validation
//!
//! Validates taskfile configuration before anything runs.

use std::collections::HashSet;
use std::path::Path;

use crate::errors::AssetflowError;
use crate::pipeline::{StepConfig, Task, TaskGraph, TaskKind, Taskfile};
use crate::steps::is_contained;
use crate::watch::WatchRules;

/// Taskfile validator
pub struct TaskfileValidator;

impl TaskfileValidator {
    /// Validate a taskfile configuration
    pub fn validate(taskfile: &Taskfile) -> ValidationResult {
        let mut result = ValidationResult::new();

        if taskfile.tasks.is_empty() {
            result.add_error("Taskfile has no tasks defined");
        }

        // Check for duplicate and empty task names
        let mut seen_names = HashSet::new();
        for task in &taskfile.tasks {
            if task.name.trim().is_empty() {
                result.add_error("Task with an empty name");
            }
            if !seen_names.insert(&task.name) {
                result.add_error(&format!("Duplicate task name: '{}'", task.name));
            }
        }

        // Validate graph structure (checks for cycles and unknown references)
        let graph = match TaskGraph::build(taskfile) {
            Ok(graph) => Some(graph),
            Err(AssetflowError::CircularDependency { tasks }) => {
                result.add_error(&format!("Circular dependency: {}", tasks.join(" → ")));
                None
            }
            Err(AssetflowError::UnknownReference { task, reference }) => {
                result.add_error(&format!(
                    "Task '{}' references unknown task '{}'",
                    task, reference
                ));
                None
            }
            // Reported above
            Err(AssetflowError::DuplicateTask { .. }) => None,
            Err(e) => {
                result.add_error(&format!("Task graph error: {}", e));
                None
            }
        };

        for task in &taskfile.tasks {
            Self::validate_task(task, &mut result);
        }

        Self::validate_watch(taskfile, graph.as_ref(), &mut result);

        result
    }

    /// Validate a single task
    fn validate_task(task: &Task, result: &mut ValidationResult) {
        match &task.kind {
            TaskKind::Pipeline { src, steps } => {
                let patterns = src.patterns();
                if patterns.is_empty() || patterns.iter().any(|p| p.trim().is_empty()) {
                    result.add_error(&format!("Task '{}': source pattern is empty", task.name));
                }
                for pattern in patterns {
                    if let Err(e) = glob::Pattern::new(pattern) {
                        result.add_error(&format!(
                            "Task '{}': invalid source pattern '{}': {}",
                            task.name, pattern, e
                        ));
                    }
                }

                if !steps.iter().any(|s| matches!(s, StepConfig::Dest(_))) {
                    result.add_warning(&format!(
                        "Task '{}': pipeline has no 'dest' step - nothing will be written",
                        task.name
                    ));
                }

                for step in steps {
                    if let StepConfig::Dest(dest) = step {
                        Self::check_relative(task, "dest", &dest.dir, result);
                    }
                }
            }
            TaskKind::Clean { paths } => {
                if paths.is_empty() {
                    result.add_warning(&format!("Task '{}': nothing to clean", task.name));
                }
                for path in paths {
                    Self::check_relative(task, "clean", path, result);
                }
            }
            TaskKind::Series { tasks } | TaskKind::Parallel { tasks } => {
                if tasks.is_empty() {
                    result.add_warning(&format!("Task '{}': composition is empty", task.name));
                }
            }
            TaskKind::Serve => {}
        }
    }

    fn check_relative(task: &Task, what: &str, path: &Path, result: &mut ValidationResult) {
        if !is_contained(path) {
            result.add_error(&format!(
                "Task '{}': {} path '{}' must stay inside the project",
                task.name,
                what,
                path.display()
            ));
        }
    }

    /// Validate watch rules against the registered tasks
    fn validate_watch(taskfile: &Taskfile, graph: Option<&TaskGraph>, result: &mut ValidationResult) {
        if let Err(e) = WatchRules::compile(&taskfile.watch.rules) {
            result.add_error(&format!("Invalid watch pattern: {}", e));
        }

        let serve_tasks: Vec<&str> = taskfile
            .tasks
            .iter()
            .filter(|t| matches!(t.kind, TaskKind::Serve))
            .map(|t| t.name.as_str())
            .collect();

        for rule in &taskfile.watch.rules {
            let Some(task) = taskfile.get_task(&rule.task) else {
                result.add_error(&format!(
                    "Watch rule '{}' targets unknown task '{}'",
                    rule.pattern, rule.task
                ));
                continue;
            };

            let starts_server = match graph {
                Some(graph) => serve_tasks
                    .iter()
                    .any(|serve| *serve == task.name || graph.depends_on(&task.name, serve)),
                None => matches!(task.kind, TaskKind::Serve),
            };
            if starts_server {
                result.add_error(&format!(
                    "Watch rule '{}' targets '{}', which starts the dev server",
                    rule.pattern, rule.task
                ));
            } else if task.is_composite() {
                result.add_warning(&format!(
                    "Watch rule '{}' targets composite task '{}' - every member re-runs on change",
                    rule.pattern, rule.task
                ));
            }
        }
    }
}

/// Result of taskfile validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::template::default_taskfile;

    fn validate(yaml: &str) -> ValidationResult {
        TaskfileValidator::validate(&Taskfile::from_yaml(yaml).unwrap())
    }

    #[test]
    fn test_default_template_is_valid() {
        let result = TaskfileValidator::validate(&default_taskfile().unwrap());
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(!result.has_warnings(), "{:?}", result.warnings);
    }

    #[test]
    fn test_validate_empty_taskfile() {
        let result = validate("name: empty\ntasks: []\n");
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("no tasks"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let result = validate(
            r#"
name: t
tasks:
  - name: dup
    kind: serve
  - name: dup
    kind: clean
    paths: [build]
"#,
        );
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("Duplicate")));
    }

    #[test]
    fn test_validate_cycle_and_unknown() {
        let cycle = validate(
            r#"
name: t
tasks:
  - name: a
    kind: series
    tasks: [b]
  - name: b
    kind: series
    tasks: [a]
"#,
        );
        assert!(cycle.errors.iter().any(|e| e.contains("Circular")));

        let unknown = validate(
            r#"
name: t
tasks:
  - name: a
    kind: parallel
    tasks: [ghost]
"#,
        );
        assert!(unknown.errors.iter().any(|e| e.contains("'ghost'")));
    }

    #[test]
    fn test_validate_watch_rules() {
        let result = validate(
            r#"
name: t
tasks:
  - name: serve
    kind: serve
  - name: dev
    kind: series
    tasks: [serve]
watch:
  rules:
    - { pattern: "src/*.html", task: html }
    - { pattern: "src/**/*", task: dev }
"#,
        );
        assert!(result.errors.iter().any(|e| e.contains("unknown task 'html'")));
        assert!(result.errors.iter().any(|e| e.contains("starts the dev server")));
    }

    #[test]
    fn test_pipeline_without_dest_warns() {
        let result = validate(
            r#"
name: t
tasks:
  - name: lint
    kind: pipeline
    src: src/*.html
    steps:
      - type: tidy
"#,
        );
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("no 'dest'")));
    }

    #[test]
    fn test_escaping_paths_are_errors() {
        let result = validate(
            r#"
name: t
tasks:
  - name: clean
    kind: clean
    paths: ["../other"]
  - name: copy
    kind: pipeline
    src: "*.txt"
    steps:
      - type: dest
        dir: /tmp/out
"#,
        );
        assert_eq!(result.errors.len(), 2);
    }
}
