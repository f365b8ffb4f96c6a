// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Taskfile definition structures
//!
//! Defines the schema for .assetflow.yaml files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::AssetflowError;
use crate::steps::{
    AutoprefixStep, BundleStep, DestStep, MinifyCssStep, MinifyJsStep, NewerStep,
    OptimizeImagesStep, PartialsStep, RenameStep, SassStep, Step, SvgMinStep, SvgStoreStep,
    TidyStep, WebpStep,
};

/// Default taskfile name, looked up in the project root
pub const DEFAULT_TASKFILE: &str = ".assetflow.yaml";

/// Task run when none is named on the command line
pub const DEFAULT_TASK: &str = "default";

/// Taskfile loaded from .assetflow.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taskfile {
    /// Taskfile version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Project name
    pub name: String,

    /// Project description
    #[serde(default)]
    pub description: Option<String>,

    /// Registered tasks
    pub tasks: Vec<Task>,

    /// File watch rules used by `serve` tasks
    #[serde(default)]
    pub watch: WatchConfig,

    /// Dev server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// External bundler used by `bundle` and `minify_js` steps
    #[serde(default)]
    pub bundler: BundlerConfig,
}

fn default_version() -> String {
    "1".to_string()
}

impl Taskfile {
    /// Load a taskfile from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, AssetflowError> {
        if !path.exists() {
            return Err(AssetflowError::TaskfileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| AssetflowError::read(path, e))?;

        Self::from_yaml(&content)
    }

    /// Parse a taskfile from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, AssetflowError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Serialize the taskfile to YAML
    pub fn to_yaml(&self) -> Result<String, AssetflowError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a task by name
    pub fn get_task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Get all task names in declaration order
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }
}

/// A named unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Task name (must be unique within the taskfile)
    pub name: String,

    /// Task description
    #[serde(default)]
    pub description: Option<String>,

    /// Tasks that must complete before this one starts
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// What the task does
    #[serde(flatten)]
    pub kind: TaskKind,
}

impl Task {
    /// Short label for the task kind
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            TaskKind::Pipeline { .. } => "pipeline",
            TaskKind::Clean { .. } => "clean",
            TaskKind::Serve => "serve",
            TaskKind::Series { .. } => "series",
            TaskKind::Parallel { .. } => "parallel",
        }
    }

    /// Every task name this task refers to, in declaration order
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self.depends_on.iter().map(String::as_str).collect();
        if let TaskKind::Series { tasks } | TaskKind::Parallel { tasks } = &self.kind {
            for task_ref in tasks {
                task_ref.collect_names(&mut refs);
            }
        }
        refs
    }

    /// Whether this task composes other tasks instead of doing work itself
    pub fn is_composite(&self) -> bool {
        matches!(self.kind, TaskKind::Series { .. } | TaskKind::Parallel { .. })
    }
}

/// Task kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskKind {
    /// Read sources, apply steps in order
    Pipeline {
        /// Source glob pattern(s), relative to the project root
        src: Sources,

        /// Ordered transformation steps
        #[serde(default)]
        steps: Vec<StepConfig>,
    },

    /// Delete paths (relative to the project root)
    Clean { paths: Vec<PathBuf> },

    /// Start the dev server and file watchers
    Serve,

    /// Run members one after another
    Series { tasks: Vec<TaskRef> },

    /// Run members concurrently
    Parallel { tasks: Vec<TaskRef> },
}

/// Reference to a task inside a composition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskRef {
    /// A registered task by name
    Name(String),

    /// Inline series
    Series { series: Vec<TaskRef> },

    /// Inline parallel group
    Parallel { parallel: Vec<TaskRef> },
}

impl TaskRef {
    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Name(name) => out.push(name),
            Self::Series { series: refs } | Self::Parallel { parallel: refs } => {
                for r in refs {
                    r.collect_names(out);
                }
            }
        }
    }
}

/// Source globs for a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sources {
    /// Single glob pattern
    Single(String),

    /// Multiple glob patterns
    Multiple(Vec<String>),
}

impl Sources {
    /// Get source patterns
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Multiple(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }
}

/// Pipeline step configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
    Newer(NewerStep),
    Partials(PartialsStep),
    Tidy(TidyStep),
    Sass(SassStep),
    Autoprefix(AutoprefixStep),
    MinifyCss(MinifyCssStep),
    Rename(RenameStep),
    Bundle(BundleStep),
    MinifyJs(MinifyJsStep),
    OptimizeImages(OptimizeImagesStep),
    Webp(WebpStep),
    Svgmin(SvgMinStep),
    Svgstore(SvgStoreStep),
    Dest(DestStep),
}

impl StepConfig {
    /// The step implementation behind this configuration
    pub fn as_step(&self) -> &dyn Step {
        match self {
            Self::Newer(s) => s,
            Self::Partials(s) => s,
            Self::Tidy(s) => s,
            Self::Sass(s) => s,
            Self::Autoprefix(s) => s,
            Self::MinifyCss(s) => s,
            Self::Rename(s) => s,
            Self::Bundle(s) => s,
            Self::MinifyJs(s) => s,
            Self::OptimizeImages(s) => s,
            Self::Webp(s) => s,
            Self::Svgmin(s) => s,
            Self::Svgstore(s) => s,
            Self::Dest(s) => s,
        }
    }

    /// Step name as written in the taskfile
    pub fn name(&self) -> &'static str {
        self.as_step().name()
    }
}

/// File watching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window for file system events
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Path prefixes (relative to the project root) whose changes are ignored
    #[serde(default)]
    pub ignore: Vec<PathBuf>,

    /// Pattern to task mappings
    #[serde(default)]
    pub rules: Vec<WatchRule>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            ignore: vec![],
            rules: vec![],
        }
    }
}

fn default_debounce_ms() -> u64 {
    200
}

/// Maps a file-change pattern to the task it re-triggers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchRule {
    /// Glob pattern relative to the project root
    pub pattern: String,
    /// Task to re-run
    pub task: String,
}

/// Dev server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory served over HTTP
    #[serde(default = "default_server_root")]
    pub root: PathBuf,

    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Inject the live-reload client into served HTML
    #[serde(default = "default_true")]
    pub live_reload: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: default_server_root(),
            host: default_host(),
            port: default_port(),
            live_reload: true,
        }
    }
}

fn default_server_root() -> PathBuf {
    PathBuf::from("build")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_true() -> bool {
    true
}

/// External bundler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundlerConfig {
    /// Bundler executable
    #[serde(default = "default_bundler")]
    pub command: String,

    /// Extra arguments passed on every bundle invocation
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            command: default_bundler(),
            args: vec![],
        }
    }
}

fn default_bundler() -> String {
    "esbuild".to_string()
}
