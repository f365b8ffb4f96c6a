// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! # assetflow - Front-end Asset Task Runner
//!
//! `assetflow` runs a declared graph of asset tasks: HTML partial injection,
//! style compilation, script bundling, image optimization, SVG sprites, and a
//! live-reloading dev server.
//!
//! ## Features
//!
//! - **Task graph** - Series and parallel composition, validated up front
//! - **File pipelines** - Glob sources through ordered steps into `build/`
//! - **Incremental** - `newer` guards and content hashes skip redundant writes
//! - **Watch & reload** - Rebuild the matching task and push reloads to browsers
//!
//! ## Quick Start
//!
//! ```bash
//! # Write the built-in taskfile
//! assetflow init
//!
//! # Build once
//! assetflow run build
//!
//! # Build, serve and watch
//! assetflow run
//! ```

pub mod bundler;
pub mod cache;
pub mod cli;
pub mod errors;
pub mod pipeline;
pub mod server;
pub mod steps;
pub mod utils;
pub mod watch;

// Re-export commonly used types
pub use errors::{AssetflowError, AssetflowResult};
pub use pipeline::{Plan, Task, TaskGraph, TaskRunner, Taskfile};
pub use server::LiveReload;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
