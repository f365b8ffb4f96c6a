// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Task registry and execution
//!
//! This module defines the taskfile schema, the validated task graph, and the
//! runner that executes task plans.

mod dag;
mod definition;
mod executor;
mod runner;
pub mod template;
mod validation;

pub use dag::{Plan, TaskGraph};
pub use definition::*;
pub use executor::PipelineExecutor;
pub use runner::{RunOptions, RunSummary, TaskRunner};
pub use validation::{TaskfileValidator, ValidationResult};
