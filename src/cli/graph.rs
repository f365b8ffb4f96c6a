// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Graph command - visualize the task graph

use miette::Result;
use std::path::PathBuf;

use super::GraphFormat;
use crate::pipeline::TaskGraph;

/// Run the graph command
pub async fn run(taskfile_path: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
    let taskfile = super::load_taskfile(&taskfile_path)?;
    let graph = TaskGraph::build(&taskfile)?;

    let output = match format {
        GraphFormat::Text => graph.to_text()?,
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
