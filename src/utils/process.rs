// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! External tool invocation

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::errors::{AssetflowError, AssetflowResult};

/// Locate an executable on PATH
pub fn find_tool(tool: &str) -> AssetflowResult<PathBuf> {
    which::which(tool).map_err(|_| AssetflowError::tool_not_found(tool))
}

/// Run `bin` with `args`, optionally feeding `stdin`, and return its stdout
///
/// A non-zero exit status is an error carrying the tool's stderr.
pub async fn run_tool(
    tool: &str,
    bin: &Path,
    args: &[String],
    stdin: Option<Vec<u8>>,
    working_dir: &Path,
) -> AssetflowResult<Vec<u8>> {
    let mut cmd = Command::new(bin);
    cmd.args(args)
        .current_dir(working_dir)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!(tool, ?args, "spawning");

    let mut child = cmd.spawn().map_err(|e| AssetflowError::ToolFailed {
        tool: tool.to_string(),
        error: e.to_string(),
        help: Some(format!("'{}' could not be started", bin.display())),
    })?;

    // Feed stdin concurrently so a chatty tool cannot fill its stdout pipe first
    let writer = match (child.stdin.take(), stdin) {
        (Some(mut pipe), Some(input)) => Some(tokio::spawn(async move {
            let result = pipe.write_all(&input).await;
            drop(pipe);
            result
        })),
        _ => None,
    };

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| AssetflowError::ToolFailed {
            tool: tool.to_string(),
            error: e.to_string(),
            help: None,
        })?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if output.status.success() => {
                return Err(AssetflowError::ToolFailed {
                    tool: tool.to_string(),
                    error: format!("failed to write stdin: {}", e),
                    help: None,
                });
            }
            _ => {}
        }
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let code = output.status.code().unwrap_or(-1);
        return Err(AssetflowError::ToolFailed {
            tool: tool.to_string(),
            error: if stderr.is_empty() {
                format!("exited with status {}", code)
            } else {
                stderr
            },
            help: None,
        });
    }

    Ok(output.stdout)
}
