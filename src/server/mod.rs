// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Development server
//!
//! Serves the build directory over HTTP and pushes reload events to connected
//! browsers through server-sent events.

mod livereload;
mod router;

pub use livereload::{LiveReload, ReloadEvent};
pub use router::{content_type, inject_client, request_path, router, CLIENT_PATH, EVENTS_PATH};

use colored::Colorize;
use std::future::Future;
use std::path::PathBuf;
use tokio::net::TcpListener;

use crate::errors::{AssetflowError, AssetflowResult};
use crate::pipeline::ServerConfig;

/// Bind the configured address and serve `root` until `shutdown` resolves
pub async fn serve<F>(
    config: &ServerConfig,
    root: PathBuf,
    live_reload: LiveReload,
    shutdown: F,
) -> AssetflowResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AssetflowError::Server {
            message: format!("cannot bind {}: {}", addr, e),
            help: Some("Choose another port with --port or 'server.port'".into()),
        })?;

    serve_listener(listener, root, config.live_reload, live_reload, shutdown).await
}

/// Serve `root` on an already bound listener
pub async fn serve_listener<F>(
    listener: TcpListener,
    root: PathBuf,
    inject: bool,
    live_reload: LiveReload,
    shutdown: F,
) -> AssetflowResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr()?;
    println!(
        "  {} Serving {} at {}",
        "●".green(),
        root.display(),
        format!("http://{}", local).cyan()
    );
    tracing::info!(addr = %local, root = %root.display(), "dev server listening");

    let app = router(root, inject, live_reload);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AssetflowError::Server {
            message: e.to_string(),
            help: None,
        })?;

    tracing::info!("dev server stopped");
    Ok(())
}
