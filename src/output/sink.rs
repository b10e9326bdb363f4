//! Single-writer result sink
//!
//! Producers enqueue matched URLs through a [`SinkWriter`]; one background task
//! owns the output file and appends them one line at a time in the order they
//! were received. Writing is decoupled from the fetch tasks, so a slow disk
//! never holds up a fetch.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors that can occur while starting or stopping the sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to truncate output file {}: {source}", path.display())]
    Truncate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Sink worker failed: {0}")]
    Worker(String),
}

/// Counts reported by the worker when it exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Lines successfully appended
    pub written: u64,

    /// Appends that failed and were dropped
    pub failed: u64,
}

/// Message consumed by the worker loop
#[derive(Debug)]
enum SinkMessage {
    Append(String),
    Shutdown,
}

/// Cloneable producer handle for the sink queue
#[derive(Debug, Clone)]
pub struct SinkWriter {
    tx: mpsc::UnboundedSender<SinkMessage>,
}

impl SinkWriter {
    /// Enqueues a URL for appending; returns immediately
    pub fn write(&self, url: impl Into<String>) {
        let url = url.into();
        if self.tx.send(SinkMessage::Append(url.clone())).is_err() {
            tracing::error!("Result sink is stopped, dropping {}", url);
        }
    }
}

/// Background writer that owns the output file for the duration of a run
pub struct ResultSink {
    path: PathBuf,
    writer: SinkWriter,
    worker: JoinHandle<SinkReport>,
}

impl ResultSink {
    /// Truncates (or creates) the output file and launches the worker
    ///
    /// The file is empty when this returns, before any `write` is issued.
    pub async fn start(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();

        tokio::fs::File::create(&path)
            .await
            .map_err(|source| SinkError::Truncate {
                path: path.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(path.clone(), rx));

        tracing::debug!("Result sink started for {}", path.display());

        Ok(Self {
            path,
            writer: SinkWriter { tx },
            worker,
        })
    }

    /// Returns a producer handle that can be moved into a fetch task
    pub fn writer(&self) -> SinkWriter {
        self.writer.clone()
    }

    /// Enqueues a URL for appending
    pub fn write(&self, url: impl Into<String>) {
        self.writer.write(url);
    }

    /// Path of the output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sends the shutdown signal and waits for the worker to drain
    ///
    /// Every item enqueued before this call is appended (or reported as
    /// failed) by the time it returns. Call it once all producers are done.
    pub async fn stop(self) -> Result<SinkReport, SinkError> {
        // A send error means the worker already exited; join below reports why
        let _ = self.writer.tx.send(SinkMessage::Shutdown);

        let report = self
            .worker
            .await
            .map_err(|e| SinkError::Worker(e.to_string()))?;

        tracing::debug!(
            "Result sink stopped: {} written, {} failed",
            report.written,
            report.failed
        );

        Ok(report)
    }
}

/// Worker loop: appends queued URLs in FIFO order until shutdown
async fn run_worker(path: PathBuf, mut rx: mpsc::UnboundedReceiver<SinkMessage>) -> SinkReport {
    let mut report = SinkReport::default();

    while let Some(message) = rx.recv().await {
        match message {
            SinkMessage::Append(url) => match append_line(&path, &url).await {
                Ok(()) => {
                    report.written += 1;
                    tracing::debug!("Saved {} to {}", url, path.display());
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("Failed to save {} to {}: {}", url, path.display(), e);
                }
            },
            SinkMessage::Shutdown => break,
        }
    }

    report
}

/// Appends one line to the file, holding it open only for this write
async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{}\n", line).as_bytes()).await?;
    file.flush().await
}
