//! Deploy journal
//!
//! A rotating plain-text log: one `"[ISO-8601 timestamp] message"` line per
//! entry, capped at a maximum line count. Every line is mirrored to the
//! console stream. Writes are best-effort: a journal that cannot be written
//! must never abort the deployment it is describing.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::HookError;

/// Rotating deploy journal
#[derive(Debug)]
pub struct Journal {
    file: PathBuf,
    max_lines: usize,
    // Serializes the read-rewrite rotation step against concurrent writers.
    write_lock: Mutex<()>,
}

impl Journal {
    /// Create a journal backed by the given file
    pub fn new(file: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self {
            file: file.into(),
            max_lines,
            write_lock: Mutex::new(()),
        }
    }

    /// Journal file path
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Ensure the journal directory and file exist. Idempotent; safe to call
    /// on every process start.
    pub async fn init(&self) -> Result<(), HookError> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent).await?;
        }
        if fs::metadata(&self.file).await.is_err() {
            fs::write(&self.file, b"").await?;
        }
        Ok(())
    }

    /// Record a message: mirror it to the console and append a timestamped
    /// line to the journal file, rotating first. Never fails.
    pub async fn record(&self, message: &str) {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = format!("[{}] {}", stamp, message);
        info!("{}", message);

        if let Err(e) = self.append(&line).await {
            warn!("journal write failed: {}", e);
        }
    }

    /// Read all non-empty journal lines in file order, oldest first
    pub async fn read_all(&self) -> Result<Vec<String>, HookError> {
        let contents = fs::read_to_string(&self.file).await?;
        Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn append(&self, line: &str) -> Result<(), HookError> {
        let _guard = self.write_lock.lock().await;

        // Rotation: keep only the trailing max_lines entries, counting the
        // line about to be written.
        let mut lines = match fs::read_to_string(&self.file).await {
            Ok(contents) => contents
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>(),
            Err(_) => Vec::new(),
        };
        lines.push(line.to_string());

        if lines.len() > self.max_lines {
            let keep = lines.split_off(lines.len() - self.max_lines);
            let mut contents = keep.join("\n");
            contents.push('\n');
            fs::write(&self.file, contents).await?;
        } else {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file)
                .await?;
            file.write_all(format!("{}\n", line).as_bytes()).await?;
            // tokio file writes complete in the background; without the flush
            // a following read can miss the line and rotation can clobber it.
            file.flush().await?;
        }

        Ok(())
    }
}
