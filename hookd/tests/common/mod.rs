//! Shared test fixtures
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use hookd::deploy::CommandRunner;
use hookd::errors::HookError;

/// Command runner fake that records invocations instead of spawning shells
pub struct RecordingRunner {
    calls: Mutex<Vec<(String, PathBuf)>>,
    fail: bool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// A runner whose every invocation fails like a non-zero exit
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of concurrently running invocations observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn execute(&self, command: &str, working_dir: &Path) -> Result<String, HookError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        // Yield long enough for overlapping callers to actually overlap
        tokio::time::sleep(Duration::from_millis(25)).await;

        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), working_dir.to_path_buf()));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(HookError::ExecError("command exited with status 1".to_string()));
        }
        Ok(String::new())
    }
}
