//! Run-wide tally of translated, skipped and failed files

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Error recorded against one file or job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub path: String,
    pub message: String,
}

/// Snapshot of the counters
#[derive(Debug, Clone)]
pub struct ReportState {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub translated_chars: usize,
    pub errors: Vec<FileError>,
    pub started_at: DateTime<Utc>,
}

impl ReportState {
    fn new() -> Self {
        Self {
            succeeded: 0,
            skipped: 0,
            failed: 0,
            translated_chars: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
        }
    }
}

/// Shared result report; clones point at the same counters
#[derive(Debug, Clone)]
pub struct ResultReport {
    state: Arc<RwLock<ReportState>>,
}

impl Default for ResultReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultReport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ReportState::new())),
        }
    }

    pub async fn record_success(&self) {
        self.state.write().await.succeeded += 1;
    }

    pub async fn record_skip(&self) {
        self.state.write().await.skipped += 1;
    }

    pub async fn add_chars(&self, count: usize) {
        self.state.write().await.translated_chars += count;
    }

    /// Count a failure and keep its message
    pub async fn record_error(&self, path: impl Into<String>, error: impl std::fmt::Display) {
        let path = path.into();
        let message = error.to_string();
        debug!("Recording failure for {}: {}", path, message);

        let mut state = self.state.write().await;
        state.failed += 1;
        state.errors.push(FileError { path, message });
    }

    /// Copy of the current counters
    pub async fn snapshot(&self) -> ReportState {
        self.state.read().await.clone()
    }

    /// Human-readable summary
    pub async fn render(&self) -> String {
        let state = self.state.read().await;
        let elapsed = Utc::now() - state.started_at;

        let mut out = String::new();
        let _ = writeln!(out, "\n--- Translation Summary ---");
        let _ = writeln!(out, "✅ Successful: {}", state.succeeded);
        let _ = writeln!(out, "⏩ Skipped:    {}", state.skipped);
        let _ = writeln!(out, "❌ Failed:     {}", state.failed);
        let _ = writeln!(out, "🔤 Characters: {}", state.translated_chars);
        let _ = writeln!(
            out,
            "⏱  Time:       {:.1}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        );
        let _ = writeln!(out, "---------------------------");

        if !state.errors.is_empty() {
            let _ = writeln!(out, "\nErrors:");
            for error in &state.errors {
                let _ = writeln!(out, "- File: {}\n  Error: {}", error.path, error.message);
            }
            let _ = writeln!(out, "---------------------------");
        }

        out
    }

    /// Print the summary to stdout
    pub async fn print(&self) {
        println!("{}", self.render().await);
    }
}
