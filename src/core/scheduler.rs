//! Job expansion and the worker pool that translates files

use glob::{MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::core::cache::{fingerprint, ChangeCache};
use crate::core::config::TranslateConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{Job, Task};
use crate::core::port::TranslationPort;
use crate::core::report::ResultReport;
use crate::processors::markdown::{is_markdown_file, MarkdownProcessor};

/// `*` stays within one path component; `**` crosses directories
const EXCLUDE_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Number of workers used when none is configured
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Runs translation jobs over a fixed pool of workers.
///
/// The change cache and the report are shared by every worker; the cache is
/// only reachable through the scheduler's mutex.
#[derive(Clone)]
pub struct JobScheduler {
    processor: MarkdownProcessor,
    cache: Arc<Mutex<ChangeCache>>,
    report: ResultReport,
    parallel: usize,
    force: bool,
    show_progress: bool,
}

impl JobScheduler {
    pub fn new(translator: Arc<dyn TranslationPort>, cache: ChangeCache) -> Self {
        Self {
            processor: MarkdownProcessor::new(translator),
            cache: Arc::new(Mutex::new(cache)),
            report: ResultReport::new(),
            parallel: default_parallelism(),
            force: false,
            show_progress: false,
        }
    }

    /// Fixed pool size for the run (at least one)
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    /// Translate files even when their fingerprint is unchanged
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn report(&self) -> &ResultReport {
        &self.report
    }

    pub fn parallel(&self) -> usize {
        self.parallel
    }

    /// Run every configured job; a failing job is recorded and the rest continue
    pub async fn run_config(&self, config: &TranslateConfig) {
        for job in &config.jobs {
            info!("Executing job: {}", job.source.display());
            if let Err(e) = self.run_job(job, config).await {
                warn!("Error processing job {}: {}", job.source.display(), e);
                self.report
                    .record_error(job.source.display().to_string(), e)
                    .await;
            }
        }
    }

    /// Expand one job into tasks and run them
    pub async fn run_job(&self, job: &Job, config: &TranslateConfig) -> Result<()> {
        let metadata =
            tokio::fs::metadata(&job.source)
                .await
                .map_err(|_| TranslationError::SourceNotFound {
                    path: job.source.display().to_string(),
                })?;

        let target_lang =
            config
                .target_lang_for(job)
                .ok_or_else(|| TranslationError::MissingTargetLanguage {
                    job: job.source.display().to_string(),
                })?;

        match config.source_lang_for(job) {
            Some(source_lang) => info!(
                "Job {}: {} -> {}",
                job.source.display(),
                source_lang,
                target_lang
            ),
            None => info!(
                "Job {}: auto-detected source -> {}",
                job.source.display(),
                target_lang
            ),
        }

        let tasks = if metadata.is_dir() {
            self.expand_directory(job, &target_lang).await
        } else {
            vec![Task::new(&job.source, &job.destination, target_lang)]
        };

        self.run(tasks).await;
        Ok(())
    }

    /// Walk a directory job and build one task per Markdown file that is not
    /// excluded. Exclusions count as skips; problems count against the file.
    pub async fn expand_directory(&self, job: &Job, target_lang: &str) -> Vec<Task> {
        let patterns: Vec<(String, std::result::Result<Pattern, glob::PatternError>)> = job
            .exclude
            .iter()
            .map(|raw| (raw.clone(), Pattern::new(raw)))
            .collect();

        let entries: Vec<_> = walkdir::WalkDir::new(&job.source)
            .sort_by_file_name()
            .into_iter()
            .collect();
        let mut tasks = Vec::new();

        'files: for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| job.source.display().to_string());
                    self.report.record_error(path, e).await;
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !is_markdown_file(path) {
                continue;
            }
            let relative = match path.strip_prefix(&job.source) {
                Ok(relative) => relative,
                Err(e) => {
                    self.report.record_error(path.display().to_string(), e).await;
                    continue;
                }
            };

            for (raw, pattern) in &patterns {
                match pattern {
                    Err(e) => {
                        self.report
                            .record_error(
                                path.display().to_string(),
                                TranslationError::InvalidExcludePattern {
                                    pattern: raw.clone(),
                                    message: e.to_string(),
                                },
                            )
                            .await;
                        continue 'files;
                    }
                    Ok(pattern) if is_excluded(pattern, path, relative) => {
                        info!("Skipping excluded file: {}", path.display());
                        self.report.record_skip().await;
                        continue 'files;
                    }
                    Ok(_) => {}
                }
            }

            let dest_path = job.destination.join(relative);
            if let Some(parent) = dest_path.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    self.report
                        .record_error(
                            path.display().to_string(),
                            TranslationError::FileError {
                                path: parent.display().to_string(),
                                message: e.to_string(),
                            },
                        )
                        .await;
                    continue;
                }
            }

            tasks.push(Task::new(path, dest_path, target_lang));
        }

        debug!("Job {} expanded to {} tasks", job.source.display(), tasks.len());
        tasks
    }

    /// Run tasks on the worker pool and wait until every one was attempted
    pub async fn run(&self, tasks: Vec<Task>) {
        if tasks.is_empty() {
            return;
        }

        let total = tasks.len();
        let progress = self.progress_bar(total);

        // The queue is filled completely before any worker starts
        let (sender, receiver) = mpsc::channel(total);
        for task in tasks {
            if let Err(e) = sender.send(task).await {
                error!("Failed to enqueue {}", e.0.source_path.display());
            }
        }
        drop(sender);

        let queue = Arc::new(Mutex::new(receiver));
        let workers = self.parallel.min(total);
        debug!("Starting {} workers for {} tasks", workers, total);

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let scheduler = self.clone();
            let queue = Arc::clone(&queue);
            let progress = progress.clone();
            handles.push(tokio::spawn(async move {
                scheduler.worker(id, queue, progress).await
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Worker terminated abnormally: {}", e);
            }
        }

        progress.finish_with_message("Completed");
    }

    /// Persist the change cache
    pub async fn save_cache(&self) -> Result<()> {
        self.cache.lock().await.save()
    }

    async fn worker(
        &self,
        id: usize,
        queue: Arc<Mutex<mpsc::Receiver<Task>>>,
        progress: ProgressBar,
    ) {
        loop {
            let next = queue.lock().await.recv().await;
            let Some(task) = next else {
                break;
            };

            let source = task.source_path.display().to_string();
            progress.set_message(source.clone());

            // A panic inside the task is caught here and charged to its file
            let scheduler = self.clone();
            let outcome = tokio::spawn(async move { scheduler.process_task(&task).await }).await;

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Failed to translate {}: {}", source, e);
                    self.report.record_error(source, e).await;
                }
                Err(e) => {
                    error!("Task for {} aborted: {}", source, e);
                    self.report
                        .record_error(
                            source,
                            TranslationError::InternalError(format!("task aborted: {}", e)),
                        )
                        .await;
                }
            }

            progress.inc(1);
        }

        debug!("Worker {} finished", id);
    }

    /// Translate one file
    async fn process_task(&self, task: &Task) -> Result<()> {
        let source_key = task.source_path.display().to_string();

        let source = tokio::fs::read(&task.source_path)
            .await
            .map_err(|e| TranslationError::FileError {
                path: source_key.clone(),
                message: e.to_string(),
            })?;
        let hash = fingerprint(&source);

        if !self.force && !self.cache.lock().await.is_changed(&source_key, &hash) {
            info!("Skipping unchanged file: {}", source_key);
            self.report.record_skip().await;
            return Ok(());
        }

        info!(
            "Translating {} -> {}",
            task.source_path.display(),
            task.dest_path.display()
        );

        let document = self
            .processor
            .translate_document(&source, &task.target_lang)
            .await?;

        if document.requested == 0 {
            info!("No translatable text found in {}, copying file", source_key);
        }

        write_output(&task.dest_path, &document.content).await?;

        self.cache.lock().await.update(source_key, hash);
        self.report.record_success().await;
        self.report.add_chars(document.translated_chars).await;
        Ok(())
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .map(|style| style.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}

/// Write a translated document, creating the parent directory if needed
async fn write_output(output: &Path, content: &str) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TranslationError::FileError {
                    path: parent.display().to_string(),
                    message: e.to_string(),
                })?;
        }
    }

    tokio::fs::write(output, content)
        .await
        .map_err(|e| TranslationError::FileError {
            path: output.display().to_string(),
            message: e.to_string(),
        })
}

/// A pattern excludes a file when it matches the walked path, the path
/// relative to the job source, or one of the relative parent directories
fn is_excluded(pattern: &Pattern, path: &Path, relative: &Path) -> bool {
    pattern.matches_path_with(path, EXCLUDE_MATCH)
        || relative
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| pattern.matches_path_with(p, EXCLUDE_MATCH))
}
