//! Batch orchestration: runs every item through validate → invoke → verify,
//! retries transient failures, reports progress and collects all outcomes.

use crate::backends::SpeechEngine;
use crate::error::{BatchError, SynthesisError};
use crate::invoker::Synthesizer;
use crate::validator::{validate, SynthesisConfig};
use crate::verifier::{verify, MIN_ARTIFACT_BYTES};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Characters of item text quoted in failure reports.
const SNIPPET_CHARS: usize = 40;

/// One input row: its position in the batch and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    pub index: usize,
    pub text: String,
}

impl TextItem {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Numbers rows in order.
    pub fn sequence<I, S>(rows: I) -> Vec<TextItem>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        rows.into_iter()
            .enumerate()
            .map(|(index, text)| TextItem::new(index, text))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    pub percentage: f64,
}

impl ProgressEvent {
    pub fn at(current: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            current as f64 / total as f64 * 100.0
        };
        Self {
            current,
            total,
            percentage,
        }
    }

    pub fn finished(total: usize) -> Self {
        Self {
            current: total,
            total,
            percentage: 100.0,
        }
    }
}

/// Receives progress while a batch runs.
pub trait ProgressSink {
    fn report(&self, event: ProgressEvent);
}

impl<F: Fn(ProgressEvent)> ProgressSink for F {
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink for callers that don't care about progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Cooperative cancellation, checked between items.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyInput,
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyInput => write!(f, "empty input"),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug)]
pub enum ItemOutcome<E> {
    Success(PathBuf),
    Skipped(SkipReason),
    Failed { error: E, attempts: u32 },
}

#[derive(Debug)]
pub struct ItemReport<E> {
    pub index: usize,
    /// What the item was about: a text snippet or a file name.
    pub label: String,
    pub outcome: ItemOutcome<E>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Synthesis,
    Rename,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Synthesis => write!(f, "synthesis"),
            BatchKind::Rename => write!(f, "rename"),
        }
    }
}

/// Every item's outcome, in input order.
#[derive(Debug)]
pub struct BatchResult<E> {
    pub kind: BatchKind,
    pub items: Vec<ItemReport<E>>,
}

impl<E: fmt::Display> BatchResult<E> {
    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn successes(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Success(_)))
    }

    pub fn skips(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped(_)))
    }

    pub fn failures(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }

    fn count(&self, pred: impl Fn(&ItemOutcome<E>) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }

    /// One line per failed item.
    pub fn failure_lines(&self) -> Vec<String> {
        let total = self.total();
        self.items
            .iter()
            .filter_map(|item| match &item.outcome {
                ItemOutcome::Failed { error, attempts: 0 } => Some(format!(
                    "#{}/{} ({}) rejected: {}",
                    item.index + 1,
                    total,
                    item.label,
                    error
                )),
                ItemOutcome::Failed { error, attempts } => Some(format!(
                    "#{}/{} ({}) after {} attempt(s): {}",
                    item.index + 1,
                    total,
                    item.label,
                    attempts,
                    error
                )),
                _ => None,
            })
            .collect()
    }

    /// Consolidated multi-line report, `None` when nothing failed.
    pub fn failure_report(&self) -> Option<String> {
        let lines = self.failure_lines();
        if lines.is_empty() {
            return None;
        }
        Some(format!(
            "{} of {} {} item(s) failed:\n{}",
            lines.len(),
            self.total(),
            self.kind,
            lines.join("\n")
        ))
    }
}

pub(crate) fn snippet(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= SNIPPET_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(SNIPPET_CHARS).collect();
        format!("{}…", head)
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Attempts per item; values below 1 are treated as 1.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub min_artifact_bytes: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::ZERO,
            min_artifact_bytes: MIN_ARTIFACT_BYTES,
        }
    }
}

impl BatchOptions {
    pub fn from_settings(settings: &crate::config_loader::Settings) -> Self {
        Self {
            max_retries: settings.max_retries,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            min_artifact_bytes: settings.min_artifact_bytes,
        }
    }
}

pub struct BatchRunner {
    synthesizer: Synthesizer,
    options: BatchOptions,
}

impl BatchRunner {
    pub fn new(engine: Arc<dyn SpeechEngine>, options: BatchOptions) -> Self {
        Self {
            synthesizer: Synthesizer::new(engine),
            options,
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Runs the whole batch. Per-item failures are collected in the result;
    /// only a missing engine or an unusable output directory abort the run.
    pub fn run_batch(
        &self,
        items: &[TextItem],
        output_dir: &Path,
        config: &SynthesisConfig,
        progress: &dyn ProgressSink,
        cancel: Option<&CancelToken>,
    ) -> Result<BatchResult<SynthesisError>, BatchError> {
        let engine = self.synthesizer.engine();
        let located = engine.locate().map_err(|e| {
            log::error!("Batch: engine {} not found: {}", engine.id(), e);
            BatchError::EngineNotFound {
                program: engine.id().to_string(),
                reason: e.to_string(),
            }
        })?;
        std::fs::create_dir_all(output_dir).map_err(|source| {
            log::error!("Batch: cannot create {}: {}", output_dir.display(), source);
            BatchError::OutputDir {
                path: output_dir.to_path_buf(),
                source,
            }
        })?;
        log::info!(
            "Batch: synthesizing {} item(s) into {} with {}",
            items.len(),
            output_dir.display(),
            located.display()
        );

        let total = items.len();
        let mut reports = Vec::with_capacity(total);

        for (position, item) in items.iter().enumerate() {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                reports.push(ItemReport {
                    index: item.index,
                    label: snippet(&item.text),
                    outcome: ItemOutcome::Skipped(SkipReason::Cancelled),
                });
                continue;
            }

            progress.report(ProgressEvent::at(position, total));

            let outcome = self.run_item(item, total, output_dir, config)?;
            reports.push(ItemReport {
                index: item.index,
                label: snippet(&item.text),
                outcome,
            });
        }

        progress.report(ProgressEvent::finished(total));

        let result = BatchResult {
            kind: BatchKind::Synthesis,
            items: reports,
        };
        log::info!(
            "Batch: finished, {} succeeded, {} skipped, {} failed",
            result.successes(),
            result.skips(),
            result.failures()
        );
        Ok(result)
    }

    fn run_item(
        &self,
        item: &TextItem,
        total: usize,
        output_dir: &Path,
        config: &SynthesisConfig,
    ) -> Result<ItemOutcome<SynthesisError>, BatchError> {
        if item.text.trim().is_empty() {
            log::debug!("Batch: item {} is empty, skipping", item.index + 1);
            return Ok(ItemOutcome::Skipped(SkipReason::EmptyInput));
        }

        let request = match validate(config, &item.text) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Batch: item {} rejected: {}", item.index + 1, e);
                return Ok(ItemOutcome::Failed {
                    error: e.into(),
                    attempts: 0,
                });
            }
        };

        let max_attempts = self.options.max_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .synthesizer
                .invoke(&request, output_dir)
                .and_then(|path| {
                    verify(&path, self.options.min_artifact_bytes).map_err(SynthesisError::from)
                });

            let error = match result {
                Ok(verified) => {
                    log::info!(
                        "Batch: item {}/{} written to {} ({} bytes)",
                        item.index + 1,
                        total,
                        verified.path.display(),
                        verified.size
                    );
                    return Ok(ItemOutcome::Success(verified.path));
                }
                Err(SynthesisError::OutputDir { path, source }) => {
                    log::error!("Batch: cannot create {}: {}", path.display(), source);
                    return Err(BatchError::OutputDir { path, source });
                }
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                log::warn!(
                    "Batch: item {}/{} failed after {} attempt(s): {}",
                    item.index + 1,
                    total,
                    attempt,
                    error
                );
                if let Some(raw) = error.raw_output() {
                    log::debug!("Batch: engine output: {}", raw.trim());
                }
                return Ok(ItemOutcome::Failed {
                    error,
                    attempts: attempt,
                });
            }

            log::warn!(
                "Batch: item {}/{} attempt {}/{} failed, retrying: {}",
                item.index + 1,
                total,
                attempt,
                max_attempts,
                error
            );
            if !self.options.retry_delay.is_zero() {
                thread::sleep(self.options.retry_delay);
            }
        }
    }
}

/// A batch running on its own thread.
pub struct BatchHandle {
    pub progress: Receiver<ProgressEvent>,
    handle: JoinHandle<Result<BatchResult<SynthesisError>, BatchError>>,
}

impl BatchHandle {
    pub fn join(self) -> Result<BatchResult<SynthesisError>, BatchError> {
        self.handle.join().map_err(|_| BatchError::WorkerPanicked)?
    }
}

/// Starts `run_batch` on a background thread. Progress arrives on the
/// handle's channel; the channel closes once the batch is done.
pub fn spawn_batch(
    runner: Arc<BatchRunner>,
    items: Vec<TextItem>,
    output_dir: PathBuf,
    config: SynthesisConfig,
    cancel: Option<CancelToken>,
) -> BatchHandle {
    let (tx, rx) = channel::<ProgressEvent>();

    let handle = thread::spawn(move || {
        let sink = move |event: ProgressEvent| {
            let _ = tx.send(event);
        };
        runner.run_batch(&items, &output_dir, &config, &sink, cancel.as_ref())
    });

    BatchHandle {
        progress: rx,
        handle,
    }
}
