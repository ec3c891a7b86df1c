//! Concurrent per-file translation of a list of paths.
//!
//! Every input resolves to exactly one [`TranslatedFile`], in input order. A failed,
//! timed-out or cancelled request only affects its own slot; the batch itself never fails.

use crate::ai::{TranslationError, Translator};
use crate::config::BatchOptions;
use crate::name::{extract_name, is_english_name, join_extension, split_extension};
use crate::translation_logger::{translation_logger, TranslationLogEntry, TranslationLogger};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A path accepted into a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFile {
    full_path: String,
    display_name: String,
}

impl InputFile {
    pub fn new(full_path: impl Into<String>) -> Self {
        let full_path = full_path.into();
        let display_name = extract_name(&full_path).to_string();
        Self {
            full_path,
            display_name,
        }
    }

    pub fn from_paths<I, S>(paths: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paths.into_iter().map(Self::new).collect()
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranslationOutcome {
    Translated { name: String },
    Failed { reason: TranslationError },
}

impl TranslationOutcome {
    pub fn translated_name(&self) -> Option<&str> {
        match self {
            TranslationOutcome::Translated { name } => Some(name),
            TranslationOutcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&TranslationError> {
        match self {
            TranslationOutcome::Translated { .. } => None,
            TranslationOutcome::Failed { reason } => Some(reason),
        }
    }
}

impl From<Result<String, TranslationError>> for TranslationOutcome {
    fn from(result: Result<String, TranslationError>) -> Self {
        match result {
            Ok(name) => TranslationOutcome::Translated { name },
            Err(reason) => TranslationOutcome::Failed { reason },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedFile {
    pub original_name: String,
    pub full_path: String,
    pub outcome: TranslationOutcome,
}

impl TranslatedFile {
    pub fn is_translated(&self) -> bool {
        matches!(self.outcome, TranslationOutcome::Translated { .. })
    }

    /// Name used when archiving; failed translations keep the original name.
    pub fn output_name(&self) -> &str {
        self.outcome
            .translated_name()
            .unwrap_or(&self.original_name)
    }

    /// Text for a result row, marking failures inline.
    pub fn display_label(&self) -> String {
        match &self.outcome {
            TranslationOutcome::Translated { name } => format!("{} -> {}", self.original_name, name),
            TranslationOutcome::Failed { .. } => {
                format!("{} (translation failed)", self.original_name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub translated: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn of(results: &[TranslatedFile]) -> Self {
        let translated = results.iter().filter(|file| file.is_translated()).count();
        Self {
            total: results.len(),
            translated,
            failed: results.len() - translated,
        }
    }
}

/// Sent after each file of a batch resolves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub batch_id: Uuid,
    pub total: usize,
    pub done: usize,
    pub file: String,
    pub success: bool,
}

pub struct BatchTranslator {
    translator: Arc<dyn Translator>,
    options: BatchOptions,
    request_timeout: Duration,
    logger: Option<Arc<TranslationLogger>>,
    progress: Option<mpsc::UnboundedSender<BatchProgress>>,
}

impl BatchTranslator {
    pub fn new(translator: Arc<dyn Translator>, options: BatchOptions, request_timeout: Duration) -> Self {
        Self {
            translator,
            options,
            request_timeout,
            logger: None,
            progress: None,
        }
    }

    /// Record attempts into `logger` instead of the global one.
    pub fn with_logger(mut self, logger: Arc<TranslationLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<BatchProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub async fn translate_batch(&self, inputs: &[InputFile]) -> Vec<TranslatedFile> {
        self.translate_batch_cancellable(Uuid::new_v4(), inputs, CancellationToken::new())
            .await
    }

    /// Translate every input concurrently. Once `cancel` fires no new request starts,
    /// and requests still pending resolve as [`TranslationError::Cancelled`].
    pub async fn translate_batch_cancellable(
        &self,
        batch_id: Uuid,
        inputs: &[InputFile],
        cancel: CancellationToken,
    ) -> Vec<TranslatedFile> {
        if inputs.is_empty() {
            return Vec::new();
        }

        debug!(
            "batch {} started: {} files via {}",
            batch_id,
            inputs.len(),
            self.translator.name()
        );

        let context = Arc::new(TaskContext {
            translator: Arc::clone(&self.translator),
            keep_extension: self.options.keep_extension,
            skip_english_names: self.options.skip_english_names,
            request_timeout: self.request_timeout,
            logger: self.logger.clone(),
            progress: self.progress.clone(),
            batch_id,
            cancel,
            permits: Semaphore::new(self.options.max_concurrency.max(1)),
            total: inputs.len(),
            done: AtomicUsize::new(0),
        });

        // One task per slot; awaiting the handles in order keeps input order.
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| {
                let context = Arc::clone(&context);
                let name = input.display_name().to_string();
                tokio::spawn(async move { context.resolve(&name).await })
            })
            .collect();

        let mut results = Vec::with_capacity(inputs.len());
        for (input, handle) in inputs.iter().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    warn!(
                        "translation task for '{}' did not finish: {}",
                        input.display_name(),
                        join_err
                    );
                    let reason = TranslationError::Internal {
                        message: join_err.to_string(),
                    };
                    context.finish(input.display_name(), Err(reason), Duration::ZERO)
                }
            };

            results.push(TranslatedFile {
                original_name: input.display_name().to_string(),
                full_path: input.full_path().to_string(),
                outcome,
            });
        }

        let summary = BatchSummary::of(&results);
        debug!(
            "batch {} finished: {} translated, {} failed",
            batch_id, summary.translated, summary.failed
        );
        results
    }
}

struct TaskContext {
    translator: Arc<dyn Translator>,
    keep_extension: bool,
    skip_english_names: bool,
    request_timeout: Duration,
    logger: Option<Arc<TranslationLogger>>,
    progress: Option<mpsc::UnboundedSender<BatchProgress>>,
    batch_id: Uuid,
    cancel: CancellationToken,
    permits: Semaphore,
    total: usize,
    done: AtomicUsize,
}

impl TaskContext {
    async fn resolve(&self, name: &str) -> TranslationOutcome {
        if name.is_empty() {
            return self.finish(name, Err(TranslationError::EmptyName), Duration::ZERO);
        }

        if self.skip_english_names && is_english_name(name) {
            self.record(TranslationLogEntry::skipped(Some(self.batch_id), name));
            self.notify(name, true);
            return TranslationOutcome::Translated {
                name: name.to_string(),
            };
        }

        if self.cancel.is_cancelled() {
            return self.finish(name, Err(TranslationError::Cancelled), Duration::ZERO);
        }

        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return self.finish(name, Err(TranslationError::Cancelled), Duration::ZERO);
            }
            permit = self.permits.acquire() => match permit {
                Ok(permit) => permit,
                Err(err) => {
                    let reason = TranslationError::Internal { message: err.to_string() };
                    return self.finish(name, Err(reason), Duration::ZERO);
                }
            },
        };

        let (request, extension) = if self.keep_extension {
            split_extension(name)
        } else {
            (name, None)
        };

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TranslationError::Cancelled),
            response = tokio::time::timeout(self.request_timeout, self.translator.translate(request)) => {
                match response {
                    Ok(result) => result,
                    Err(_) => Err(TranslationError::timeout(self.request_timeout)),
                }
            }
        };

        let result = result.map(|translated| match extension {
            Some(_) => join_extension(&translated, extension),
            None => translated,
        });

        self.finish(name, result, started.elapsed())
    }

    fn finish(
        &self,
        name: &str,
        result: Result<String, TranslationError>,
        elapsed: Duration,
    ) -> TranslationOutcome {
        let entry = match &result {
            Ok(translated) => {
                TranslationLogEntry::translated(Some(self.batch_id), name, translated, elapsed)
            }
            Err(error) => TranslationLogEntry::failed(Some(self.batch_id), name, error, elapsed),
        };
        self.record(entry);
        self.notify(name, result.is_ok());
        result.into()
    }

    fn record(&self, entry: TranslationLogEntry) {
        match &self.logger {
            Some(logger) => logger.record(entry),
            None => translation_logger().record(entry),
        }
    }

    fn notify(&self, name: &str, success: bool) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(sender) = &self.progress {
            let _ = sender.send(BatchProgress {
                batch_id: self.batch_id,
                total: self.total,
                done,
                file: name.to_string(),
                success,
            });
        }
    }
}
