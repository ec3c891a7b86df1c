/// Diagnostic log and metrics for file name translation attempts
use crate::ai::TranslationError;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

const APP_DIR_NAME: &str = "filename-translator";

/// Outcome of a single translation attempt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Translated,
    /// Name was kept as-is without contacting the service
    Skipped,
    Failed,
}

/// Log entry for one translation attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationLogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<Uuid>,
    pub original_name: String,
    pub status: AttemptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl TranslationLogEntry {
    fn base(batch_id: Option<Uuid>, original_name: &str, status: AttemptStatus, elapsed: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            batch_id,
            original_name: original_name.to_string(),
            status,
            translated_name: None,
            error_kind: None,
            error: None,
            elapsed_ms: crate::ai::duration_millis(elapsed),
        }
    }

    pub fn translated(
        batch_id: Option<Uuid>,
        original_name: &str,
        translated_name: &str,
        elapsed: Duration,
    ) -> Self {
        Self {
            translated_name: Some(translated_name.to_string()),
            ..Self::base(batch_id, original_name, AttemptStatus::Translated, elapsed)
        }
    }

    pub fn skipped(batch_id: Option<Uuid>, original_name: &str) -> Self {
        Self {
            translated_name: Some(original_name.to_string()),
            ..Self::base(batch_id, original_name, AttemptStatus::Skipped, Duration::ZERO)
        }
    }

    pub fn failed(
        batch_id: Option<Uuid>,
        original_name: &str,
        error: &TranslationError,
        elapsed: Duration,
    ) -> Self {
        Self {
            error_kind: Some(error.kind().to_string()),
            error: Some(error.to_string()),
            ..Self::base(batch_id, original_name, AttemptStatus::Failed, elapsed)
        }
    }
}

/// Counters over every attempt seen by a logger
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TranslationMetrics {
    pub total_attempts: u64,
    pub translated: u64,
    pub skipped: u64,
    pub failed: u64,
    pub timeouts: u64,
    pub cancelled: u64,
    pub by_error_kind: HashMap<String, u64>,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: &TranslationLogEntry) {
        self.total_attempts += 1;
        match entry.status {
            AttemptStatus::Translated => self.translated += 1,
            AttemptStatus::Skipped => self.skipped += 1,
            AttemptStatus::Failed => {
                self.failed += 1;
                if let Some(kind) = entry.error_kind.as_deref() {
                    match kind {
                        "timeout" => self.timeouts += 1,
                        "cancelled" => self.cancelled += 1,
                        _ => {}
                    }
                    *self.by_error_kind.entry(kind.to_string()).or_insert(0) += 1;
                }
            }
        }
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.failed as f64 / self.total_attempts as f64
        }
    }
}

/// Append-only JSONL sink for translation attempts
pub struct TranslationLogger {
    log_file: Mutex<Option<BufWriter<File>>>,
    log_path: Mutex<Option<PathBuf>>,
    metrics: Mutex<TranslationMetrics>,
}

impl TranslationLogger {
    pub fn new() -> Self {
        Self {
            log_file: Mutex::new(None),
            log_path: Mutex::new(None),
            metrics: Mutex::new(TranslationMetrics::new()),
        }
    }

    /// Initialize logging to a file, replacing any previously opened one
    pub fn init_file_logging<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create log directory: {}", e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| format!("Failed to open log file: {}", e))?;

        if let Ok(mut guard) = self.log_file.lock() {
            *guard = Some(BufWriter::new(file));
        }
        if let Ok(mut guard) = self.log_path.lock() {
            *guard = Some(path.to_path_buf());
        }

        info!("translation log file: {}", path.display());
        Ok(())
    }

    /// Record one attempt
    pub fn record(&self, entry: TranslationLogEntry) {
        match entry.status {
            AttemptStatus::Failed => warn!(
                "translation failed for '{}': {}",
                entry.original_name,
                entry.error.as_deref().unwrap_or("unknown error")
            ),
            _ => info!(
                "translated '{}' -> '{}'",
                entry.original_name,
                entry.translated_name.as_deref().unwrap_or_default()
            ),
        }

        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(writer) = guard.as_mut() {
                if let Ok(json) = serde_json::to_string(&entry) {
                    let _ = writeln!(writer, "{}", json);
                    let _ = writer.flush();
                }
            }
        }

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.record(&entry);
        }
    }

    /// Path of the file currently receiving entries, if any
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_path.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn get_metrics(&self) -> TranslationMetrics {
        self.metrics
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn reset_metrics(&self) {
        if let Ok(mut guard) = self.metrics.lock() {
            *guard = TranslationMetrics::new();
        }
    }

    pub fn export_metrics_json(&self) -> Result<String, String> {
        let metrics = self.get_metrics();
        serde_json::to_string_pretty(&metrics)
            .map_err(|e| format!("Failed to serialize metrics: {}", e))
    }
}

impl Default for TranslationLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Global translation logger instance
static TRANSLATION_LOGGER: once_cell::sync::Lazy<TranslationLogger> =
    once_cell::sync::Lazy::new(TranslationLogger::new);

pub fn translation_logger() -> &'static TranslationLogger {
    &TRANSLATION_LOGGER
}

/// Initialize file logging for the global logger
pub fn init_translation_logging<P: AsRef<Path>>(path: P) -> Result<(), String> {
    translation_logger().init_file_logging(path)
}

/// Directory that holds the daily log files
pub fn log_dir(override_dir: Option<&Path>) -> PathBuf {
    match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR_NAME)
            .join("logs"),
    }
}

/// Log file path for the current day
pub fn get_translation_log_path(override_dir: Option<&Path>) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d");
    log_dir(override_dir).join(format!("translation-{}.jsonl", timestamp))
}

/// Path of the current diagnostic file, for showing to the user
pub fn current_log_file_path() -> PathBuf {
    translation_logger()
        .log_path()
        .unwrap_or_else(|| get_translation_log_path(None))
}

/// Reveal the folder holding the current diagnostic file
pub fn open_log_folder() -> Result<(), String> {
    let path = current_log_file_path();
    let folder = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&folder).map_err(|e| format!("Failed to create log folder: {}", e))?;

    let folder = dunce::canonicalize(&folder).unwrap_or(folder);
    open::that_detached(&folder).map_err(|e| format!("Failed to open log folder: {}", e))
}
