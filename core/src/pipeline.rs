//! Wires the pieces together: paths -> batch translation -> archive entries -> archive.

use crate::ai::{TranslationError, Translator};
use crate::archive::{
    build_archive, ensure_zip_extension, ArchiveEntry, ArchiveError, ArchiveSummary,
};
use crate::batch::{BatchProgress, BatchSummary, BatchTranslator, InputFile, TranslatedFile};
use crate::config::{load_env_file, mask_api_key, TranslatorConfig};
use crate::jobs::{register_batch, BatchRegistration};
use crate::translation_logger::{get_translation_log_path, init_translation_logging};
use log::{info, warn};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Translator(#[from] TranslationError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub files: Vec<TranslatedFile>,
    pub summary: BatchSummary,
}

pub struct Pipeline {
    config: TranslatorConfig,
    batch: BatchTranslator,
}

impl Pipeline {
    /// Build the configured provider client and start the diagnostic log.
    pub fn from_config(config: TranslatorConfig) -> Result<Self, PipelineError> {
        if config.logging.jsonl_logging {
            let path = get_translation_log_path(config.logging.log_dir.as_deref());
            if let Err(err) = init_translation_logging(&path) {
                warn!("translation log disabled: {}", err);
            }
        }

        match load_env_file(config.provider.env_file.as_deref()) {
            Ok(path) => info!("loaded environment from {}", path.display()),
            Err(err) => warn!("no .env file loaded: {}", err),
        }

        let settings = config.provider.settings();
        match settings.api_key.as_deref() {
            Some(key) => info!(
                "{} provider configured, key {}",
                config.provider.kind.label(),
                mask_api_key(key)
            ),
            None => warn!(
                "no API key found in config or ${}",
                config.provider.api_key_env
            ),
        }

        let translator = config.provider.kind.build(settings)?;
        Ok(Self::with_translator(config, translator))
    }

    pub fn with_translator(config: TranslatorConfig, translator: Arc<dyn Translator>) -> Self {
        let batch = BatchTranslator::new(
            translator,
            config.batch.clone(),
            config.provider.request_timeout(),
        );
        Self { config, batch }
    }

    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<BatchProgress>) -> Self {
        self.batch = self.batch.with_progress(sender);
        self
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Register a batch so it can be cancelled through [`crate::cancel_batch`].
    pub fn start_batch(&self) -> BatchRegistration {
        register_batch()
    }

    pub async fn translate_paths<I, S>(&self, paths: I) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registration = self.start_batch();
        self.translate_registered(&registration, &InputFile::from_paths(paths))
            .await
    }

    pub async fn translate_registered(
        &self,
        registration: &BatchRegistration,
        inputs: &[InputFile],
    ) -> BatchReport {
        let files = self
            .batch
            .translate_batch_cancellable(registration.id(), inputs, registration.token())
            .await;
        let summary = BatchSummary::of(&files);
        info!(
            "batch {}: {}/{} translated",
            registration.id(),
            summary.translated,
            summary.total
        );
        BatchReport {
            batch_id: registration.id(),
            files,
            summary,
        }
    }

    pub fn archive_entries(files: &[TranslatedFile]) -> Vec<ArchiveEntry> {
        ArchiveEntry::from_results(files)
    }

    /// Write the renamed files into a `.zip` at `destination` on a blocking thread.
    pub async fn export_archive(
        &self,
        files: &[TranslatedFile],
        destination: &Path,
    ) -> Result<ArchiveSummary, PipelineError> {
        let entries = Self::archive_entries(files);
        let destination = ensure_zip_extension(destination);
        let compression = self.config.archive.compression;

        let summary = tokio::task::spawn_blocking(move || {
            build_archive(&entries, &destination, compression)
        })
        .await
        .map_err(|err| ArchiveError::WriteFailed {
            cause: err.to_string(),
        })??;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::read_archive_entry;
    use crate::jobs::{cancel_batch, is_batch_active};
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::tempdir;

    struct Upper;

    #[async_trait]
    impl Translator for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        async fn translate(&self, name: &str) -> Result<String, TranslationError> {
            Ok(name.to_uppercase())
        }
    }

    struct Stuck;

    #[async_trait]
    impl Translator for Stuck {
        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn translate(&self, _name: &str) -> Result<String, TranslationError> {
            std::future::pending().await
        }
    }

    #[test]
    fn from_config_requires_api_key() {
        let mut config = TranslatorConfig::default();
        config.logging.jsonl_logging = false;
        config.provider.api_key_env = "FILENAME_TRANSLATOR_PIPELINE_UNSET".into();
        assert!(matches!(
            Pipeline::from_config(config),
            Err(PipelineError::Translator(TranslationError::NotConfigured { .. }))
        ));
    }

    #[tokio::test]
    async fn translate_and_export() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("note.txt");
        std::fs::write(&source, b"hello").unwrap();

        let pipeline = Pipeline::with_translator(TranslatorConfig::default(), Arc::new(Upper));
        let report = pipeline
            .translate_paths([source.to_string_lossy().to_string()])
            .await;
        assert_eq!(report.summary.translated, 1);
        assert!(!is_batch_active(report.batch_id));

        let summary = pipeline
            .export_archive(&report.files, &dir.path().join("renamed"))
            .await
            .unwrap();
        assert_eq!(summary.destination, dir.path().join("renamed.zip"));
        assert_eq!(
            read_archive_entry(&summary.destination, "NOTE.TXT").unwrap(),
            b"hello"
        );
    }

    #[tokio::test]
    async fn registered_batch_can_be_cancelled_by_id() {
        let mut config = TranslatorConfig::default();
        config.provider.request_timeout_secs = 60;
        let pipeline = Pipeline::with_translator(config, Arc::new(Stuck));
        let registration = pipeline.start_batch();
        let id = registration.id();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(cancel_batch(id));
        });

        let report = pipeline
            .translate_registered(&registration, &InputFile::from_paths(["a/猫.png"]))
            .await;
        assert_eq!(report.summary.failed, 1);
        assert_eq!(
            report.files[0].outcome.failure(),
            Some(&TranslationError::Cancelled)
        );
    }

    #[tokio::test]
    async fn export_failure_surfaces_archive_error() {
        let dir = tempdir().unwrap();
        let pipeline = Pipeline::with_translator(TranslatorConfig::default(), Arc::new(Upper));
        let report = pipeline
            .translate_paths([dir.path().join("gone.txt").to_string_lossy().to_string()])
            .await;

        let err = pipeline
            .export_archive(&report.files, &dir.path().join("out.zip"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Archive(ArchiveError::SourceUnreadable { .. })
        ));
        assert!(!dir.path().join("out.zip").exists());
    }
}
