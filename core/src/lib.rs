pub mod ai;
pub mod archive;
pub mod batch;
pub mod config;
pub mod jobs;
pub mod name;
pub mod pipeline;
pub mod staging;
pub mod translation_logger;

pub use ai::{ProviderKind, ProviderSettings, TranslationError, Translator};
pub use archive::{
    build_archive, read_archive_entry, resolve_entry_names, ArchiveEntry, ArchiveError,
    ArchiveResult, ArchiveSummary,
};
pub use batch::{
    BatchProgress, BatchSummary, BatchTranslator, InputFile, TranslatedFile, TranslationOutcome,
};
pub use config::{ArchiveCompression, BatchOptions, ConfigError, TranslatorConfig};
pub use jobs::{cancel_batch, register_batch, BatchRegistration};
pub use name::extract_name;
pub use pipeline::{BatchReport, Pipeline, PipelineError};
pub use staging::{stage_temp_file, staging_dir, StagingError};
pub use translation_logger::{
    current_log_file_path, get_translation_log_path, init_translation_logging, open_log_folder,
    translation_logger, TranslationLogEntry, TranslationLogger, TranslationMetrics,
};
