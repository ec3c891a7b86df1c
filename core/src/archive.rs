//! ZIP 아카이브 생성 모듈
//!
//! 번역된 이름(실패 시 원래 이름)으로 원본 파일들을 하나의 ZIP 파일에 담습니다.
//! 하나라도 읽을 수 없는 원본이 있으면 전체 작업이 실패하며, 대상 경로에는
//! 불완전한 아카이브가 남지 않습니다.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zip::read::ZipArchive;
use zip::write::{FileOptions, ZipWriter};

use crate::batch::TranslatedFile;
use crate::config::ArchiveCompression;
use crate::name::{numbered_variant, sanitize_entry_name};

/// 아카이브 처리 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Source file is unreadable: {source_path} ({reason})")]
    SourceUnreadable { source_path: String, reason: String },

    #[error("Failed to write archive: {cause}")]
    WriteFailed { cause: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),
}

impl ArchiveError {
    fn unreadable(source_path: &str, reason: impl ToString) -> Self {
        ArchiveError::SourceUnreadable {
            source_path: source_path.to_string(),
            reason: reason.to_string(),
        }
    }

    fn write_failed(cause: impl ToString) -> Self {
        ArchiveError::WriteFailed {
            cause: cause.to_string(),
        }
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// 아카이브에 담을 원본 파일과 엔트리 이름
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub source_path: String,
    pub entry_name: String,
}

impl ArchiveEntry {
    pub fn new(source_path: impl Into<String>, entry_name: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            entry_name: entry_name.into(),
        }
    }

    /// 번역 결과 목록을 순서대로 엔트리로 변환 (실패한 항목은 원래 이름 사용)
    pub fn from_results(results: &[TranslatedFile]) -> Vec<Self> {
        results.iter().map(Self::from).collect()
    }
}

impl From<&TranslatedFile> for ArchiveEntry {
    fn from(file: &TranslatedFile) -> Self {
        Self::new(file.full_path.clone(), file.output_name())
    }
}

/// 실제로 기록된 엔트리 정보
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenEntry {
    pub source_path: String,
    pub entry_name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSummary {
    pub destination: PathBuf,
    pub entries: Vec<WrittenEntry>,
}

/// 아카이브 내부 파일 정보
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedFile {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
}

/// 아카이브 파일인지 확인
pub fn is_archive_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// `.zip` 확장자가 없으면 붙여서 반환
pub fn ensure_zip_extension(path: &Path) -> PathBuf {
    if is_archive_file(path) {
        return path.to_path_buf();
    }

    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".zip");
    path.with_file_name(name)
}

/// 엔트리 이름 정리 및 중복 해소
///
/// 경로 구분자와 제어 문자를 치환한 뒤, 같은 이름(대소문자 무시)이 다시 나오면
/// 두 번째부터 `name(1).ext`, `name(2).ext` 형태로 바꿉니다. 입력에 이미 존재하는
/// 이름과는 겹치지 않도록 번호를 건너뜁니다.
pub fn resolve_entry_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let sanitized: Vec<String> = names.into_iter().map(sanitize_entry_name).collect();
    let reserved: HashSet<String> = sanitized.iter().map(|name| name.to_lowercase()).collect();
    let mut used: HashSet<String> = HashSet::with_capacity(sanitized.len());
    let mut resolved = Vec::with_capacity(sanitized.len());

    for name in sanitized {
        if used.insert(name.to_lowercase()) {
            resolved.push(name);
            continue;
        }

        let mut counter = 1;
        loop {
            let candidate = numbered_variant(&name, counter);
            let key = candidate.to_lowercase();
            if !reserved.contains(&key) && !used.contains(&key) {
                used.insert(key);
                resolved.push(candidate);
                break;
            }
            counter += 1;
        }
    }

    resolved
}

/// 엔트리 목록으로 ZIP 아카이브 생성
///
/// 모든 원본을 먼저 확인한 뒤 임시 파일에 기록하고, 성공했을 때만 대상 경로로
/// 옮깁니다. 실패하면 임시 파일을 지우고 기존 대상 파일은 건드리지 않습니다.
pub fn build_archive(
    entries: &[ArchiveEntry],
    destination: &Path,
    compression: ArchiveCompression,
) -> ArchiveResult<ArchiveSummary> {
    for entry in entries {
        check_source(&entry.source_path)?;
    }

    let names = resolve_entry_names(entries.iter().map(|entry| entry.entry_name.as_str()));

    if let Some(parent) = destination.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(ArchiveError::write_failed)?;
    }

    let temp_path = build_temp_path(destination);
    let written = match write_archive(&temp_path, entries, &names, compression) {
        Ok(written) => written,
        Err(err) => {
            discard(&temp_path);
            return Err(err);
        }
    };

    if let Err(err) = replace_file(&temp_path, destination) {
        discard(&temp_path);
        return Err(ArchiveError::write_failed(err));
    }

    debug!(
        "archive written to {} ({} entries)",
        destination.display(),
        written.len()
    );

    Ok(ArchiveSummary {
        destination: destination.to_path_buf(),
        entries: written,
    })
}

fn check_source(source_path: &str) -> ArchiveResult<()> {
    let metadata =
        fs::metadata(source_path).map_err(|err| ArchiveError::unreadable(source_path, err))?;
    if !metadata.is_file() {
        return Err(ArchiveError::unreadable(source_path, "not a regular file"));
    }
    File::open(source_path).map_err(|err| ArchiveError::unreadable(source_path, err))?;
    Ok(())
}

fn write_archive(
    path: &Path,
    entries: &[ArchiveEntry],
    names: &[String],
    compression: ArchiveCompression,
) -> ArchiveResult<Vec<WrittenEntry>> {
    let file = File::create(path).map_err(ArchiveError::write_failed)?;
    let mut writer = ZipWriter::new(file);

    let options = FileOptions::<()>::default()
        .compression_method(compression.method())
        .unix_permissions(0o644);

    let mut written = Vec::with_capacity(entries.len());
    for (entry, name) in entries.iter().zip(names) {
        let mut content = Vec::new();
        File::open(&entry.source_path)
            .and_then(|mut source| source.read_to_end(&mut content))
            .map_err(|err| ArchiveError::unreadable(&entry.source_path, err))?;

        let size = content.len() as u64;
        writer
            .start_file(name.as_str(), options.clone().large_file(size >= u64::from(u32::MAX)))
            .map_err(ArchiveError::write_failed)?;
        writer
            .write_all(&content)
            .map_err(ArchiveError::write_failed)?;

        written.push(WrittenEntry {
            source_path: entry.source_path.clone(),
            entry_name: name.clone(),
            size,
        });
    }

    let file = writer.finish().map_err(ArchiveError::write_failed)?;
    file.sync_all().map_err(ArchiveError::write_failed)?;
    Ok(written)
}

fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(target_os = "windows")]
    {
        if let Err(err) = fs::rename(from, to) {
            if to.exists() {
                fs::remove_file(to)?;
                return fs::rename(from, to);
            }
            return Err(err);
        }
        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    {
        fs::rename(from, to)
    }
}

fn discard(path: &Path) {
    if path.exists() {
        if let Err(err) = fs::remove_file(path) {
            warn!(
                "failed to remove partial archive {}: {}",
                path.display(),
                err
            );
        }
    }
}

fn build_temp_path(target: &Path) -> PathBuf {
    let mut temp = target.to_path_buf();
    let suffix = format!(".partial-{}", Uuid::new_v4().simple());
    match temp.file_name() {
        Some(name) => {
            let mut os_string = name.to_os_string();
            os_string.push(suffix);
            temp.set_file_name(os_string);
        }
        None => {
            temp.push(format!("archive{suffix}"));
        }
    }
    temp
}

/// 아카이브 엔트리 목록 조회
pub fn list_archive_entries(archive_path: &Path) -> ArchiveResult<Vec<ArchivedFile>> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut files = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        files.push(ArchivedFile {
            name: entry.name().to_string(),
            size: entry.size(),
            compressed_size: entry.compressed_size(),
        });
    }

    Ok(files)
}

/// 아카이브에서 특정 파일 내용 읽기
pub fn read_archive_entry(archive_path: &Path, entry_name: &str) -> ArchiveResult<Vec<u8>> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut entry = archive
        .by_name(entry_name)
        .map_err(|_| ArchiveError::EntryNotFound(entry_name.to_string()))?;

    // 헤더의 크기 값은 신뢰하지 않음
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents)?;

    Ok(contents)
}
