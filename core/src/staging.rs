//! 드래그 앤 드롭으로 받은 파일 내용을 임시 디렉터리에 저장
//!
//! 실제 경로가 없는 입력도 번역/아카이브 파이프라인에 넣을 수 있도록
//! 임시 파일을 만들고 그 경로를 돌려줍니다.

use std::fs;
use std::io;
use std::path::PathBuf;

use uuid::Uuid;

use crate::name::{extract_name, sanitize_entry_name};

const STAGING_DIR_NAME: &str = "filename-translator";

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("파일 이름이 비어 있습니다.")]
    EmptyName,
}

/// 임시 파일들이 저장되는 기본 디렉터리
pub fn staging_dir() -> PathBuf {
    std::env::temp_dir().join(STAGING_DIR_NAME)
}

/// 내용을 임시 파일로 저장하고 전체 경로를 반환
///
/// 같은 이름이 여러 번 들어와도 덮어쓰지 않도록 호출마다 별도 하위 디렉터리를 씁니다.
/// 전달된 이름에 경로가 섞여 있어도 마지막 구성 요소만 사용합니다.
pub fn stage_temp_file(file_name: &str, content: &[u8]) -> Result<PathBuf, StagingError> {
    let bare = extract_name(file_name);
    if bare.trim().is_empty() {
        return Err(StagingError::EmptyName);
    }

    let dir = staging_dir().join(Uuid::new_v4().to_string());
    fs::create_dir_all(&dir)?;

    let path = dir.join(sanitize_entry_name(bare));
    fs::write(&path, content)?;
    Ok(path)
}

/// 스테이징 디렉터리 정리
pub fn clear_staging() -> Result<(), StagingError> {
    let dir = staging_dir();
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_content_under_bare_name() {
        let path = stage_temp_file("../../etc/猫.png", b"meow").unwrap();
        assert!(path.starts_with(staging_dir()));
        assert_eq!(path.file_name().unwrap().to_string_lossy(), "猫.png");
        assert_eq!(fs::read(&path).unwrap(), b"meow");
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn same_name_does_not_overwrite() {
        let first = stage_temp_file("dup.txt", b"one").unwrap();
        let second = stage_temp_file("dup.txt", b"two").unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&second).unwrap(), b"two");
        fs::remove_dir_all(first.parent().unwrap()).unwrap();
        fs::remove_dir_all(second.parent().unwrap()).unwrap();
    }

    #[test]
    fn rejects_empty_name() {
        assert!(matches!(
            stage_temp_file("", b""),
            Err(StagingError::EmptyName)
        ));
        assert!(matches!(
            stage_temp_file("   ", b""),
            Err(StagingError::EmptyName)
        ));
    }
}
