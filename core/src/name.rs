//! 파일 이름 처리 유틸리티
//!
//! 전체 경로에서 표시용 파일 이름을 뽑아내고, 아카이브 엔트리 이름으로
//! 안전하게 쓸 수 있도록 정리하는 함수들을 제공합니다.

use lingua::{Language, LanguageDetector, LanguageDetectorBuilder};
use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_ENTRY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[/\\\x00-\x1f\x7f]").expect("valid entry name regex"));

static NAME_LANGUAGE_DETECTOR: Lazy<LanguageDetector> = Lazy::new(|| {
    LanguageDetectorBuilder::from_languages(&[
        Language::English,
        Language::Chinese,
        Language::Japanese,
        Language::Korean,
    ])
    .build()
});

const FALLBACK_ENTRY_NAME: &str = "unnamed";

/// 경로에서 마지막 구성 요소(파일 이름)를 추출
///
/// `/`와 `\`를 모두 구분자로 인식합니다. 비어 있지 않은 마지막 조각을 돌려주며,
/// 그런 조각이 없으면 입력을 그대로 돌려줍니다. 실패하지 않습니다.
pub fn extract_name(full_path: &str) -> &str {
    if !full_path.contains(['/', '\\']) {
        return full_path;
    }

    full_path
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(full_path)
}

/// 파일 이름을 (stem, 확장자)로 분리
///
/// `.bashrc`처럼 점으로 시작하는 이름이나 `name.`처럼 확장자가 비어 있는 경우는
/// 확장자가 없는 것으로 취급합니다.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// stem과 확장자를 다시 합침
pub fn join_extension(stem: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

/// 아카이브 엔트리 이름으로 쓸 수 있도록 경로 구분자와 제어 문자를 `_`로 치환
///
/// Windows에서 풀 수 없는 끝의 공백과 점만 제거하고, 앞쪽 공백은 그대로 둡니다.
pub fn sanitize_entry_name(name: &str) -> String {
    let replaced = UNSAFE_ENTRY_CHARS.replace_all(name, "_");
    let trimmed = replaced.trim_end_matches([' ', '.']);

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        FALLBACK_ENTRY_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// 중복 이름 회피용 번호를 확장자 앞에 붙임 (`cat.png` -> `cat(1).png`)
pub fn numbered_variant(name: &str, counter: usize) -> String {
    let (stem, ext) = split_extension(name);
    join_extension(&format!("{stem}({counter})"), ext)
}

/// 확장자를 뺀 이름이 영어로 감지되는지 확인
///
/// 후보 언어는 영어/중국어/일본어/한국어입니다. 언어를 판별할 수 없는 이름
/// (숫자나 기호만 있는 경우 등)은 영어가 아닌 것으로 보고 번역 대상에 남깁니다.
pub fn is_english_name(name: &str) -> bool {
    let (stem, _) = split_extension(name);
    NAME_LANGUAGE_DETECTOR.detect_language_of(stem) == Some(Language::English)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_name_separators() {
        assert_eq!(extract_name("a/b/c.png"), "c.png");
        assert_eq!(extract_name("a\\b\\c.png"), "c.png");
        assert_eq!(extract_name("C:\\Users\\me/mixed/猫.png"), "猫.png");
        assert_eq!(extract_name("c.png"), "c.png");
    }

    #[test]
    fn test_extract_name_edge_cases() {
        assert_eq!(extract_name(""), "");
        assert_eq!(extract_name("a/b/"), "b");
        assert_eq!(extract_name("dir\\\\file.txt"), "file.txt");
        assert_eq!(extract_name("/"), "/");
        assert_eq!(extract_name("\\\\"), "\\\\");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("cat.png"), ("cat", Some("png")));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_extension("README"), ("README", None));
        assert_eq!(split_extension(".bashrc"), (".bashrc", None));
        assert_eq!(split_extension("trailing."), ("trailing.", None));
    }

    #[test]
    fn test_sanitize_entry_name() {
        assert_eq!(sanitize_entry_name("cat.png"), "cat.png");
        assert_eq!(sanitize_entry_name("a/b.png"), "a_b.png");
        assert_eq!(sanitize_entry_name("a\\b\0c.png"), "a_b_c.png");
        assert_eq!(sanitize_entry_name("  spaced name.txt \n"), "  spaced name.txt _");
        assert_eq!(sanitize_entry_name(""), "unnamed");
        assert_eq!(sanitize_entry_name(".."), "unnamed");
    }

    #[test]
    fn test_sanitize_entry_name_keeps_inner_and_leading_text() {
        assert_eq!(sanitize_entry_name(" cat.png"), " cat.png");
        assert_eq!(sanitize_entry_name("cat.png. . "), "cat.png");
        assert_eq!(sanitize_entry_name("my  cat.png"), "my  cat.png");
        assert_eq!(sanitize_entry_name("   "), "unnamed");
    }

    #[test]
    fn test_is_english_name() {
        assert!(is_english_name("holiday photo.png"));
        assert!(is_english_name("report"));
        assert!(!is_english_name("猫.png"));
        assert!(!is_english_name("こんにちは.txt"));
        assert!(!is_english_name("사진.jpg"));
        // 판별 불가 -> 번역 대상
        assert!(!is_english_name("12345.png"));
        assert!(!is_english_name(""));
    }

    #[test]
    fn test_numbered_variant() {
        assert_eq!(numbered_variant("cat.png", 1), "cat(1).png");
        assert_eq!(numbered_variant("README", 2), "README(2)");
        assert_eq!(numbered_variant("a.tar.gz", 3), "a.tar(3).gz");
    }
}
