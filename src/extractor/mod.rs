//! 문서 추출 모듈
//!
//! 원본 PDF를 읽어 페이지별 텍스트와 내용 해시를 만듭니다.
//! - 해시: 원본 바이트의 SHA-256 (인덱스 캐시 키)
//! - 텍스트: pdf-extract로 추출

pub mod pdf;

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

// ============================================================================
// Document
// ============================================================================

/// 로드된 원본 문서
#[derive(Debug, Clone)]
pub struct Document {
    /// 파일 경로
    pub path: PathBuf,
    /// 페이지별 텍스트 (순서 유지)
    pub pages: Vec<String>,
    /// 원본 바이트의 SHA-256 (hex)
    pub digest: String,
}

impl Document {
    /// 페이지를 구분자로 이어붙인 전체 텍스트
    ///
    /// 빈 구분자를 주면 페이지 경계의 단어가 붙을 수 있습니다.
    pub fn text(&self, separator: &str) -> String {
        self.pages.join(separator)
    }

    /// 페이지 수
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// ============================================================================
// Loading
// ============================================================================

/// PDF 문서 로드
///
/// 파일을 읽을 수 없으면 `Error::DocumentUnreadable`을 반환합니다.
pub fn load_document(path: &Path) -> Result<Document> {
    let bytes = read_source(path)?;
    let digest = digest_bytes(&bytes);
    let pages = pdf::extract_pages(path, &bytes)?;

    tracing::info!(
        "Loaded document {:?} ({} pages, {} bytes)",
        path,
        pages.len(),
        bytes.len()
    );

    Ok(Document {
        path: path.to_path_buf(),
        pages,
        digest,
    })
}

/// 텍스트 추출 없이 원본 파일 해시만 계산
pub fn document_digest(path: &Path) -> Result<String> {
    let bytes = read_source(path)?;
    Ok(digest_bytes(&bytes))
}

/// 바이트 SHA-256 (hex)
pub fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::DocumentUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_joins_pages_with_separator() {
        let doc = Document {
            path: PathBuf::from("book.pdf"),
            pages: vec!["end of page".to_string(), "start of next".to_string()],
            digest: String::new(),
        };
        assert_eq!(doc.text("\n"), "end of page\nstart of next");
        assert_eq!(doc.text(""), "end of pagestart of next");
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let a = digest_bytes(b"hello");
        assert_eq!(a.len(), 64);
        assert_eq!(a, digest_bytes(b"hello"));
        assert_ne!(a, digest_bytes(b"hello!"));
    }

    #[test]
    fn test_load_document_separates_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.pdf");
        let bytes = crate::test_support::pdf_fixture(&["alpha", "omega"]);
        std::fs::write(&path, &bytes).unwrap();

        let doc = load_document(&path).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.digest, digest_bytes(&bytes));

        let text = doc.text("\n");
        assert!(!text.contains("alphaomega"));
        let alpha = text.find("alpha").unwrap();
        let omega = text.find("omega").unwrap();
        assert!(alpha < omega);
        assert!(text[alpha..omega].contains('\n'));
    }

    #[test]
    fn test_missing_document_is_unreadable() {
        let result = load_document(Path::new("/no/such/dir/book.pdf"));
        assert!(matches!(result, Err(Error::DocumentUnreadable { .. })));

        let result = document_digest(Path::new("/no/such/dir/book.pdf"));
        assert!(matches!(result, Err(Error::DocumentUnreadable { .. })));
    }
}
