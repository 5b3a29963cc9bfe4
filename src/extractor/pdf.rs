//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트로 페이지마다 따로 텍스트를 추출합니다.

use std::path::Path;

use crate::error::{Error, Result};

/// 메모리의 PDF 바이트에서 페이지별 텍스트 추출
///
/// 페이지 순서대로 텍스트를 반환합니다. 페이지 내용은 다듬지 않습니다.
pub fn extract_pages(path: &Path, bytes: &[u8]) -> Result<Vec<String>> {
    let pages =
        pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| Error::PdfExtraction {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if pages.is_empty() {
        tracing::warn!("No pages extracted from PDF: {:?}", path);
        return Ok(vec![String::new()]);
    }

    // 텍스트가 비어있으면 경고
    if pages.iter().all(|page| page.trim().is_empty()) {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
    }

    Ok(pages)
}

// ============================================================================
// Tests
// ============================================================================
