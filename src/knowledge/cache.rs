//! Index Cache - 인덱스 파일 저장/로드
//!
//! bincode로 `KnowledgeBase` 전체를 파일 하나에 직렬화합니다.
//! 저장은 임시 파일에 쓴 뒤 rename 하므로 중간에 실패해도 캐시 파일이 남지 않습니다.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::index::{KnowledgeBase, INDEX_FORMAT_VERSION};

/// 인덱스 저장
pub fn save(kb: &KnowledgeBase, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::IndexIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let data = bincode::serialize(kb).map_err(|e| Error::IndexCorrupt {
        path: path.to_path_buf(),
        message: format!("failed to serialize index: {e}"),
    })?;

    let tmp = temp_path(path);
    std::fs::write(&tmp, &data).map_err(|source| Error::IndexIo {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        Error::IndexIo {
            path: path.to_path_buf(),
            source,
        }
    })?;

    tracing::info!(
        "Saved index to {:?} ({} chunks, {} bytes)",
        path,
        kb.entries().len(),
        data.len()
    );
    Ok(())
}

/// 인덱스 로드
///
/// 파일이 손상되었거나 포맷 버전이 다르면 `Error::IndexCorrupt`.
/// 자동으로 다시 만들지 않습니다.
pub fn load(path: &Path) -> Result<KnowledgeBase> {
    let data = std::fs::read(path).map_err(|source| Error::IndexIo {
        path: path.to_path_buf(),
        source,
    })?;

    let kb: KnowledgeBase = bincode::deserialize(&data).map_err(|e| Error::IndexCorrupt {
        path: path.to_path_buf(),
        message: format!("failed to deserialize index: {e}"),
    })?;

    if kb.meta().format_version != INDEX_FORMAT_VERSION {
        return Err(Error::IndexCorrupt {
            path: path.to_path_buf(),
            message: format!(
                "unsupported format version {} (expected {})",
                kb.meta().format_version,
                INDEX_FORMAT_VERSION
            ),
        });
    }

    tracing::debug!("Loaded index from {:?} ({} chunks)", path, kb.entries().len());
    Ok(kb)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "knowledge_base".into());
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// Tests
// ============================================================================
