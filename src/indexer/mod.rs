//! Indexer - 문서 → 청크 → 임베딩 → 인덱스 파일
//!
//! 캐시 파일이 유효하면 임베딩을 다시 하지 않고 그대로 로드합니다.
//! - `CachePolicy::ContentHash`: 원본 SHA-256이 같을 때만 재사용
//! - `CachePolicy::Existence`: 파일이 있으면 무조건 재사용

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{CachePolicy, Settings};
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::extractor::{document_digest, load_document};
use crate::knowledge::{cache, CharacterSplitter, Chunker, IndexMeta, KnowledgeBase};

// ============================================================================
// Types
// ============================================================================

/// `build_or_load_index` 결과
#[derive(Debug)]
pub enum IndexOutcome {
    /// 기존 캐시 파일을 로드함
    Loaded(KnowledgeBase),
    /// 새로 만들어 저장함
    Built(KnowledgeBase),
}

impl IndexOutcome {
    pub fn was_built(&self) -> bool {
        matches!(self, IndexOutcome::Built(_))
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        match self {
            IndexOutcome::Loaded(kb) | IndexOutcome::Built(kb) => kb,
        }
    }

    pub fn into_inner(self) -> KnowledgeBase {
        match self {
            IndexOutcome::Loaded(kb) | IndexOutcome::Built(kb) => kb,
        }
    }
}

// ============================================================================
// Indexer
// ============================================================================

/// 인덱서
pub struct Indexer {
    settings: Settings,
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: CharacterSplitter,
}

impl Indexer {
    /// 설정과 임베딩 프로바이더로 생성
    pub fn new(settings: Settings, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        if embedder.dimension() != settings.embedding.dimension {
            return Err(Error::EmbeddingMismatch(format!(
                "embedder '{}' produces dimension {}, settings expect {}",
                embedder.name(),
                embedder.dimension(),
                settings.embedding.dimension
            )));
        }

        let chunker = CharacterSplitter::new(settings.chunking.clone())?;

        Ok(Self {
            settings,
            embedder,
            chunker,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// 캐시가 유효하면 로드, 아니면 새로 빌드 후 저장
    ///
    /// 빌드 중 실패하면 캐시 파일은 쓰이지 않습니다.
    pub async fn build_or_load_index(
        &self,
        document_path: &Path,
        cache_path: &Path,
    ) -> Result<IndexOutcome> {
        if cache_path.exists() {
            match self.settings.cache_policy {
                CachePolicy::Existence => {
                    tracing::info!("Index cache {:?} exists, skipping indexing", cache_path);
                    return Ok(IndexOutcome::Loaded(cache::load(cache_path)?));
                }
                CachePolicy::ContentHash => {
                    let kb = cache::load(cache_path)?;
                    match document_digest(document_path) {
                        Ok(digest) if digest == kb.meta().source_digest => {
                            tracing::info!(
                                "Index cache {:?} matches {:?}, skipping indexing",
                                cache_path,
                                document_path
                            );
                            return Ok(IndexOutcome::Loaded(kb));
                        }
                        Ok(_) => {
                            tracing::info!(
                                "Source document {:?} changed since {:?} was built, rebuilding",
                                document_path,
                                cache_path
                            );
                        }
                        Err(e) => {
                            tracing::warn!("{}; using cached index {:?}", e, cache_path);
                            return Ok(IndexOutcome::Loaded(kb));
                        }
                    }
                }
            }
        }

        let kb = self.rebuild(document_path, cache_path).await?;
        Ok(IndexOutcome::Built(kb))
    }

    /// 캐시를 무시하고 다시 빌드해서 저장
    pub async fn rebuild(&self, document_path: &Path, cache_path: &Path) -> Result<KnowledgeBase> {
        let kb = self.build_index(document_path).await?;
        cache::save(&kb, cache_path)?;
        Ok(kb)
    }

    /// 문서에서 인덱스 생성 (저장하지 않음)
    pub async fn build_index(&self, document_path: &Path) -> Result<KnowledgeBase> {
        // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
        let path = document_path.to_path_buf();
        let document = tokio::task::spawn_blocking(move || load_document(&path))
            .await
            .map_err(|e| Error::PdfExtraction {
                path: document_path.to_path_buf(),
                message: format!("extraction task failed: {e}"),
            })??;

        let text = document.text(&self.settings.page_separator);
        self.index_text(&text, document.path, document.digest).await
    }

    /// 텍스트에서 인덱스 생성
    pub async fn index_text(
        &self,
        text: &str,
        source_path: PathBuf,
        source_digest: String,
    ) -> Result<KnowledgeBase> {
        let chunks = self.chunker.split(text);
        if chunks.is_empty() {
            tracing::warn!("No chunks generated for {:?}", source_path);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let meta = IndexMeta::new(
            &self.settings.embedding,
            &self.settings.chunking,
            source_path,
            source_digest,
        );
        let kb = KnowledgeBase::build(meta, chunks, embeddings)?;

        tracing::info!(
            "Indexed {} chars into {} chunks with {} ({})",
            text.chars().count(),
            kb.entries().len(),
            self.embedder.name(),
            self.chunker.name()
        );

        Ok(kb)
    }
}

// ============================================================================
// Tests
// ============================================================================
