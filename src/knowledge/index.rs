//! Knowledge Base - 청크 + 임베딩 인덱스
//!
//! 한 문서의 모든 청크와 임베딩을 담는 불변 인덱스입니다.
//! 디스크에 저장되는 유일한 엔티티입니다 (파일 하나 = 문서 하나).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ChunkConfig, EmbeddingSettings};
use crate::error::{Error, Result};

use super::chunker::Chunk;
use super::vector::{squared_l2_distance, top_k_by_distance, SearchResult, VectorIndex};

/// 직렬화 포맷 버전 (필드 구성이 바뀌면 올림)
pub const INDEX_FORMAT_VERSION: u32 = 1;

// ============================================================================
// Types
// ============================================================================

/// 인덱스 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub format_version: u32,
    /// 임베딩 모델 이름
    pub model_name: String,
    /// 임베딩 차원
    pub dimension: usize,
    /// 임베딩 정규화 여부
    pub normalized: bool,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// 원본 문서 SHA-256 (hex)
    pub source_digest: String,
    pub source_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl IndexMeta {
    pub fn new(
        embedding: &EmbeddingSettings,
        chunking: &ChunkConfig,
        source_path: PathBuf,
        source_digest: String,
    ) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            model_name: embedding.model_name.clone(),
            dimension: embedding.dimension,
            normalized: embedding.normalize_embeddings,
            chunk_size: chunking.chunk_size,
            chunk_overlap: chunking.chunk_overlap,
            source_digest,
            source_path,
            created_at: Utc::now(),
        }
    }
}

/// 인덱스 엔트리
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

// ============================================================================
// KnowledgeBase
// ============================================================================

/// 벡터 인덱스 (flat, exact)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    meta: IndexMeta,
    entries: Vec<IndexEntry>,
}

impl KnowledgeBase {
    /// 청크와 임베딩으로 인덱스 생성
    ///
    /// 청크 수와 임베딩 수가 다르거나 차원이 맞지 않으면 실패합니다.
    pub fn build(meta: IndexMeta, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(Error::EmbeddingMismatch(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        if let Some((i, bad)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, e)| e.len() != meta.dimension)
        {
            return Err(Error::EmbeddingMismatch(format!(
                "embedding {} has dimension {}, expected {}",
                i,
                bad.len(),
                meta.dimension
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();

        Ok(Self { meta, entries })
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// 총 텍스트 길이 (문자 수, 중첩 포함)
    pub fn total_chars(&self) -> usize {
        self.entries.iter().map(|e| e.chunk.char_len()).sum()
    }

    /// 쿼리 임베딩 설정이 인덱스와 호환되는지 확인
    ///
    /// 다른 모델로 만든 벡터끼리의 거리는 의미가 없으므로 거부합니다.
    pub fn check_compatible(&self, settings: &EmbeddingSettings) -> Result<()> {
        if self.meta.model_name != settings.model_name {
            return Err(Error::EmbeddingMismatch(format!(
                "index was built with '{}', configured model is '{}'",
                self.meta.model_name, settings.model_name
            )));
        }
        if self.meta.dimension != settings.dimension {
            return Err(Error::EmbeddingMismatch(format!(
                "index dimension {} differs from configured {}",
                self.meta.dimension, settings.dimension
            )));
        }
        if self.meta.normalized != settings.normalize_embeddings {
            return Err(Error::EmbeddingMismatch(format!(
                "index normalize_embeddings={} differs from configured {}",
                self.meta.normalized, settings.normalize_embeddings
            )));
        }
        Ok(())
    }
}

impl VectorIndex for KnowledgeBase {
    fn search(&self, query_embedding: &[f32], k: usize) -> Vec<SearchResult> {
        let scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, squared_l2_distance(&entry.embedding, query_embedding)))
            .collect();

        top_k_by_distance(scored, k)
            .into_iter()
            .map(|(i, distance)| SearchResult {
                chunk: self.entries[i].chunk.clone(),
                distance,
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
