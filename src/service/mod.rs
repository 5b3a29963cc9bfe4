//! Query Service - 질문 → 임베딩 → 검색 → 생성
//!
//! 프로세스 시작 시 인덱스를 한 번 로드해 소유하고,
//! 요청마다 같은 임베딩 모델로 질문을 벡터화해 검색합니다.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::generation::{build_prompt, Generator};
use crate::knowledge::{KnowledgeBase, SearchResult, VectorIndex};

/// 생성된 답변 (후처리 없음)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
}

/// 질의 서비스
pub struct QueryService {
    kb: KnowledgeBase,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl QueryService {
    /// 서비스 생성
    ///
    /// 인덱스가 설정된 임베딩 모델과 다르게 만들어졌으면 거부합니다.
    pub fn new(
        kb: KnowledgeBase,
        settings: &Settings,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        kb.check_compatible(&settings.embedding)?;

        if embedder.dimension() != kb.meta().dimension {
            return Err(Error::EmbeddingMismatch(format!(
                "embedder '{}' produces dimension {}, index has {}",
                embedder.name(),
                embedder.dimension(),
                kb.meta().dimension
            )));
        }

        tracing::info!(
            "Query service ready: {} chunks, top_k={}, model={}",
            kb.len(),
            settings.retrieval.top_k,
            generator.model_id()
        );

        Ok(Self {
            kb,
            embedder,
            generator,
            top_k: settings.retrieval.top_k,
        })
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// 검색만 수행 (거리 오름차순)
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(question).await?;
        Ok(self.kb.search(&query_embedding, self.top_k))
    }

    /// 질문에 답변
    ///
    /// 질문은 검증하지 않습니다. 취소 토큰은 각 단계 전에 확인하고,
    /// 생성 호출 중에 취소되면 진행 중인 요청을 버립니다.
    pub async fn answer(&self, question: &str, cancel: &CancellationToken) -> Result<Answer> {
        ensure_active(cancel)?;
        let started = Instant::now();

        let query_embedding = self.embedder.embed(question).await?;
        ensure_active(cancel)?;

        let context = self.kb.search(&query_embedding, self.top_k);
        tracing::debug!(
            retrieved = context.len(),
            best_distance = ?context.first().map(|r| r.distance),
            "retrieval finished"
        );
        ensure_active(cancel)?;

        let prompt = build_prompt(question, &context);
        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = self.generator.generate(&prompt) => result?,
        };

        tracing::debug!("answered in {:?}", started.elapsed());
        Ok(Answer { text })
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
