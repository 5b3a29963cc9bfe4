//! Vector Search - 벡터 검색 트레이트 및 유틸리티
//!
//! 인메모리 전수(flat) 검색을 사용합니다.
//! 거리는 제곱 유클리드(L2) 거리이며 작을수록 가깝습니다.

use serde::Serialize;

use super::chunker::Chunk;

// ============================================================================
// Types
// ============================================================================

/// 검색 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// 매칭된 청크
    pub chunk: Chunk,
    /// 질의 벡터와의 제곱 L2 거리
    pub distance: f32,
}

// ============================================================================
// VectorIndex Trait
// ============================================================================

/// 최근접 이웃 검색 인터페이스
pub trait VectorIndex: Send + Sync {
    /// 질의 벡터와 가장 가까운 청크 `k`개 (거리 오름차순)
    fn search(&self, query_embedding: &[f32], k: usize) -> Vec<SearchResult>;

    /// 인덱싱된 청크 수
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 제곱 유클리드 거리
///
/// 길이가 다르면 짧은 쪽 길이까지만 비교합니다. 호출 전에 차원을 검증하세요.
pub fn squared_l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// (위치, 거리) 목록에서 가장 가까운 `k`개 선택
///
/// 거리가 같으면 위치가 앞선 쪽이 먼저 옵니다. NaN은 가장 먼 것으로 취급합니다.
pub fn top_k_by_distance(mut scored: Vec<(usize, f32)>, k: usize) -> Vec<(usize, f32)> {
    scored.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or_else(|| a.1.is_nan().cmp(&b.1.is_nan()))
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(k);
    scored
}

// ============================================================================
// Tests
// ============================================================================
