//! Knowledge 모듈 - 벡터 인덱스
//!
//! - Chunker: 구분자 우선 문자 단위 텍스트 분할
//! - Index: 청크 + 임베딩, L2 최근접 검색
//! - Cache: bincode 파일 저장/로드

pub mod cache;
mod chunker;
mod index;
mod vector;

// Re-exports
pub use chunker::{rejoin, CharacterSplitter, Chunk, Chunker};
pub use index::{IndexEntry, IndexMeta, KnowledgeBase, INDEX_FORMAT_VERSION};
pub use vector::{squared_l2_distance, SearchResult, VectorIndex};
