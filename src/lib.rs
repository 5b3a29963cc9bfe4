//! pdf-wizard - PDF 한 권에 대한 RAG 질의 시스템
//!
//! 인덱서가 PDF를 청크로 나눠 임베딩한 인덱스 파일을 만들고,
//! 질의 서비스가 그 인덱스를 로드해 검색 결과와 함께
//! 원격 생성 모델에 질문합니다.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod indexer;
pub mod knowledge;
pub mod service;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports
pub use config::{ChunkConfig, Credentials, Settings};
pub use embedding::{create_embedder, EmbeddingProvider, HuggingFaceEmbedding};
pub use error::{Error, Result};
pub use extractor::{load_document, Document};
pub use generation::{build_prompt, BamGenerator, Generator};
pub use indexer::{IndexOutcome, Indexer};
pub use knowledge::{CharacterSplitter, Chunk, Chunker, KnowledgeBase, SearchResult, VectorIndex};
pub use service::{Answer, QueryService};
