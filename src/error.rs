//! 에러 타입
//!
//! 라이브러리 계층의 에러를 하나의 열거형으로 모읍니다.
//! CLI 계층에서는 anyhow로 감싸서 최상위까지 전파합니다.

use std::path::PathBuf;

/// pdf-wizard 에러
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 원본 문서를 읽을 수 없음 (인덱싱 중단)
    #[error("cannot read document {path:?}: {source}")]
    DocumentUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PDF 텍스트 추출 실패
    #[error("failed to extract text from {path:?}: {message}")]
    PdfExtraction { path: PathBuf, message: String },

    /// 잘못된 설정값
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// 필수 환경변수 누락
    #[error("environment variable {0} is not set")]
    MissingCredential(&'static str),

    /// 캐시 파일 손상 또는 호환되지 않는 포맷
    #[error("index file {path:?} is unusable: {message}")]
    IndexCorrupt { path: PathBuf, message: String },

    /// 캐시 파일 입출력 실패
    #[error("index file {path:?}: {source}")]
    IndexIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 인덱스와 쿼리 임베딩 모델 불일치
    #[error("embedding mismatch: {0}")]
    EmbeddingMismatch(String),

    /// 생성 모델 엔드포인트 오류 응답
    #[error("endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    /// 네트워크 / HTTP 클라이언트 오류
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// 사용자가 요청을 취소함
    #[error("request cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
