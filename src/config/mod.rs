//! 설정 모듈
//!
//! 모델 이름, 청킹 파라미터, 디코딩 파라미터 등 모든 설정을
//! 타입이 지정된 `Settings` 구조체 하나로 관리합니다.
//!
//! 우선순위: 코드 기본값 < TOML 설정 파일 < CLI 플래그
//! API 키는 환경변수에서만 읽습니다.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 생성 모델 API 키 환경변수
pub const API_KEY_ENV: &str = "BAM_API_KEY";
/// 생성 모델 엔드포인트 환경변수 (선택)
pub const API_ENDPOINT_ENV: &str = "BAM_API_ENDPOINT";
/// 기본 엔드포인트
pub const DEFAULT_API_ENDPOINT: &str = "https://bam-api.res.ibm.com/v1";
/// 임베딩 API 토큰 환경변수 (선택)
pub const EMBEDDING_API_KEY_ENV: &str = "HF_API_TOKEN";

// ============================================================================
// Settings
// ============================================================================

/// 전체 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 원본 PDF 경로
    pub document_path: PathBuf,
    /// 직렬화된 인덱스 파일 경로
    pub cache_path: PathBuf,
    /// 캐시 재사용 판단 방식
    pub cache_policy: CachePolicy,
    /// 페이지 사이에 넣을 구분자 ("" = 구분자 없이 이어붙임)
    pub page_separator: String,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkConfig,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            document_path: PathBuf::from("data/document.pdf"),
            cache_path: PathBuf::from("knowledge_base.bin"),
            cache_policy: CachePolicy::default(),
            page_separator: "\n".to_string(),
            embedding: EmbeddingSettings::default(),
            chunking: ChunkConfig::default(),
            retrieval: RetrievalSettings::default(),
            generation: GenerationSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Settings {
    /// 설정 로드
    ///
    /// 경로가 주어지면 TOML 파일을 읽어 기본값 위에 덮어씁니다.
    /// 파일에 없는 항목은 기본값을 유지합니다.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::InvalidConfig(format!("cannot read config {:?}: {}", path, e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// TOML 문자열에서 파싱
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.embedding.validate()?;

        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be > 0".into()));
        }

        self.generation.params.validate()?;

        if self.generation.params.decoding_method == DecodingMethod::Greedy
            && self.generation.params.temperature != 0.0
        {
            tracing::warn!(
                temperature = self.generation.params.temperature,
                "temperature has no effect with greedy decoding"
            );
        }

        Ok(())
    }
}

/// 캐시 재사용 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// 캐시 파일의 원본 해시가 현재 문서와 같을 때만 재사용
    #[default]
    ContentHash,
    /// 캐시 파일이 존재하기만 하면 재사용
    Existence,
}

// ============================================================================
// Embedding
// ============================================================================

/// 임베딩 실행 장치
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

/// 임베딩 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_name: String,
    /// Inference API 모델 루트 (`{api_url}/{model_name}/pipeline/feature-extraction`)
    pub api_url: String,
    pub device: Device,
    pub normalize_embeddings: bool,
    pub dimension: usize,
    /// 요청당 최대 텍스트 수
    pub batch_size: usize,
    pub timeout_secs: Option<u64>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_name: crate::embedding::DEFAULT_MODEL_NAME.to_string(),
            api_url: crate::embedding::DEFAULT_API_URL.to_string(),
            device: Device::Cpu,
            normalize_embeddings: false,
            dimension: crate::embedding::DEFAULT_DIMENSION,
            batch_size: crate::embedding::DEFAULT_BATCH_SIZE,
            timeout_secs: None,
        }
    }
}

impl EmbeddingSettings {
    fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be > 0".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Chunking
// ============================================================================

/// 청킹 설정 (길이는 모두 문자 수 기준)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// 청크 최대 길이
    pub chunk_size: usize,
    /// 인접 청크 간 중첩 길이
    pub chunk_overlap: usize,
    /// 우선 분할 구분자
    pub separator: String,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separator: "\n".to_string(),
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Retrieval / Generation / Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// 질문 당 검색할 청크 수
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// 디코딩 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodingMethod {
    #[default]
    Greedy,
    Sample,
}

/// 생성 파라미터 (요청 본문에 그대로 실림)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub decoding_method: DecodingMethod,
    pub min_new_tokens: u32,
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            decoding_method: DecodingMethod::Greedy,
            min_new_tokens: 30,
            max_new_tokens: 1024,
            temperature: 0.5,
        }
    }
}

impl GenerationParams {
    fn validate(&self) -> Result<()> {
        if self.max_new_tokens == 0 {
            return Err(Error::InvalidConfig("generation.max_new_tokens must be > 0".into()));
        }
        if self.min_new_tokens > self.max_new_tokens {
            return Err(Error::InvalidConfig(format!(
                "generation.min_new_tokens ({}) exceeds max_new_tokens ({})",
                self.min_new_tokens, self.max_new_tokens
            )));
        }
        Ok(())
    }
}

/// 생성 모델 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model_id: String,
    #[serde(flatten)]
    pub params: GenerationParams,
    /// 요청 타임아웃 (None = 무제한)
    pub timeout_secs: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model_id: "google/flan-t5-xxl".to_string(),
            params: GenerationParams::default(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// 생성 모델 API 인증 정보
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_endpoint: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_endpoint", &self.api_endpoint)
            .finish()
    }
}

impl Credentials {
    /// 환경변수에서 로드
    ///
    /// `BAM_API_KEY`가 없거나 비어 있으면 실패합니다.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수로 로드
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::MissingCredential(API_KEY_ENV))?;

        let api_endpoint = lookup(API_ENDPOINT_ENV)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        Ok(Self {
            api_key,
            api_endpoint,
        })
    }
}

/// 임베딩 API 토큰 조회 (없거나 비어 있으면 `None`)
pub fn embedding_api_token<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(EMBEDDING_API_KEY_ENV).filter(|token| !token.trim().is_empty())
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    std::env::var(API_KEY_ENV)
        .map(|key| !key.trim().is_empty())
        .unwrap_or(false)
}

// ============================================================================
// Tests
// ============================================================================
