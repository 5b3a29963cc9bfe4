//! 임베딩 모듈 - Hugging Face Inference API를 통한 텍스트 벡터화
//!
//! sentence-transformers 모델의 feature-extraction 파이프라인을 호출해
//! 문장 임베딩을 받습니다. 인덱싱과 질의에 반드시 같은 모델을 사용해야 합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = create_embedder(&settings.embedding, embedding_api_token(env_var))?;
//! let embedding = embedder.embed("Hello, world!").await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{Device, EmbeddingSettings};
use crate::error::{Error, Result};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Hugging Face Embedding
// ============================================================================

/// 기본 임베딩 모델
pub const DEFAULT_MODEL_NAME: &str = "sentence-transformers/all-mpnet-base-v2";

/// Inference API 모델 엔드포인트 루트
/// source: https://huggingface.co/docs/inference-providers/tasks/feature-extraction
pub const DEFAULT_API_URL: &str = "https://router.huggingface.co/hf-inference/models";

/// all-mpnet-base-v2 임베딩 차원
pub const DEFAULT_DIMENSION: usize = 768;

/// 요청당 최대 텍스트 수
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Hugging Face feature-extraction 임베딩 구현체
pub struct HuggingFaceEmbedding {
    api_token: Option<String>,
    url: String,
    model_name: String,
    dimension: usize,
    normalize: bool,
    batch_size: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for HuggingFaceEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceEmbedding")
            .field("url", &self.url)
            .field("dimension", &self.dimension)
            .field("normalize", &self.normalize)
            .field("batch_size", &self.batch_size)
            .field("has_token", &self.api_token.is_some())
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    /// 모델이 로드 중이면 503 대신 대기
    wait_for_model: bool,
}

impl HuggingFaceEmbedding {
    /// 설정으로 생성
    ///
    /// 토큰이 없으면 인증 헤더 없이 호출합니다 (자체 호스팅 엔드포인트용).
    pub fn new(settings: &EmbeddingSettings, api_token: Option<String>) -> Result<Self> {
        if settings.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be > 0".into()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            api_token,
            url: format!(
                "{}/{}/pipeline/feature-extraction",
                settings.api_url.trim_end_matches('/'),
                settings.model_name
            ),
            model_name: settings.model_name.clone(),
            dimension: settings.dimension,
            normalize: settings.normalize_embeddings,
            batch_size: settings.batch_size,
            client: builder.build()?,
        })
    }

    /// 한 번의 API 호출로 배치 임베딩
    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = FeatureExtractionRequest {
            inputs,
            options: RequestOptions {
                wait_for_model: true,
            },
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Error::Endpoint {
                status: status.as_u16(),
                body: text,
            });
        }

        let mut vectors: Vec<Vec<f32>> =
            serde_json::from_str(&text).map_err(|e| Error::Endpoint {
                status: status.as_u16(),
                body: format!("unparseable embedding response ({e}): {text}"),
            })?;

        if vectors.len() != inputs.len() {
            return Err(Error::EmbeddingMismatch(format!(
                "sent {} texts but received {} embeddings",
                inputs.len(),
                vectors.len()
            )));
        }

        for vector in vectors.iter_mut() {
            if vector.len() != self.dimension {
                return Err(Error::EmbeddingMismatch(format!(
                    "'{}' returned dimension {}, expected {}",
                    self.model_name,
                    vector.len(),
                    self.dimension
                )));
            }
            if self.normalize {
                normalize(vector);
            }
        }

        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::EmbeddingMismatch("empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            tracing::debug!(
                "Embedding batch {} ({} texts, {} done)",
                i + 1,
                batch.len(),
                results.len()
            );
            results.extend(self.request(batch).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

/// L2 정규화 (영벡터는 그대로)
fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 맞는 임베딩 프로바이더 생성
pub fn create_embedder(
    settings: &EmbeddingSettings,
    api_token: Option<String>,
) -> Result<Arc<dyn EmbeddingProvider>> {
    if settings.device != Device::Cpu {
        tracing::debug!(
            "embedding.device = {:?} is decided by the inference provider",
            settings.device
        );
    }

    if api_token.is_none() {
        tracing::warn!("No embedding API token set; calling {} anonymously", settings.api_url);
    }

    tracing::info!(
        "Using {} embedding (dimension: {}, normalize: {})",
        settings.model_name,
        settings.dimension,
        settings.normalize_embeddings
    );

    Ok(Arc::new(HuggingFaceEmbedding::new(settings, api_token)?))
}

// ============================================================================
// Tests
// ============================================================================
