//! 생성 모듈 - 원격 텍스트 생성 API
//!
//! 검색된 컨텍스트와 질문으로 만든 프롬프트를 원격 생성 모델에 보내고
//! 생성된 텍스트를 그대로 돌려줍니다.
//!
//! 재시도/백오프는 하지 않습니다. 실패는 그대로 호출자에게 전파됩니다.

mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Credentials, GenerationParams, GenerationSettings};
use crate::error::{Error, Result};

pub use prompt::build_prompt;

// ============================================================================
// Generator Trait
// ============================================================================

/// 텍스트 생성기 트레이트
#[async_trait]
pub trait Generator: Send + Sync {
    /// 프롬프트로 텍스트 생성
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// 모델 식별자
    fn model_id(&self) -> &str;
}

// ============================================================================
// BAM Generator
// ============================================================================

/// BAM 텍스트 생성 API 클라이언트
pub struct BamGenerator {
    credentials: Credentials,
    model_id: String,
    params: GenerationParams,
    client: reqwest::Client,
}

/// 요청 본문
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model_id: &'a str,
    inputs: Vec<&'a str>,
    parameters: &'a GenerationParams,
}

/// 응답 본문
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    results: Vec<GenerateResult>,
}

#[derive(Debug, Deserialize)]
struct GenerateResult {
    generated_text: String,
    #[serde(default)]
    generated_token_count: Option<u32>,
    #[serde(default)]
    stop_reason: Option<String>,
}

impl BamGenerator {
    /// 새 생성기
    ///
    /// `timeout_secs`가 없으면 요청 타임아웃을 두지 않습니다.
    pub fn new(credentials: Credentials, settings: &GenerationSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            credentials,
            model_id: settings.model_id.clone(),
            params: settings.params.clone(),
            client,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/generate",
            self.credentials.api_endpoint.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Generator for BamGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model_id: &self.model_id,
            inputs: vec![prompt],
            parameters: &self.params,
        };

        let response = self
            .client
            .post(self.generate_url())
            .bearer_auth(&self.credentials.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| Error::Endpoint {
                status: status.as_u16(),
                body: format!("unparseable response ({e}): {body}"),
            })?;

        let result = parsed.results.into_iter().next().ok_or_else(|| Error::Endpoint {
            status: status.as_u16(),
            body: "response contained no results".to_string(),
        })?;

        tracing::debug!(
            tokens = ?result.generated_token_count,
            stop_reason = ?result.stop_reason,
            "generation finished"
        );

        Ok(result.generated_text)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Tests
// ============================================================================
