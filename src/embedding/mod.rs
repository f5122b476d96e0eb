//! 임베딩 모듈 - 텍스트 벡터화
//!
//! 청크와 질문을 같은 모델/파라미터로 벡터화합니다.
//! 구현체는 생성 시점에 [`create_embedder`]가 하나 골라 주입합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = create_embedder(&EmbeddingConfig::default())?;
//! let vectors = embed_chunks(embedder.as_ref(), &chunks).await?;
//! ```

mod gemini;
mod hash;

pub use gemini::{GeminiEmbedding, DEFAULT_DIMENSION, GEMINI_API_BASE, SUPPORTED_DIMENSIONS};
pub use hash::{HashEmbedding, DEFAULT_HASH_DIMENSION};

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::knowledge::Chunk;

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

    /// 질문 임베딩 (문서와 동일한 모델/파라미터)
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text).await
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Pipeline Adapter
// ============================================================================

/// 청크 전체 임베딩
///
/// 입력과 같은 순서/개수의 벡터를 돌려줍니다. 프로바이더 실패나
/// 잘못된 벡터는 모두 `EmbeddingUnavailable`이 됩니다.
pub async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    chunks: &[Chunk],
) -> PipelineResult<Vec<Vec<f32>>> {
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

    tracing::debug!(
        "Embedding {} chunks with {} (dimension: {})",
        texts.len(),
        provider.name(),
        provider.dimension()
    );

    let vectors = provider
        .embed_batch(&texts)
        .await
        .map_err(PipelineError::embedding)?;

    if vectors.len() != chunks.len() {
        return Err(PipelineError::EmbeddingUnavailable(format!(
            "{} returned {} vectors for {} chunks",
            provider.name(),
            vectors.len(),
            chunks.len()
        )));
    }

    for vector in &vectors {
        check_vector(provider, vector)?;
    }

    Ok(vectors)
}

/// 질문 임베딩 (검증 포함)
pub async fn embed_query_vector(
    provider: &dyn EmbeddingProvider,
    question: &str,
) -> PipelineResult<Vec<f32>> {
    let vector = provider
        .embed_query(question)
        .await
        .map_err(PipelineError::embedding)?;
    check_vector(provider, &vector)?;
    Ok(vector)
}

/// 차원과 값이 올바른지 확인
fn check_vector(provider: &dyn EmbeddingProvider, vector: &[f32]) -> PipelineResult<()> {
    if vector.len() != provider.dimension() {
        return Err(PipelineError::EmbeddingUnavailable(format!(
            "{} returned a {}-dimensional vector, expected {}",
            provider.name(),
            vector.len(),
            provider.dimension()
        )));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(PipelineError::EmbeddingUnavailable(format!(
            "{} returned a vector with non-finite values",
            provider.name()
        )));
    }
    Ok(())
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
///
/// 우선순위:
/// 1. `GEMINI_API_KEY` 환경변수
/// 2. `GOOGLE_AI_API_KEY` 환경변수
pub fn get_api_key() -> Result<String> {
    for var in ["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"] {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                tracing::debug!("Using API key from {}", var);
                return Ok(key);
            }
        }
    }

    anyhow::bail!(
        "API key not found. Set GEMINI_API_KEY or GOOGLE_AI_API_KEY environment variable.\n\
         Get your API key at: https://aistudio.google.com/app/apikey"
    )
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    ["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"]
        .iter()
        .any(|var| std::env::var(var).map(|k| !k.is_empty()).unwrap_or(false))
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 따라 임베딩 프로바이더 생성
///
/// `Auto`는 API 키가 있으면 Gemini, 없으면 로컬 해시 임베딩을 고릅니다.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    let backend = config.resolve_backend(has_api_key());

    let embedder: Box<dyn EmbeddingProvider> = match backend {
        EmbeddingBackend::Gemini => {
            if !has_api_key() {
                anyhow::bail!(
                    "GEMINI_API_KEY or GOOGLE_AI_API_KEY not set.\n\
                     Set: export GEMINI_API_KEY=your-api-key\n\
                     Get your API key at: https://aistudio.google.com/app/apikey"
                );
            }
            let dimension = config.dimension.unwrap_or(DEFAULT_DIMENSION);
            let mut embedder = GeminiEmbedding::from_env_with_dimension(dimension)?;
            if let Some(ref base_url) = config.base_url {
                embedder = embedder.with_base_url(base_url.as_str());
            }
            Box::new(embedder)
        }
        EmbeddingBackend::Hash | EmbeddingBackend::Auto => {
            let dimension = config.dimension.unwrap_or(DEFAULT_HASH_DIMENSION);
            Box::new(HashEmbedding::new(dimension)?)
        }
    };

    tracing::info!(
        "Using {} embedding (dimension: {})",
        embedder.name(),
        embedder.dimension()
    );
    Ok(embedder)
}

// ============================================================================
// Tests
// ============================================================================
