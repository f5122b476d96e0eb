//! 설정 모듈
//!
//! 기본값 → 환경변수(.env 포함) → CLI 플래그 순으로 덮어씁니다.
//!
//! | 환경변수 | 의미 |
//! |---|---|
//! | `PDF_CHAT_CHUNK_SIZE` | 청크 크기 (문자) |
//! | `PDF_CHAT_CHUNK_OVERLAP` | 청크 오버랩 (문자) |
//! | `PDF_CHAT_TOP_K` | 질문당 검색할 청크 수 |
//! | `PDF_CHAT_EXCERPT_CHARS` | 발췌 길이 (문자) |
//! | `PDF_CHAT_MIN_SCORE` | 이 유사도 미만의 결과는 버림 |
//! | `PDF_CHAT_EMBEDDER` | `auto` / `gemini` / `hash` |
//! | `PDF_CHAT_DIMENSION` | 임베딩 차원 |
//! | `PDF_CHAT_GEMINI_BASE_URL` | Gemini API 주소 |

use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::knowledge::ChunkConfig;

// ============================================================================
// Retrieval
// ============================================================================

/// 기본 검색 개수
pub const DEFAULT_TOP_K: usize = 3;
/// 기본 발췌 길이 (문자)
pub const DEFAULT_EXCERPT_CHARS: usize = 300;

/// 질문 처리 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// 질문당 검색할 청크 수
    pub top_k: usize,
    /// 청크당 발췌 길이 (문자)
    pub excerpt_chars: usize,
    /// 최소 유사도 (없으면 상위 k개를 모두 사용)
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            min_score: None,
        }
    }
}

// ============================================================================
// Embedding
// ============================================================================

/// 임베딩 백엔드 선택
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// API 키가 있으면 Gemini, 없으면 Hash
    #[default]
    Auto,
    /// Google Gemini API
    Gemini,
    /// 로컬 해시 임베딩
    Hash,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gemini" => Ok(Self::Gemini),
            "hash" => Ok(Self::Hash),
            other => anyhow::bail!("Unknown embedder '{}'. Use auto, gemini or hash", other),
        }
    }
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Gemini => "gemini",
            Self::Hash => "hash",
        };
        f.write_str(name)
    }
}

/// 임베딩 설정
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// 백엔드
    pub backend: EmbeddingBackend,
    /// 차원 (없으면 백엔드 기본값)
    pub dimension: Option<usize>,
    /// Gemini API 주소 (없으면 공식 주소)
    pub base_url: Option<String>,
}

impl EmbeddingConfig {
    /// `Auto`를 실제 백엔드로 확정
    pub fn resolve_backend(&self, has_api_key: bool) -> EmbeddingBackend {
        match self.backend {
            EmbeddingBackend::Auto if has_api_key => EmbeddingBackend::Gemini,
            EmbeddingBackend::Auto => EmbeddingBackend::Hash,
            other => other,
        }
    }
}

// ============================================================================
// AppConfig
// ============================================================================

/// 전체 설정
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub chunk: ChunkConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
}

impl AppConfig {
    /// 기본값 위에 환경변수를 적용
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수로 설정 구성 (테스트용 분리)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, "PDF_CHAT_CHUNK_SIZE")? {
            config.chunk.chunk_size = v;
        }
        if let Some(v) = parse_var(&lookup, "PDF_CHAT_CHUNK_OVERLAP")? {
            config.chunk.chunk_overlap = v;
        }
        if let Some(v) = parse_var(&lookup, "PDF_CHAT_TOP_K")? {
            config.retrieval.top_k = v;
        }
        if let Some(v) = parse_var(&lookup, "PDF_CHAT_EXCERPT_CHARS")? {
            config.retrieval.excerpt_chars = v;
        }
        if let Some(v) = parse_var(&lookup, "PDF_CHAT_MIN_SCORE")? {
            config.retrieval.min_score = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "PDF_CHAT_EMBEDDER")? {
            config.embedding.backend = v;
        }
        if let Some(v) = parse_var(&lookup, "PDF_CHAT_DIMENSION")? {
            config.embedding.dimension = Some(v);
        }
        if let Some(v) = lookup("PDF_CHAT_GEMINI_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.embedding.base_url = Some(v);
        }

        Ok(config)
    }

    /// 설정 검증 (청커 파라미터, top_k)
    pub fn validate(&self) -> Result<()> {
        self.chunk.validate()?;
        if self.retrieval.top_k == 0 {
            anyhow::bail!("top_k must be greater than 0");
        }
        if let Some(min) = self.retrieval.min_score {
            if !(-1.0..=1.0).contains(&min) {
                anyhow::bail!("min_score must be between -1.0 and 1.0, got {}", min);
            }
        }
        Ok(())
    }
}

/// 비어 있지 않은 환경변수를 파싱
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        _ => Ok(None),
    }
}

/// `.env` 파일 로드 (없으면 무시)
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {:?}", path),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to load .env: {}", e),
    }
}

// ============================================================================
// Tests
// ============================================================================
