//! Google Gemini 임베딩 프로바이더
//!
//! source: https://ai.google.dev/gemini-api/docs/embeddings
//!
//! 요청 하나는 rate limiter 슬롯을 얻은 뒤 전송되고, 응답은
//! [`Attempt`]로 분류됩니다. 429/5xx와 전송 실패만 재시도합니다.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{get_api_key, EmbeddingProvider};

/// Gemini API 기본 주소
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// 임베딩 모델 (gemini-embedding-001 - MRL 지원)
const GEMINI_MODEL: &str = "models/gemini-embedding-001";

/// 기본 임베딩 차원
pub const DEFAULT_DIMENSION: usize = 768;

/// 지원 차원
pub const SUPPORTED_DIMENSIONS: [usize; 3] = [768, 1536, 3072];

/// 무료 티어 한도: 분당 60회
const REQUESTS_PER_WINDOW: usize = 60;
const RATE_WINDOW: Duration = Duration::from_secs(60);
/// 연속 요청 사이 최소 간격
const MIN_SPACING: Duration = Duration::from_millis(1000);
/// 첫 시도 이후 재시도 횟수
const MAX_RETRIES: u32 = 3;
/// 재시도 대기 시간 기준값 (시도마다 두 배)
const BASE_BACKOFF: Duration = Duration::from_millis(2000);

// ============================================================================
// Rate Limiter
// ============================================================================

/// 슬라이딩 윈도우 + 최소 간격 제한
#[derive(Debug)]
struct RateLimiter {
    sent: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
    min_spacing: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration, min_spacing: Duration) -> Self {
        Self {
            sent: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
            min_spacing,
        }
    }

    /// `now`에 요청을 보내려면 기다려야 하는 시간
    fn wait_time(&mut self, now: Instant) -> Duration {
        while let Some(&oldest) = self.sent.front() {
            if now.saturating_duration_since(oldest) < self.window {
                break;
            }
            self.sent.pop_front();
        }

        let spacing = self
            .sent
            .back()
            .map(|&last| {
                self.min_spacing
                    .saturating_sub(now.saturating_duration_since(last))
            })
            .unwrap_or_default();

        let quota = match self.sent.front() {
            Some(&oldest) if self.sent.len() >= self.max_requests => self
                .window
                .saturating_sub(now.saturating_duration_since(oldest)),
            _ => Duration::ZERO,
        };

        spacing.max(quota)
    }

    /// 슬롯이 날 때까지 대기한 뒤 요청을 기록
    async fn acquire(&mut self) {
        let wait = self.wait_time(Instant::now());
        if !wait.is_zero() {
            tracing::debug!("Rate limiter: waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
        self.sent.push_back(Instant::now());
    }
}

// ============================================================================
// Wire Types
// ============================================================================

/// Gemini API 요청 본문
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'static str,
    content: Content<'a>,
    task_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Gemini API 응답
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Values,
}

#[derive(Debug, Deserialize)]
struct Values {
    values: Vec<f32>,
}

/// Gemini API 에러 응답
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

// ============================================================================
// Attempt
// ============================================================================

/// 요청 한 번의 결과
#[derive(Debug)]
enum Attempt {
    /// 임베딩 수신
    Done(Vec<f32>),
    /// 일시적 실패 (429, 5xx, 전송 실패)
    Retry(anyhow::Error),
    /// 재시도해도 소용없는 실패
    Fatal(anyhow::Error),
}

/// HTTP 응답을 시도 결과로 분류
fn classify(status: StatusCode, body: &str) -> Attempt {
    if status.is_success() {
        return match serde_json::from_str::<EmbedResponse>(body) {
            Ok(parsed) => Attempt::Done(parsed.embedding.values),
            Err(e) => Attempt::Fatal(
                anyhow::Error::new(e).context("Failed to parse embedding response"),
            ),
        };
    }

    let detail = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => format!("{}: {}", parsed.error.status, parsed.error.message),
        Err(_) => body.trim().to_string(),
    };
    let error = anyhow::anyhow!("Gemini API error ({}) {}", status.as_u16(), detail);

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Attempt::Retry(error)
    } else {
        Attempt::Fatal(error)
    }
}

/// `attempt`번째 재시도 전 대기 시간
fn backoff(attempt: u32) -> Duration {
    BASE_BACKOFF * 2u32.saturating_pow(attempt)
}

// ============================================================================
// GeminiEmbedding
// ============================================================================

/// Google Gemini 임베딩 구현체
#[derive(Debug)]
pub struct GeminiEmbedding {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    dimension: usize,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl GeminiEmbedding {
    /// 새 Gemini 임베딩 인스턴스 생성 (기본 차원)
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_dimension(api_key, DEFAULT_DIMENSION)
    }

    /// 차원을 지정하여 생성 (768, 1536, 3072 중 하나)
    pub fn with_dimension(api_key: String, dimension: usize) -> Result<Self> {
        if !SUPPORTED_DIMENSIONS.contains(&dimension) {
            anyhow::bail!(
                "Invalid dimension: {}. Must be one of {:?}",
                dimension,
                SUPPORTED_DIMENSIONS
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            client,
            dimension,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(
                REQUESTS_PER_WINDOW,
                RATE_WINDOW,
                MIN_SPACING,
            ))),
        })
    }

    /// 환경변수에서 API 키를 읽어 차원 지정하여 생성
    pub fn from_env_with_dimension(dimension: usize) -> Result<Self> {
        Self::with_dimension(get_api_key()?, dimension)
    }

    /// API 주소 변경 (프록시, 테스트 서버)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:embedContent", self.base_url, GEMINI_MODEL)
    }

    /// 요청 한 번 전송 (API 키는 URL이 아닌 헤더로)
    async fn send_once(&self, endpoint: &str, request: &EmbedRequest<'_>) -> Attempt {
        self.rate_limiter.lock().await.acquire().await;

        let response = match self
            .client
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Attempt::Retry(
                    anyhow::Error::new(e).context("Failed to send embedding request"),
                )
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => classify(status, &body),
            Err(e) => Attempt::Retry(anyhow::Error::new(e).context("Failed to read response body")),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // 빈 텍스트는 요청 없이 영벡터
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let request = EmbedRequest {
            model: GEMINI_MODEL,
            content: Content {
                parts: [Part { text }],
            },
            task_type: "RETRIEVAL_DOCUMENT",
            output_dimensionality: Some(self.dimension),
        };
        let endpoint = self.endpoint();

        let mut attempt = 0;
        loop {
            match self.send_once(&endpoint, &request).await {
                Attempt::Done(values) => return Ok(values),
                Attempt::Fatal(e) => return Err(e),
                Attempt::Retry(e) if attempt >= MAX_RETRIES => {
                    return Err(e.context(format!(
                        "Embedding failed after {} retries",
                        MAX_RETRIES
                    )));
                }
                Attempt::Retry(e) => {
                    let wait = backoff(attempt);
                    attempt += 1;
                    tracing::warn!(
                        "{:#}; retrying in {:?} ({}/{})",
                        e,
                        wait,
                        attempt,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // 배치 API 대신 순차 호출 (rate limiter가 속도 조절)
        let mut results = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            tracing::debug!("Embedding {}/{}", i + 1, texts.len());
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "gemini-embedding-001"
    }
}

// ============================================================================
// Tests
// ============================================================================
