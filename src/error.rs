//! 파이프라인 에러 타입
//!
//! 추출 → 청킹 → 임베딩 → 인덱스 각 단계의 실패를 닫힌 열거형으로 표현합니다.
//! 네트워크/파일 I/O 같은 하위 에러는 `anyhow`로 다루고,
//! 단계 경계에서 이 타입으로 변환합니다.

use thiserror::Error;

/// 파이프라인 결과 타입
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// 파이프라인 단계별 에러
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// 처리할 문서가 하나도 없음 (추출 전에 검사)
    #[error("no documents supplied")]
    NoDocuments,

    /// 문서 파싱 실패
    #[error("failed to extract text from {document}: {message}")]
    Extraction { document: String, message: String },

    /// 문서에서 텍스트를 얻지 못함
    #[error("no text could be extracted from the documents")]
    ExtractionEmpty,

    /// 청커/검색 설정 오류
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// 임베딩 모델 호출 실패 또는 잘못된 벡터
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// 인덱스 빌더에 청크가 전달되지 않음
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    /// 벡터 차원 불일치
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// 인덱스가 없는 상태에서 검색 시도
    #[error("no index has been built yet")]
    NoIndex,
}

impl PipelineError {
    /// anyhow 에러 체인을 임베딩 실패로 변환
    pub fn embedding(err: anyhow::Error) -> Self {
        Self::EmbeddingUnavailable(format!("{:#}", err))
    }
}
