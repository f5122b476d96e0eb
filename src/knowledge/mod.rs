//! Knowledge 모듈 - 청킹, 벡터 인덱스, 검색 세션
//!
//! - Chunker: 구분자 단위 슬라이딩 윈도우 텍스트 분할
//! - Vector: 메모리 내 코사인 유사도 인덱스
//! - Format: 검색 결과를 답변 텍스트로 변환
//! - Session: 처리/질문/대화 기록 상태 관리

mod chunker;
mod format;
mod session;
mod vector;

// Re-exports
pub use chunker::{
    character_chunker, CharacterChunker, Chunk, ChunkConfig, Chunker,
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SEPARATOR,
};
pub use format::{format_response, APOLOGY_RESPONSE, NO_MATCH_RESPONSE};
pub use session::{AskOutcome, ChatTurn, ProcessReport, RetrievalSession, Role};
pub use vector::{cosine_similarity, normalize, SearchHit, VectorEntry, VectorIndex};
