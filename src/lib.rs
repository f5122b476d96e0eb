//! pdf-chat - PDF 문서 질의응답 파이프라인
//!
//! PDF 텍스트 추출 → 청킹 → 임베딩 → 메모리 벡터 인덱스 → 검색 세션
//! 순서로 동작하는 로컬 RAG 도구입니다.

pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod knowledge;

// Re-exports
pub use config::{AppConfig, EmbeddingBackend, EmbeddingConfig, RetrievalConfig};
pub use embedding::{
    create_embedder, get_api_key, has_api_key, EmbeddingProvider, GeminiEmbedding, HashEmbedding,
};
pub use error::{PipelineError, PipelineResult};
pub use extractor::{extract_documents, Document, ExtractedText};
pub use knowledge::{
    character_chunker, format_response, AskOutcome, CharacterChunker, ChatTurn,
    Chunk, ChunkConfig, Chunker, ProcessReport, RetrievalSession, Role, SearchHit, VectorIndex,
};
