//! Retrieval Session - 문서 처리와 질의응답 상태 관리
//!
//! 세션은 현재 인덱스 하나와 대화 기록을 가집니다.
//!
//! - `Empty`: 인덱스 없음 (세션 시작 상태)
//! - `Ready`: 인덱스 있음. 다시 처리하면 인덱스를 통째로 교체
//!
//! 처리(process)가 실패하면 이전 인덱스와 대화 기록은 그대로 남고,
//! 질문(ask) 중 에러는 사과 메시지로 바뀌어 기록됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RetrievalConfig;
use crate::embedding::{embed_chunks, embed_query_vector, EmbeddingProvider};
use crate::error::{PipelineError, PipelineResult};
use crate::extractor::{extract_documents, Document};

use super::chunker::Chunker;
use super::format::{format_response, APOLOGY_RESPONSE};
use super::vector::{SearchHit, VectorIndex};

// ============================================================================
// Types
// ============================================================================

/// 대화 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// 대화 한 턴
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// 처리 결과 요약
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    /// 처리한 문서 수
    pub documents: usize,
    /// 처리한 페이지 수
    pub pages: usize,
    /// 추출된 문자 수
    pub characters: usize,
    /// 인덱스된 청크 수
    pub chunks: usize,
}

/// 질문 결과
#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    /// 인덱스가 없어 질문을 처리하지 않음 (기록도 남기지 않음)
    NotReady,
    /// 검색 성공 (결과 0건 포함)
    Answered {
        response: String,
        hits: Vec<SearchHit>,
    },
    /// 임베딩/검색 실패 - 사과 메시지로 대체됨
    Failed {
        response: String,
        error: PipelineError,
    },
}

impl AskOutcome {
    /// 기록된 답변 텍스트
    pub fn response(&self) -> Option<&str> {
        match self {
            AskOutcome::NotReady => None,
            AskOutcome::Answered { response, .. } | AskOutcome::Failed { response, .. } => {
                Some(response)
            }
        }
    }
}

// ============================================================================
// RetrievalSession
// ============================================================================

/// 검색 세션
pub struct RetrievalSession {
    embedder: Box<dyn EmbeddingProvider>,
    chunker: Box<dyn Chunker>,
    config: RetrievalConfig,
    index: Option<VectorIndex>,
    history: Vec<ChatTurn>,
}

impl RetrievalSession {
    /// 새 세션 생성 (Empty 상태)
    pub fn new(
        embedder: Box<dyn EmbeddingProvider>,
        chunker: Box<dyn Chunker>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            chunker,
            config,
            index: None,
            history: Vec::new(),
        }
    }

    /// 문서 묶음 처리: 추출 → 청킹 → 임베딩 → 인덱스 교체
    pub async fn process(&mut self, documents: Vec<Document>) -> PipelineResult<ProcessReport> {
        let extracted = extract_documents(documents).await?;
        let mut report = self.process_text(&extracted.text).await?;
        report.documents = extracted.documents;
        report.pages = extracted.pages;
        Ok(report)
    }

    /// 이미 추출된 텍스트 처리: 청킹 → 임베딩 → 인덱스 교체
    pub async fn process_text(&mut self, text: &str) -> PipelineResult<ProcessReport> {
        // 새 인덱스가 완성되기 전에는 세션 상태를 건드리지 않음
        let index = self.build_index(text).await?;

        let report = ProcessReport {
            documents: 0,
            pages: 0,
            characters: text.chars().count(),
            chunks: index.len(),
        };

        self.index = Some(index);
        self.history.clear();

        tracing::info!(
            "Session ready: {} chunks from {} characters",
            report.chunks,
            report.characters
        );

        Ok(report)
    }

    async fn build_index(&self, text: &str) -> PipelineResult<VectorIndex> {
        if text.trim().is_empty() {
            return Err(PipelineError::ExtractionEmpty);
        }

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(PipelineError::ExtractionEmpty);
        }
        tracing::info!("Split into {} chunks ({})", chunks.len(), self.chunker.name());

        let vectors = embed_chunks(self.embedder.as_ref(), &chunks).await?;

        VectorIndex::build(chunks.into_iter().zip(vectors).collect())
    }

    /// 질문 처리
    ///
    /// Ready 상태에서는 항상 (질문, 답변) 두 턴을 기록합니다.
    /// 공백뿐인 질문은 검색 결과 없음으로 답합니다.
    pub async fn ask(&mut self, question: &str) -> AskOutcome {
        let index = match self.index() {
            Ok(index) => index,
            Err(_) => {
                tracing::warn!("Question received before any documents were processed");
                return AskOutcome::NotReady;
            }
        };

        let outcome = match self.retrieve(index, question).await {
            Ok(hits) => AskOutcome::Answered {
                response: format_response(&hits, self.config.excerpt_chars),
                hits,
            },
            Err(error) => {
                tracing::warn!("Failed to answer question: {}", error);
                AskOutcome::Failed {
                    response: APOLOGY_RESPONSE.to_string(),
                    error,
                }
            }
        };

        let response = outcome.response().unwrap_or(APOLOGY_RESPONSE).to_string();
        self.history.push(ChatTurn::new(Role::User, question));
        self.history.push(ChatTurn::new(Role::Assistant, response));

        outcome
    }

    async fn retrieve(&self, index: &VectorIndex, question: &str) -> PipelineResult<Vec<SearchHit>> {
        // 빈 질문은 영벡터가 되어 모든 점수가 같아지므로 검색하지 않음
        if question.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query = embed_query_vector(self.embedder.as_ref(), question).await?;
        let mut hits = index.search(&query, self.config.top_k)?;

        if let Some(min_score) = self.config.min_score {
            hits.retain(|hit| hit.score >= min_score);
        }

        tracing::debug!("Retrieved {} chunks for question", hits.len());
        Ok(hits)
    }

    /// 대화 기록 비우기 (인덱스는 유지)
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// 대화 기록
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// 인덱스 존재 여부
    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    /// 현재 인덱스 (없으면 `NoIndex`)
    pub fn index(&self) -> PipelineResult<&VectorIndex> {
        self.index.as_ref().ok_or(PipelineError::NoIndex)
    }

    /// 임베딩 프로바이더 이름
    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// 질문 처리 설정
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;

    use super::*;
    use crate::embedding::HashEmbedding;
    use crate::knowledge::chunker::{CharacterChunker, ChunkConfig};
    use crate::knowledge::format::NO_MATCH_RESPONSE;

    /// 스위치로 실패시킬 수 있는 프로바이더
    struct Switchable {
        inner: HashEmbedding,
        fail_documents: Arc<AtomicBool>,
        fail_queries: Arc<AtomicBool>,
    }

    #[async_trait]
    impl EmbeddingProvider for Switchable {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.fail_documents.load(Ordering::SeqCst) {
                anyhow::bail!("model offline");
            }
            self.inner.embed(text).await
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            if self.fail_queries.load(Ordering::SeqCst) {
                anyhow::bail!("model offline");
            }
            self.inner.embed(text).await
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn name(&self) -> &str {
            "switchable"
        }
    }

    struct Harness {
        session: RetrievalSession,
        fail_documents: Arc<AtomicBool>,
        fail_queries: Arc<AtomicBool>,
    }

    fn harness(config: RetrievalConfig) -> Harness {
        let fail_documents = Arc::new(AtomicBool::new(false));
        let fail_queries = Arc::new(AtomicBool::new(false));
        let embedder = Switchable {
            inner: HashEmbedding::with_defaults(),
            fail_documents: fail_documents.clone(),
            fail_queries: fail_queries.clone(),
        };
        let chunker = CharacterChunker::new(ChunkConfig {
            chunk_size: 40,
            chunk_overlap: 10,
            separator: "\n".to_string(),
        })
        .expect("valid config");

        Harness {
            session: RetrievalSession::new(Box::new(embedder), Box::new(chunker), config),
            fail_documents,
            fail_queries,
        }
    }

    const CORPUS: &str = "Rust guarantees memory safety\n\
                          Ownership rules are checked at compile time\n\
                          The borrow checker rejects dangling references\n\
                          Cargo builds and tests Rust packages\n\
                          Bananas are rich in potassium";

    #[tokio::test]
    async fn test_ask_before_process_is_not_ready() {
        let mut h = harness(RetrievalConfig::default());
        assert!(!h.session.is_ready());
        assert_eq!(h.session.ask("x").await, AskOutcome::NotReady);
        assert!(h.session.history().is_empty());
        assert_eq!(h.session.index().err(), Some(PipelineError::NoIndex));
    }

    #[tokio::test]
    async fn test_process_no_documents() {
        let mut h = harness(RetrievalConfig::default());
        let result = h.session.process(vec![]).await;
        assert_eq!(result.err(), Some(PipelineError::NoDocuments));
        assert!(!h.session.is_ready());
    }

    #[tokio::test]
    async fn test_process_and_ask() {
        let mut h = harness(RetrievalConfig::default());
        let report = h.session.process_text(CORPUS).await.expect("process");
        assert_eq!(report.characters, CORPUS.chars().count());
        assert!(report.chunks >= 3);
        assert!(h.session.is_ready());

        let outcome = h.session.ask("what does the borrow checker reject").await;
        match &outcome {
            AskOutcome::Answered { response, hits } => {
                assert_eq!(hits.len(), 3);
                assert!(hits[0].chunk.content.contains("borrow checker"));
                assert!(response.starts_with("Based on your documents"));
                assert!(response.contains("**Excerpt 3:**"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let history = h.session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "what does the borrow checker reject");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(Some(history[1].content.as_str()), outcome.response());
    }

    #[tokio::test]
    async fn test_ask_error_records_apology() {
        let mut h = harness(RetrievalConfig::default());
        h.session.process_text(CORPUS).await.expect("process");

        h.fail_queries.store(true, Ordering::SeqCst);
        let outcome = h.session.ask("anything").await;
        assert!(matches!(
            outcome,
            AskOutcome::Failed {
                error: PipelineError::EmbeddingUnavailable(_),
                ..
            }
        ));

        let history = h.session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, APOLOGY_RESPONSE);

        // 실패 후에도 계속 사용 가능
        h.fail_queries.store(false, Ordering::SeqCst);
        assert!(matches!(
            h.session.ask("cargo").await,
            AskOutcome::Answered { .. }
        ));
        assert_eq!(h.session.history().len(), 4);
    }

    #[tokio::test]
    async fn test_zero_match_records_fixed_message() {
        let mut h = harness(RetrievalConfig {
            min_score: Some(0.99),
            ..Default::default()
        });
        h.session.process_text(CORPUS).await.expect("process");

        let outcome = h.session.ask("quantum chromodynamics").await;
        match outcome {
            AskOutcome::Answered { response, hits } => {
                assert!(hits.is_empty());
                assert_eq!(response, NO_MATCH_RESPONSE);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(h.session.history().len(), 2);
        assert_eq!(h.session.history()[1].content, NO_MATCH_RESPONSE);
    }

    #[tokio::test]
    async fn test_failed_reprocess_keeps_index_and_history() {
        let mut h = harness(RetrievalConfig::default());
        h.session.process_text(CORPUS).await.expect("process");
        h.session.ask("rust").await;
        let chunks_before = h.session.index().expect("index").len();

        let empty = h.session.process_text("  \n  ").await;
        assert_eq!(empty.err(), Some(PipelineError::ExtractionEmpty));

        h.fail_documents.store(true, Ordering::SeqCst);
        let offline = h.session.process_text("new corpus\nwith other text").await;
        assert!(matches!(offline, Err(PipelineError::EmbeddingUnavailable(_))));

        assert!(h.session.is_ready());
        assert_eq!(h.session.index().expect("index").len(), chunks_before);
        assert_eq!(h.session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_reprocess_replaces_index_and_clears_history() {
        let mut h = harness(RetrievalConfig::default());
        h.session.process_text(CORPUS).await.expect("process");
        h.session.ask("rust").await;
        assert_eq!(h.session.history().len(), 2);

        let report = h
            .session
            .process_text("Completely different corpus")
            .await
            .expect("process");
        assert_eq!(report.chunks, 1);
        assert!(h.session.history().is_empty());

        let index = h.session.index().expect("index");
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.chunks().next().map(|c| c.content.as_str()),
            Some("Completely different corpus")
        );
    }

    #[tokio::test]
    async fn test_blank_question_matches_nothing() {
        let mut h = harness(RetrievalConfig::default());
        h.session.process_text(CORPUS).await.expect("process");

        // 임베딩 호출이 일어나면 실패하도록
        h.fail_queries.store(true, Ordering::SeqCst);
        for question in ["", "   ", "\n\t"] {
            match h.session.ask(question).await {
                AskOutcome::Answered { response, hits } => {
                    assert!(hits.is_empty());
                    assert_eq!(response, NO_MATCH_RESPONSE);
                }
                other => panic!("unexpected outcome: {:?}", other),
            }
        }

        let history = h.session.history();
        assert_eq!(history.len(), 6);
        assert_eq!(history[4].role, Role::User);
        assert_eq!(history[5].content, NO_MATCH_RESPONSE);
    }

    #[tokio::test]
    async fn test_clear_history_keeps_index() {
        let mut h = harness(RetrievalConfig::default());
        h.session.process_text(CORPUS).await.expect("process");
        h.session.ask("cargo").await;
        h.session.ask("bananas").await;
        assert_eq!(h.session.history().len(), 4);

        h.session.clear_history();
        assert!(h.session.history().is_empty());
        assert!(h.session.is_ready());
        assert!(matches!(
            h.session.ask("cargo").await,
            AskOutcome::Answered { .. }
        ));
    }
}
