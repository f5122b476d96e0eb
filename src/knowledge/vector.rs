//! Vector Index - 인메모리 유사도 검색
//!
//! 한 번의 처리 배치에서 만들어진 (청크, 임베딩) 쌍 전체를 보관하는
//! 불변 인덱스입니다. 검색은 전수 코사인 유사도 비교입니다.

use std::cmp::Ordering;

use crate::error::{PipelineError, PipelineResult};

use super::chunker::Chunk;

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (청크 + 정규화된 임베딩)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// 원본 청크
    pub chunk: Chunk,
    /// L2 정규화된 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// 매칭된 청크
    pub chunk: Chunk,
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub score: f32,
}

// ============================================================================
// VectorIndex
// ============================================================================

/// 불변 벡터 인덱스
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<VectorEntry>,
    dimension: usize,
}

impl VectorIndex {
    /// (청크, 임베딩) 쌍으로 인덱스 생성
    ///
    /// 쌍이 비어 있으면 `EmptyCorpus`, 벡터 길이가 제각각이면
    /// `DimensionMismatch`를 반환합니다. 실패 시 아무것도 만들어지지 않습니다.
    pub fn build(pairs: Vec<(Chunk, Vec<f32>)>) -> PipelineResult<Self> {
        let dimension = match pairs.first() {
            Some((_, embedding)) => embedding.len(),
            None => return Err(PipelineError::EmptyCorpus),
        };

        if dimension == 0 {
            return Err(PipelineError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }

        if let Some((_, bad)) = pairs.iter().find(|(_, e)| e.len() != dimension) {
            return Err(PipelineError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let entries = pairs
            .into_iter()
            .map(|(chunk, mut embedding)| {
                normalize(&mut embedding);
                VectorEntry { chunk, embedding }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "Built vector index: {} chunks (dimension: {})",
            entries.len(),
            dimension
        );

        Ok(Self { entries, dimension })
    }

    /// 쿼리 벡터와 가장 유사한 청크 최대 `k`개 검색
    ///
    /// 유사도 내림차순, 동점이면 청크 인덱스 오름차순입니다.
    pub fn search(&self, query: &[f32], k: usize) -> PipelineResult<Vec<SearchHit>> {
        if k == 0 {
            return Err(PipelineError::InvalidConfig(
                "k must be greater than 0".to_string(),
            ));
        }

        if query.len() != self.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f32, &VectorEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query, &entry.embedding), entry))
            .collect();

        scored.sort_by(|(score_a, a), (score_b, b)| {
            match score_b.total_cmp(score_a) {
                Ordering::Equal => a.chunk.index.cmp(&b.chunk.index),
                ord => ord,
            }
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| SearchHit {
                chunk: entry.chunk.clone(),
                score,
            })
            .collect())
    }

    /// 인덱스된 청크 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 여부 (build가 성공했다면 항상 false)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 임베딩 차원
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// 인덱스된 청크 (순서대로)
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다. 길이가 다르거나 영벡터면 0.0입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// L2 정규화 (제자리)
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

// ============================================================================
// Tests
// ============================================================================
