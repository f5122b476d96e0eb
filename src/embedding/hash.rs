//! 로컬 해시 임베딩
//!
//! API 키 없이 동작하는 결정적(deterministic) 임베딩입니다.
//! 소문자화한 단어 토큰을 SHA-256으로 해싱해 고정 개수의 버킷에
//! 부호 있는 값으로 누적한 뒤 L2 정규화합니다 (feature hashing).
//! 같은 단어를 공유하는 텍스트끼리 유사도가 높아집니다.

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::EmbeddingProvider;
use crate::knowledge::normalize;

/// 기본 버킷 수
pub const DEFAULT_HASH_DIMENSION: usize = 384;

/// 해시 임베딩 구현체
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    /// 버킷 수를 지정하여 생성
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            anyhow::bail!("Hash embedding dimension must be greater than 0");
        }
        Ok(Self { dimension })
    }

    /// 기본 차원으로 생성
    pub fn with_defaults() -> Self {
        Self {
            dimension: DEFAULT_HASH_DIMENSION,
        }
    }

    /// 텍스트를 벡터로 변환 (동기)
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalize(&mut vector);
        vector
    }
}

/// 영숫자 단어 토큰 (소문자)
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash-embedding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::cosine_similarity;

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(HashEmbedding::new(0).is_err());
    }

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashEmbedding::with_defaults();
        let a = embedder.embed_text("The quick brown fox");
        let b = embedder.embed_text("the QUICK brown, fox!");
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_HASH_DIMENSION);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_score_higher() {
        let embedder = HashEmbedding::with_defaults();
        let query = embedder.embed_text("rust ownership rules");
        let related = embedder.embed_text("ownership rules in rust are checked at compile time");
        let unrelated = embedder.embed_text("banana bread recipe with walnuts");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedding::new(16).expect("embedder");
        assert!(embedder.embed_text("  ...  ").iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_query_matches_document_embedding() {
        let embedder = HashEmbedding::with_defaults();
        let doc = embedder.embed("same text").await.expect("embed");
        let query = embedder.embed_query("same text").await.expect("embed");
        assert_eq!(doc, query);
    }
}
