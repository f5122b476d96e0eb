//! Text Chunking Module
//!
//! 구분자 단위로 텍스트를 나눈 뒤, 고정 크기 윈도우에 순서대로 채워 넣어
//! 서로 겹치는 청크를 만듭니다.
//!
//! 길이는 모두 유니코드 코드 포인트(char) 기준입니다.
//!
//! ## 경계 규칙
//! - 구분자로 나뉜 단위(unit)는 절대 쪼개지 않습니다.
//! - 단위를 추가하면 `chunk_size`를 넘는 경우 현재 윈도우를 청크로 내보내고,
//!   끝쪽 단위들 중 `chunk_overlap` 이하 길이만 남긴 채 다음 윈도우를 시작합니다.
//! - 단위 하나가 `chunk_size`보다 길면 그대로 하나의 청크가 됩니다.
//! - 빈 구분자는 문자 하나하나를 단위로 취급합니다.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

// ============================================================================
// Chunk
// ============================================================================

/// 청크 - 원문에서 잘라낸 연속 구간
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 청크 순번 (0부터)
    pub index: usize,
    /// 청크 텍스트 (원문 `start..end` 구간 그대로)
    pub content: String,
    /// 원문 내 시작 위치 (char 단위, 포함)
    pub start: usize,
    /// 원문 내 끝 위치 (char 단위, 미포함)
    pub end: usize,
}

impl Chunk {
    /// 청크 길이 (char 단위)
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 기본 청크 크기 (문자 수)
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// 기본 오버랩 크기 (문자 수)
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// 기본 구분자
pub const DEFAULT_SEPARATOR: &str = "\n";

/// 청킹 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// 청크 최대 크기 (문자 수)
    pub chunk_size: usize,
    /// 인접 청크 간 오버랩 크기 (문자 수)
    pub chunk_overlap: usize,
    /// 단위 구분자
    pub separator: String,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl ChunkConfig {
    /// `chunk_size > chunk_overlap >= 0` 검증
    pub fn validate(&self) -> PipelineResult<()> {
        if self.chunk_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(PipelineError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<Chunk>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// CharacterChunker
// ============================================================================

/// 구분자로 나뉜 단위 (원문 내 위치)
#[derive(Debug, Clone, Copy)]
struct Unit {
    byte_start: usize,
    byte_end: usize,
    char_start: usize,
    char_end: usize,
}

/// 문자 수 기반 슬라이딩 윈도우 청커
#[derive(Debug, Clone)]
pub struct CharacterChunker {
    config: ChunkConfig,
}

impl CharacterChunker {
    /// 설정으로 생성 (설정이 잘못되면 `InvalidConfig`)
    pub fn new(config: ChunkConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 기본 설정으로 생성 (1000 / 200 / "\n")
    pub fn with_defaults() -> Self {
        Self {
            config: ChunkConfig::default(),
        }
    }

    /// 현재 설정
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 텍스트를 단위로 분할
    ///
    /// 공백뿐인 단위는 버립니다. 버려진 단위는 청크 경계가 되지 않을 뿐,
    /// 두 단위 사이에 끼어 있으면 청크 내용에는 그대로 남습니다.
    fn split_units(&self, text: &str) -> Vec<Unit> {
        let mut units = Vec::new();
        let mut char_pos = 0;

        if self.config.separator.is_empty() {
            for (byte_start, ch) in text.char_indices() {
                if !ch.is_whitespace() {
                    units.push(Unit {
                        byte_start,
                        byte_end: byte_start + ch.len_utf8(),
                        char_start: char_pos,
                        char_end: char_pos + 1,
                    });
                }
                char_pos += 1;
            }
            return units;
        }

        let separator = self.config.separator.as_str();
        let separator_chars = separator.chars().count();
        let mut byte_start = 0;

        for piece in text.split(separator) {
            let piece_chars = piece.chars().count();
            if !piece.trim().is_empty() {
                units.push(Unit {
                    byte_start,
                    byte_end: byte_start + piece.len(),
                    char_start: char_pos,
                    char_end: char_pos + piece_chars,
                });
            }
            byte_start += piece.len() + separator.len();
            char_pos += piece_chars + separator_chars;
        }

        units
    }
}

/// 두 단위 사이 구간 길이 (char 단위)
#[inline]
fn span(units: &[Unit], first: usize, last: usize) -> usize {
    units[last].char_end - units[first].char_start
}

impl Chunker for CharacterChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return vec![];
        }

        let units = self.split_units(text);
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut window: VecDeque<usize> = VecDeque::new();

        let emit = |window: &VecDeque<usize>, chunks: &mut Vec<Chunk>| {
            if let (Some(&first), Some(&last)) = (window.front(), window.back()) {
                let (a, b) = (units[first], units[last]);
                chunks.push(Chunk {
                    index: chunks.len(),
                    content: text[a.byte_start..b.byte_end].to_string(),
                    start: a.char_start,
                    end: b.char_end,
                });
            }
        };

        for next in 0..units.len() {
            if let (Some(&first), Some(&last)) = (window.front(), window.back()) {
                if span(&units, first, next) > size {
                    emit(&window, &mut chunks);

                    // 오버랩 구간만 남기고 앞쪽 단위 제거
                    while let Some(&front) = window.front() {
                        if span(&units, front, last) > overlap
                            || span(&units, front, next) > size
                        {
                            window.pop_front();
                        } else {
                            break;
                        }
                    }
                }
            }
            window.push_back(next);
        }

        emit(&window, &mut chunks);

        tracing::debug!(
            "Chunked {} units into {} chunks (size={}, overlap={})",
            units.len(),
            chunks.len(),
            size,
            overlap
        );

        chunks
    }

    fn name(&self) -> &'static str {
        "CharacterChunker"
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 설정을 지정하여 청커 생성
pub fn character_chunker(config: ChunkConfig) -> PipelineResult<Box<dyn Chunker>> {
    Ok(Box::new(CharacterChunker::new(config)?))
}

// ============================================================================
// Tests
// ============================================================================
