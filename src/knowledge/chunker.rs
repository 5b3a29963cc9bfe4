//! Text Chunking Module
//!
//! 구분자 우선 문자 단위 텍스트 분할을 제공합니다.
//! 모든 길이는 바이트가 아닌 문자(char) 수 기준입니다.

use serde::{Deserialize, Serialize};

use crate::config::ChunkConfig;
use crate::error::Result;

// ============================================================================
// Chunk
// ============================================================================

/// 분할된 텍스트 조각
///
/// `start`/`end`는 전체 텍스트 기준 문자 오프셋입니다 (`end` 미포함).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 분할 순서 (0-based)
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Chunk {
    /// 청크 길이 (문자 수)
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn split(&self, text: &str) -> Vec<Chunk>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// CharacterSplitter
// ============================================================================

/// 구분자 우선 문자 청커
///
/// - 최대 `chunk_size` 문자의 창(window)으로 자릅니다.
/// - 창 안에 구분자가 있으면 마지막 구분자 바로 뒤에서 자르고,
///   없으면 `chunk_size`에서 그대로 자릅니다.
/// - 다음 청크는 이전 청크 끝에서 정확히 `chunk_overlap` 문자 앞에서 시작합니다.
///
/// 구분자 컷은 청크가 `chunk_size`의 절반 이상일 때만 사용합니다.
pub struct CharacterSplitter {
    config: ChunkConfig,
    separator: Vec<char>,
}

impl CharacterSplitter {
    /// 설정으로 생성 (설정 검증 포함)
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        let separator = config.separator.chars().collect();
        Ok(Self { config, separator })
    }

    /// 기본 설정 (1000 / 200 / "\n")
    pub fn with_defaults() -> Self {
        let config = ChunkConfig::default();
        let separator = config.separator.chars().collect();
        Self { config, separator }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// `[start, hard_end)` 창의 끝 위치 결정
    fn cut_point(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        let sep_len = self.separator.len();
        if sep_len == 0 {
            return hard_end;
        }

        // 다음 청크가 앞으로 나아가려면 end > start + overlap 이어야 함
        let min_end = start
            + (self.config.chunk_overlap + 1)
                .max(self.config.chunk_size / 2)
                .max(sep_len);

        let mut end = hard_end;
        while end >= min_end {
            if chars[end - sep_len..end] == self.separator[..] {
                return end;
            }
            end -= 1;
        }

        hard_end
    }
}

impl Chunker for CharacterSplitter {
    fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return vec![];
        }

        let chars: Vec<char> = text.chars().collect();
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = chars.len();

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = if total - start <= self.config.chunk_size {
                total
            } else {
                self.cut_point(&chars, start, start + self.config.chunk_size)
            };

            chunks.push(Chunk {
                index: chunks.len(),
                start,
                end,
                text: text[offsets[start]..offsets[end]].to_string(),
            });

            if end == total {
                break;
            }
            start = end - self.config.chunk_overlap;
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "CharacterSplitter"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 청크를 다시 이어붙여 원본 텍스트 복원
///
/// 각 청크에서 이전 청크와 겹치는 앞부분을 버립니다.
pub fn rejoin(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut covered: usize = 0;

    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.start);
        text.extend(chunk.text.chars().skip(skip));
        covered = chunk.end;
    }

    text
}

// ============================================================================
// Tests
// ============================================================================
