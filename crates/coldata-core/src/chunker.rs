//! Character-window text splitter with boundary preference.
//!
//! Windows hold at most `chunk_size` characters and consecutive windows share
//! at most `chunk_overlap` characters. A cut is placed at the latest paragraph
//! break inside the window, else the latest line break, sentence end or
//! whitespace, and only then at the hard character limit.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{chunk_id, Chunk, Record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub add_start_index: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1024, chunk_overlap: 256, add_start_index: true }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("text.chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "text.chunk_overlap ({}) must be smaller than text.chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// A window over the source text: character offset plus the window text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
}

#[derive(Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const BOUNDARY_PREFERENCE: [Boundary; 4] = [Boundary::Paragraph, Boundary::Line, Boundary::Sentence, Boundary::Word];

impl TextChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    /// Splits a record's context string and assigns `{index}_{seq}` ids.
    ///
    /// A record with no text at all yields no chunks.
    pub fn chunk_record(&self, record: &Record) -> Vec<Chunk> {
        if record.info.trim().is_empty() && record.title.is_none() && record.description.is_none() && record.metadata.is_empty() {
            return Vec::new();
        }
        let context = record.context_text();
        self.split(&context)
            .into_iter()
            .enumerate()
            .map(|(sequence, span)| Chunk {
                chunk_id: chunk_id(&record.index, sequence),
                record_index: record.index.clone(),
                sequence,
                text: span.text,
                start_offset: self.config.add_start_index.then_some(span.start),
            })
            .collect()
    }

    /// Splits `text` into overlapping windows. Blank input yields nothing.
    pub fn split(&self, text: &str) -> Vec<TextSpan> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = text.chars().collect();
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        if chars.len() <= size {
            return vec![TextSpan { start: 0, text: text.to_string() }];
        }

        let mut spans = Vec::new();
        let mut start = 0usize;
        loop {
            let hard_end = (start + size).min(chars.len());
            let end = if hard_end == chars.len() {
                hard_end
            } else {
                // a cut before `start + overlap` would let the next window start behind this one
                let earliest = (start + overlap + 1).min(hard_end);
                find_cut(&chars, earliest, hard_end).unwrap_or(hard_end)
            };
            spans.push(TextSpan { start, text: chars[start..end].iter().collect() });
            if end == chars.len() {
                break;
            }
            let mut next = end.saturating_sub(overlap).max(start + 1);
            // begin the next window on a word start when the overlap region has one
            if let Some(word_start) = (next..end).find(|&i| i > 0 && chars[i - 1].is_whitespace() && !chars[i].is_whitespace()) {
                next = word_start;
            }
            start = next;
        }
        spans
    }
}

/// Latest cut position in `earliest..=hard_end`, tried per boundary kind.
fn find_cut(chars: &[char], earliest: usize, hard_end: usize) -> Option<usize> {
    BOUNDARY_PREFERENCE
        .iter()
        .find_map(|kind| (earliest..=hard_end).rev().find(|&end| is_boundary(chars, end, *kind)))
}

fn is_boundary(chars: &[char], end: usize, kind: Boundary) -> bool {
    if end == 0 {
        return false;
    }
    let last = chars[end - 1];
    match kind {
        Boundary::Paragraph => end >= 2 && last == '\n' && chars[end - 2] == '\n',
        Boundary::Line => last == '\n',
        Boundary::Sentence => end >= 2 && last.is_whitespace() && matches!(chars[end - 2], '.' | '!' | '?'),
        Boundary::Word => last.is_whitespace(),
    }
}
