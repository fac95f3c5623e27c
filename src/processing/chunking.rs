//! Recursive character chunking with overlap.
//!
//! Page text is first broken into *pieces* using the separators `"\n\n"`, `"\n"` and `" "` in
//! that priority order; a piece that still exceeds the budget is split with the next separator,
//! and as a last resort hard-cut every `max_chars` characters. Separators stay attached to the
//! end of the piece they terminate, so the pieces always concatenate back to the input.
//!
//! Pieces are then merged greedily into chunks of at most `max_chars` characters. Whenever a
//! chunk is emitted, the trailing pieces totalling no more than `overlap` characters are carried
//! into the next chunk. Every chunk is therefore a contiguous slice of the page and records how
//! many of its leading characters repeat the previous chunk.
//!
//! Lengths are measured in `char`s, never bytes.

use std::collections::VecDeque;

use super::types::{Chunk, ChunkingError, Document};

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Size limits applied by the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerSettings {
    /// Maximum characters per chunk.
    pub max_chars: usize,
    /// Maximum characters copied from the previous chunk.
    pub overlap: usize,
}

impl Default for ChunkerSettings {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap: 200,
        }
    }
}

impl ChunkerSettings {
    /// Validate the settings, rejecting budgets the merge step cannot honour.
    pub fn new(max_chars: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if max_chars == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if overlap >= max_chars {
            return Err(ChunkingError::OverlapTooLarge { overlap, max_chars });
        }
        Ok(Self { max_chars, overlap })
    }
}

/// Byte range of a piece together with its length in characters.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    chars: usize,
}

/// A chunk of one page before page/index metadata is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Chunk contents; always a contiguous slice of the input.
    pub text: String,
    /// Leading characters shared with the previous chunk.
    pub overlap: usize,
}

/// Chunk every page of a document, numbering chunks across the whole document.
///
/// Blank pages contribute no chunks, and whitespace-only chunks are dropped before numbering.
pub fn chunk_document(document: &Document, settings: ChunkerSettings) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for page in &document.pages {
        let pieces = chunk_text(&page.text, settings)
            .into_iter()
            .filter(|piece| !piece.text.trim().is_empty());
        for piece in pieces {
            let index = chunks.len();
            chunks.push(Chunk {
                text: piece.text,
                page: page.number,
                index,
                overlap: piece.overlap,
            });
        }
    }
    tracing::debug!(
        document = %document.id,
        pages = document.pages.len(),
        chunks = chunks.len(),
        max_chars = settings.max_chars,
        overlap = settings.overlap,
        "Chunked document"
    );
    chunks
}

/// Split `text` into overlapping chunks.
///
/// Returns an empty vector when the input is empty or whitespace-only.
pub fn chunk_text(text: &str, settings: ChunkerSettings) -> Vec<TextChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    split_recursive(text, 0, text.len(), 0, settings.max_chars, &mut pieces);
    merge_pieces(text, &pieces, settings)
}

fn split_recursive(
    text: &str,
    start: usize,
    end: usize,
    level: usize,
    max_chars: usize,
    out: &mut Vec<Span>,
) {
    let chars = text[start..end].chars().count();
    if chars <= max_chars {
        out.push(Span { start, end, chars });
        return;
    }

    let Some(separator) = SEPARATORS[level.min(SEPARATORS.len())..]
        .iter()
        .position(|sep| text[start..end].contains(sep))
        .map(|offset| level + offset)
    else {
        hard_cut(text, start, end, max_chars, out);
        return;
    };

    let sep = SEPARATORS[separator];
    let mut piece_start = start;
    for (offset, _) in text[start..end].match_indices(sep) {
        let piece_end = start + offset + sep.len();
        push_piece(text, piece_start, piece_end, separator + 1, max_chars, out);
        piece_start = piece_end;
    }
    if piece_start < end {
        push_piece(text, piece_start, end, separator + 1, max_chars, out);
    }
}

fn push_piece(
    text: &str,
    start: usize,
    end: usize,
    next_level: usize,
    max_chars: usize,
    out: &mut Vec<Span>,
) {
    if start >= end {
        return;
    }
    if next_level >= SEPARATORS.len() {
        let chars = text[start..end].chars().count();
        if chars <= max_chars {
            out.push(Span { start, end, chars });
        } else {
            hard_cut(text, start, end, max_chars, out);
        }
    } else {
        split_recursive(text, start, end, next_level, max_chars, out);
    }
}

fn hard_cut(text: &str, start: usize, end: usize, max_chars: usize, out: &mut Vec<Span>) {
    let mut piece_start = start;
    let mut chars = 0;
    for (offset, _) in text[start..end].char_indices() {
        if chars == max_chars {
            out.push(Span {
                start: piece_start,
                end: start + offset,
                chars,
            });
            piece_start = start + offset;
            chars = 0;
        }
        chars += 1;
    }
    if chars > 0 {
        out.push(Span {
            start: piece_start,
            end,
            chars,
        });
    }
}

fn merge_pieces(text: &str, pieces: &[Span], settings: ChunkerSettings) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<Span> = VecDeque::new();
    let mut total = 0usize;
    let mut previous_end: Option<usize> = None;

    for piece in pieces {
        if total + piece.chars > settings.max_chars && !window.is_empty() {
            emit(text, &window, &mut previous_end, &mut chunks);
            while total > settings.overlap
                || (total > 0 && total + piece.chars > settings.max_chars)
            {
                let Some(dropped) = window.pop_front() else {
                    break;
                };
                total -= dropped.chars;
            }
        }
        window.push_back(*piece);
        total += piece.chars;
    }

    if !window.is_empty() {
        emit(text, &window, &mut previous_end, &mut chunks);
    }

    chunks
}

fn emit(
    text: &str,
    window: &VecDeque<Span>,
    previous_end: &mut Option<usize>,
    chunks: &mut Vec<TextChunk>,
) {
    let (Some(first), Some(last)) = (window.front(), window.back()) else {
        return;
    };
    let overlap = match *previous_end {
        Some(prev) if prev > first.start => text[first.start..prev].chars().count(),
        _ => 0,
    };
    chunks.push(TextChunk {
        text: text[first.start..last.end].to_string(),
        overlap,
    });
    *previous_end = Some(last.end);
}

/// Rebuild the original text from chunks by skipping each chunk's overlap prefix.
pub fn reassemble(chunks: &[TextChunk]) -> String {
    let mut text = String::new();
    for chunk in chunks {
        text.extend(chunk.text.chars().skip(chunk.overlap));
    }
    text
}
