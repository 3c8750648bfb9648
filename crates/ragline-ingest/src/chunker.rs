//! Document chunking.
//!
//! Text is split on paragraph boundaries first, then on sentence boundaries
//! for paragraphs that are too long, and finally by raw character count for
//! text with no natural breaks at all. Pieces are then packed into chunks
//! that share a small overlap with their predecessor.

use ragline_config::ChunkingConfig;
use ragline_core::{Chunk, Document, CHARS_PER_TOKEN};

/// Chunk sizes in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::from_chunking_config(&ChunkingConfig::default())
    }
}

impl ChunkConfig {
    /// Convert token-based settings to characters.
    pub fn from_chunking_config(config: &ChunkingConfig) -> Self {
        let chunk_size = (config.chunk_token_size * CHARS_PER_TOKEN).max(1);
        Self {
            chunk_size,
            // Overlap must leave room for new text in every chunk
            chunk_overlap: (config.chunk_overlap_token_size * CHARS_PER_TOKEN).min(chunk_size / 2),
        }
    }
}

/// A piece of text and the separator that joins it to the previous piece.
struct Piece<'a> {
    text: std::borrow::Cow<'a, str>,
    separator: &'static str,
}

/// Splits documents into chunks.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split a document into ordered chunks carrying its id and file path.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        self.split(&doc.content)
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk::new(doc.id.clone(), i as i32, text, doc.file_path.clone()))
            .collect()
    }

    /// Split text into chunk contents.
    pub fn split(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if trimmed.chars().count() <= self.config.chunk_size {
            return vec![trimmed.to_string()];
        }

        let mut chunks = Vec::new();
        let mut current = String::new();

        for piece in self.pieces(trimmed) {
            let current_len = current.chars().count();
            let needed = piece.separator.len() + piece.text.chars().count();

            if current_len > 0 && current_len + needed > self.config.chunk_size {
                let finished = current.trim();
                if !finished.is_empty() {
                    chunks.push(finished.to_string());
                }
                current = tail_chars(&current, self.config.chunk_overlap);
            }

            if !current.is_empty() {
                current.push_str(piece.separator);
            }
            current.push_str(&piece.text);
        }

        let last = current.trim();
        if !last.is_empty() {
            chunks.push(last.to_string());
        }

        chunks
    }

    fn pieces<'a>(&self, text: &'a str) -> Vec<Piece<'a>> {
        let mut pieces = Vec::new();

        for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            if para.chars().count() <= self.config.chunk_size {
                pieces.push(Piece {
                    text: para.into(),
                    separator: "\n\n",
                });
                continue;
            }

            for sentence in split_sentences(para) {
                if sentence.chars().count() <= self.config.chunk_size {
                    pieces.push(Piece {
                        text: sentence.into(),
                        separator: " ",
                    });
                } else {
                    // JSON, minified code and the like
                    for part in self.force_split(sentence) {
                        pieces.push(Piece {
                            text: part.into(),
                            separator: " ",
                        });
                    }
                }
            }
        }

        pieces
    }

    /// Split by character count, leaving room for the overlap carried in front.
    fn force_split(&self, text: &str) -> Vec<String> {
        let width = self
            .config
            .chunk_size
            .saturating_sub(self.config.chunk_overlap + 1)
            .max(1);
        let chars: Vec<char> = text.chars().collect();
        chars.chunks(width).map(|c| c.iter().collect()).collect()
    }
}

/// Last `n` characters of `text`.
fn tail_chars(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}

/// Split on `.`, `!` or `?` followed by whitespace or the end of the text.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = i + c.len_utf8();
        let at_boundary = match chars.peek() {
            None => true,
            Some((_, next)) => next.is_whitespace(),
        };
        if at_boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }

    sentences
}
