//! Text splitters. All sizes are counted in `char`s.

use crate::config::{ChunkStrategy, ChunkingConfig};
use crate::error::Result;
use crate::traits::TextSplitter;

/// Fixed windows of `size` characters, consecutive windows sharing exactly
/// `overlap` characters. Blank input yields no chunks.
#[derive(Debug, Clone)]
pub struct FixedSizeSplitter {
    size: usize,
    overlap: usize,
}

impl FixedSizeSplitter {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        ChunkingConfig { strategy: ChunkStrategy::Fixed, chunk_size: size, chunk_overlap: overlap }.validate()?;
        Ok(Self { size, overlap })
    }
}

impl TextSplitter for FixedSizeSplitter {
    fn split_with_overlaps(&self, text: &str) -> Vec<(String, usize)> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.size).min(chars.len());
            let overlap = if start == 0 { 0 } else { self.overlap };
            chunks.push((chars[start..end].iter().collect(), overlap));
            if end >= chars.len() {
                break;
            }
            start = end - self.overlap;
        }
        chunks
    }
}

/// Packs blank-line separated paragraphs into chunks of at most `size`
/// characters. Oversize paragraphs are cut on word boundaries, carrying up to
/// `overlap` characters of trailing words into the next chunk.
#[derive(Debug, Clone)]
pub struct ParagraphSplitter {
    size: usize,
    overlap: usize,
}

impl ParagraphSplitter {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        ChunkingConfig { strategy: ChunkStrategy::Paragraph, chunk_size: size, chunk_overlap: overlap }.validate()?;
        Ok(Self { size, overlap })
    }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<(String, usize)> {
        // Words longer than a whole chunk are cut into fixed windows first.
        let mut words: Vec<String> = Vec::new();
        for word in paragraph.split_whitespace() {
            if word.chars().count() > self.size {
                let chars: Vec<char> = word.chars().collect();
                words.extend(chars.chunks(self.size).map(|c| c.iter().collect::<String>()));
            } else {
                words.push(word.to_string());
            }
        }

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0usize;
        let mut current_overlap = 0usize;
        for word in &words {
            let word_len = word.chars().count();
            let joined = if current.is_empty() { word_len } else { current_len + 1 + word_len };
            if joined <= self.size {
                current.push(word);
                current_len = joined;
                continue;
            }
            chunks.push((current.join(" "), current_overlap));
            // Carry trailing words that fit in the overlap budget and leave room for `word`.
            let mut carried: Vec<&str> = Vec::new();
            let mut carried_len = 0usize;
            for w in current.iter().rev() {
                let w_len = w.chars().count();
                let next_len = if carried.is_empty() { w_len } else { carried_len + 1 + w_len };
                if next_len > self.overlap || next_len + 1 + word_len > self.size {
                    break;
                }
                carried.push(w);
                carried_len = next_len;
            }
            carried.reverse();
            current_overlap = carried_len;
            current = carried;
            current.push(word);
            current_len = if current.len() == 1 { word_len } else { carried_len + 1 + word_len };
        }
        if !current.is_empty() {
            chunks.push((current.join(" "), current_overlap));
        }
        chunks
    }
}

impl TextSplitter for ParagraphSplitter {
    fn split_with_overlaps(&self, text: &str) -> Vec<(String, usize)> {
        let mut pieces = Vec::new();
        for paragraph in text.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if paragraph.chars().count() <= self.size {
                pieces.push((paragraph.to_string(), 0));
            } else {
                pieces.extend(self.split_paragraph_with_overlap(paragraph));
            }
        }

        // Pieces carrying words from their predecessor always start a new chunk.
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;
        let mut buffer_overlap = 0usize;
        for (piece, overlap) in pieces {
            let piece_len = piece.chars().count();
            if buffer.is_empty() {
                buffer = piece;
                buffer_len = piece_len;
                buffer_overlap = overlap;
            } else if overlap == 0 && buffer_len + 2 + piece_len <= self.size {
                buffer.push_str("\n\n");
                buffer.push_str(&piece);
                buffer_len += 2 + piece_len;
            } else {
                chunks.push((std::mem::replace(&mut buffer, piece), buffer_overlap));
                buffer_len = piece_len;
                buffer_overlap = overlap;
            }
        }
        if !buffer.is_empty() {
            chunks.push((buffer, buffer_overlap));
        }
        if let Some(first) = chunks.first_mut() {
            first.1 = 0;
        }
        chunks
    }
}

pub fn build_splitter(config: &ChunkingConfig) -> Result<Box<dyn TextSplitter>> {
    Ok(match config.strategy {
        ChunkStrategy::Fixed => Box::new(FixedSizeSplitter::new(config.chunk_size, config.chunk_overlap)?),
        ChunkStrategy::Paragraph => Box::new(ParagraphSplitter::new(config.chunk_size, config.chunk_overlap)?),
    })
}
