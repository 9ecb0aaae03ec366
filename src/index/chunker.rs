use std::ops::Range;

pub const DEFAULT_MAX_CHARS: usize = 500;
pub const DEFAULT_OVERLAP: usize = 50;

/// Preferred cut points, strongest first. The cut lands after the delimiter.
const BOUNDARIES: &[&str] = &["\n\n", ". ", "? ", "! "];

/// Splits text into overlapping windows measured in characters.
///
/// Chunks are returned as byte spans into the input, so they always fall on
/// UTF-8 boundaries and the text can be rebuilt from them.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_chars: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS, DEFAULT_OVERLAP)
    }
}

impl Chunker {
    /// `overlap` is clamped below half of `max_chars` so every step advances.
    pub fn new(max_chars: usize, overlap: usize) -> Self {
        let max_chars = max_chars.max(2);
        Self {
            max_chars,
            overlap: overlap.min((max_chars - 1) / 2),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn split(&self, text: &str) -> Vec<Range<usize>> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // offsets[i] is the byte offset of char i; the last entry is text.len().
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;

        let mut spans = Vec::new();
        let mut start = 0;
        loop {
            let hard_end = start + self.max_chars;
            if hard_end >= total {
                spans.push(offsets[start]..text.len());
                break;
            }

            let end = self.cut_point(text, &offsets, start, hard_end);
            spans.push(offsets[start]..offsets[end]);
            start = self.next_start(text, &offsets, start, end);
        }
        spans
    }

    /// Char index to end the chunk at, searching back from `hard_end` but
    /// never below the chunk's midpoint.
    fn cut_point(&self, text: &str, offsets: &[usize], start: usize, hard_end: usize) -> usize {
        let floor = start + self.max_chars / 2;
        let window = &text[offsets[floor]..offsets[hard_end]];

        let found = BOUNDARIES
            .iter()
            .find_map(|delim| window.rfind(delim).map(|pos| pos + delim.len()))
            .or_else(|| {
                window
                    .char_indices()
                    .rev()
                    .find(|(_, c)| c.is_whitespace())
                    .map(|(pos, c)| pos + c.len_utf8())
            });

        match found {
            Some(rel) => char_index(offsets, offsets[floor] + rel).unwrap_or(hard_end),
            None => hard_end,
        }
    }

    /// Step back `overlap` chars from `end`, then back to the start of a word
    /// if one begins within another `overlap` chars.
    fn next_start(&self, text: &str, offsets: &[usize], start: usize, end: usize) -> usize {
        let next = end - self.overlap;
        let floor = next.saturating_sub(self.overlap).max(start + 1);
        let after_space = |i: usize| {
            text[..offsets[i]]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace)
        };

        (floor..=next).rev().find(|&i| after_space(i)).unwrap_or(next)
    }
}

fn char_index(offsets: &[usize], byte: usize) -> Option<usize> {
    offsets.binary_search(&byte).ok()
}
