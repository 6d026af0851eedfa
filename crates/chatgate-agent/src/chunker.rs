// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sentence-bounded chunking of streamed backend output.
//!
//! Fragments arrive in arbitrary sizes. The buffer scans each byte once,
//! remembers confirmed sentence ends, and releases a chunk when one falls
//! inside the preferred window. Past the hard maximum it forces a split at
//! the best available break.

use chatgate_config::model::ChunkingConfig;
use chatgate_core::Chunk;

/// A confirmed sentence end inside the buffer.
#[derive(Debug, Clone, Copy)]
struct Boundary {
    /// Byte offset just past the terminator run.
    end: usize,
    /// Characters from the buffer start up to `end`.
    chars: usize,
}

/// Accumulates text fragments and releases complete chunks.
#[derive(Debug)]
pub struct ChunkBuffer {
    min_chars: usize,
    preferred_max_chars: usize,
    max_chars: usize,
    buf: String,
    buf_chars: usize,
    /// Byte offset where the next scan resumes.
    scan_pos: usize,
    scan_chars: usize,
    boundaries: Vec<Boundary>,
}

impl ChunkBuffer {
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            min_chars: config.min_chars.max(1),
            preferred_max_chars: config.preferred_max_chars.max(config.min_chars.max(1)),
            max_chars: config.max_chars.max(config.preferred_max_chars).max(1),
            buf: String::new(),
            buf_chars: 0,
            scan_pos: 0,
            scan_chars: 0,
            boundaries: Vec::new(),
        }
    }

    /// Characters currently held back.
    pub fn pending_chars(&self) -> usize {
        self.buf_chars
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Add a fragment and return every chunk that became complete.
    pub fn add_text(&mut self, fragment: &str) -> Vec<Chunk> {
        let fragment = if self.buf.is_empty() {
            fragment.trim_start()
        } else {
            fragment
        };
        if fragment.is_empty() {
            return Vec::new();
        }
        self.buf.push_str(fragment);
        self.buf_chars += fragment.chars().count();

        let mut chunks = Vec::new();
        loop {
            self.scan();
            match self.next_cut() {
                Some(end) => chunks.push(self.take(end)),
                None => break,
            }
        }
        chunks
    }

    /// Release whatever is left, trimmed. Call once the backend signals end of output.
    pub fn flush(&mut self) -> Option<Chunk> {
        let text = self.buf.trim().to_string();
        self.buf.clear();
        self.buf_chars = 0;
        self.scan_pos = 0;
        self.scan_chars = 0;
        self.boundaries.clear();
        (!text.is_empty()).then_some(Chunk {
            text,
            is_final: true,
        })
    }

    /// Scan new bytes for sentence ends.
    ///
    /// A terminator run (`.`, `!`, `?` plus any trailing terminators or
    /// closing quotes/brackets) counts as a sentence end only once whitespace
    /// follows it. A run touching the end of the buffer is rescanned after
    /// the next fragment.
    fn scan(&mut self) {
        let base = self.scan_pos;
        let mut chars = self.scan_chars;
        let mut iter = self.buf[base..].char_indices().peekable();

        while let Some((i, c)) = iter.next() {
            if !is_terminator(c) {
                chars += 1;
                continue;
            }
            let run_start = (base + i, chars);
            let mut end = base + i + c.len_utf8();
            let mut end_chars = chars + 1;
            let followed_by = loop {
                match iter.peek() {
                    Some(&(j, n)) if is_terminator(n) || is_closer(n) => {
                        end = base + j + n.len_utf8();
                        end_chars += 1;
                        iter.next();
                    }
                    Some(&(_, n)) => break Some(n),
                    None => break None,
                }
            };
            match followed_by {
                None => {
                    self.scan_pos = run_start.0;
                    self.scan_chars = run_start.1;
                    return;
                }
                Some(n) if n.is_whitespace() => self.boundaries.push(Boundary {
                    end,
                    chars: end_chars,
                }),
                Some(_) => {}
            }
            chars = end_chars;
        }

        self.scan_pos = self.buf.len();
        self.scan_chars = self.buf_chars;
    }

    /// Byte offset to cut at, or `None` to wait for more input.
    fn next_cut(&self) -> Option<usize> {
        let in_window = self
            .boundaries
            .iter()
            .rev()
            .find(|b| b.chars >= self.min_chars && b.chars <= self.preferred_max_chars);
        if let Some(b) = in_window {
            return Some(b.end);
        }

        // Sentences so far are too short: accept the next one that still fits.
        let overflow = self
            .boundaries
            .iter()
            .find(|b| b.chars > self.preferred_max_chars && b.chars <= self.max_chars);
        if let Some(b) = overflow {
            return Some(b.end);
        }

        (self.buf_chars > self.max_chars).then(|| self.forced_cut())
    }

    /// Split inside the first `max_chars` characters: last sentence or
    /// clause break, else last whitespace, else exactly at the limit.
    fn forced_cut(&self) -> usize {
        let limit = self
            .buf
            .char_indices()
            .nth(self.max_chars)
            .map_or(self.buf.len(), |(i, _)| i);
        let window = &self.buf[..limit];

        let sentence = self
            .boundaries
            .iter()
            .rev()
            .find(|b| b.end <= limit)
            .map(|b| b.end);

        let mut clause = None;
        let mut space = None;
        let mut iter = window.char_indices().peekable();
        while let Some((i, c)) = iter.next() {
            let next = iter
                .peek()
                .map(|&(_, n)| n)
                .or_else(|| self.buf[limit..].chars().next());
            if is_clause_break(c) && i > 0 && next.is_some_and(char::is_whitespace) {
                clause = Some(i + c.len_utf8());
            }
            if c.is_whitespace() && i > 0 {
                space = Some(i);
            }
        }

        match (sentence, clause) {
            (Some(s), Some(c)) => s.max(c),
            (Some(s), None) => s,
            (None, Some(c)) => c,
            (None, None) => space.unwrap_or(limit),
        }
    }

    /// Remove the chunk ending at `end` and rebase the scanner state.
    fn take(&mut self, end: usize) -> Chunk {
        let text = self.buf[..end].trim_end().to_string();
        let gap = self.buf[end..].len() - self.buf[end..].trim_start().len();
        let consumed = end + gap;
        let consumed_chars = self.buf[..consumed].chars().count();

        self.buf.drain(..consumed);
        self.buf_chars -= consumed_chars;

        self.boundaries.retain(|b| b.end > consumed);
        for b in &mut self.boundaries {
            b.end -= consumed;
            b.chars -= consumed_chars;
        }

        if self.scan_pos >= consumed {
            self.scan_pos -= consumed;
            self.scan_chars -= consumed_chars;
        } else {
            self.scan_pos = 0;
            self.scan_chars = 0;
            self.boundaries.clear();
        }

        Chunk {
            text,
            is_final: false,
        }
    }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '}' | '\u{201D}' | '\u{2019}' | '\u{00BB}')
}

fn is_clause_break(c: char) -> bool {
    matches!(c, ',' | ';' | ':' | '-' | '\u{2013}' | '\u{2014}')
}
