//! Cursor over an in-memory text buffer.
//!
//! The tokenizer never copies: it moves `position` forward and records the
//! current token as `token_start..token_end`. Malformed input is never an
//! error at this level; callers decide what an empty or unexpected token means.

use crate::result::ReaderError;
use crate::task::{chunked_subtask, Progress, RuntimeContext};

use super::{is_blank, slice, Tokens};

/// Default number of lines read between two progress checkpoints
pub const DEFAULT_LINE_CHUNK_SIZE: usize = 100_000;

/// Cursor state over a text buffer
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    data: &'a str,
    /// Current byte offset
    pub position: usize,
    /// Length of the buffer in bytes
    pub length: usize,
    /// 1-based line number of `position`
    pub line_number: usize,
    /// Start of the current token
    pub token_start: usize,
    /// End (exclusive) of the current token
    pub token_end: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer at the start of `data`
    pub fn new(data: &'a str) -> Self {
        Self {
            data,
            position: 0,
            length: data.len(),
            line_number: 1,
            token_start: 0,
            token_end: 0,
        }
    }

    /// The underlying buffer
    pub fn data(&self) -> &'a str {
        self.data
    }

    #[inline]
    fn byte(&self, pos: usize) -> Option<u8> {
        self.data.as_bytes().get(pos).copied()
    }

    /// Rewind to the start of the buffer
    pub fn reset(&mut self) {
        self.position = 0;
        self.line_number = 1;
        self.token_start = 0;
        self.token_end = 0;
    }

    /// Text of the current token
    #[inline]
    pub fn token_str(&self) -> &'a str {
        slice(self.data, self.token_start, self.token_end)
    }

    /// Whether the cursor reached the end of the buffer
    #[inline]
    pub fn at_end(&self) -> bool {
        self.position >= self.length
    }

    /// Advance past the end of the current line.
    ///
    /// `token_end` is set to the end of the line content (without the line
    /// break); `\r\n` counts as a single break. Returns `false` when nothing
    /// was consumed because the buffer is exhausted.
    pub fn eat_line(&mut self) -> bool {
        let bytes = self.data.as_bytes();
        while self.position < self.length {
            match bytes[self.position] {
                b'\n' => {
                    self.token_end = self.position;
                    self.position += 1;
                    self.line_number += 1;
                    return true;
                }
                b'\r' => {
                    self.token_end = self.position;
                    self.position += 1;
                    self.line_number += 1;
                    if self.byte(self.position) == Some(b'\n') {
                        self.position += 1;
                    }
                    return true;
                }
                _ => self.position += 1,
            }
        }
        self.token_end = self.position;
        self.token_start != self.token_end
    }

    /// Record the current position as the token start
    #[inline]
    pub fn mark_start(&mut self) {
        self.token_start = self.position;
    }

    /// Mark the current line as the token and advance past it
    pub fn mark_line(&mut self) -> bool {
        self.token_start = self.position;
        self.eat_line()
    }

    /// Read the current line
    pub fn read_line(&mut self) -> &'a str {
        self.mark_line();
        self.token_str()
    }

    /// Read the current line with surrounding spaces and tabs removed
    pub fn read_line_trim(&mut self) -> &'a str {
        self.mark_line();
        let position = self.position;
        self.trim(self.token_start, self.token_end);
        self.position = position;
        self.token_str()
    }

    fn read_lines_into(&mut self, count: usize, tokens: &mut Tokens<'a>) -> usize {
        let mut read = 0;
        for _ in 0..count {
            if !self.mark_line() {
                return read;
            }
            tokens.add_unchecked(self.token_start, self.token_end);
            read += 1;
        }
        read
    }

    /// Record the next `count` lines as tokens
    pub fn mark_lines(&mut self, count: usize) -> Tokens<'a> {
        let mut tokens = Tokens::new(self.data, count.saturating_mul(2));
        self.read_lines_into(count, &mut tokens);
        tokens
    }

    /// Read the next `count` lines
    pub fn read_lines(&mut self, count: usize) -> Vec<&'a str> {
        let mut lines = Vec::with_capacity(count.min(self.length));
        for _ in 0..count {
            if self.at_end() {
                break;
            }
            lines.push(self.read_line());
        }
        lines
    }

    /// Record the next `count` lines, reporting progress every `chunk_size` lines
    pub fn read_lines_chunked(
        &mut self,
        count: usize,
        ctx: &mut RuntimeContext,
        chunk_size: usize,
    ) -> Result<Tokens<'a>, ReaderError> {
        let length = self.length;
        let tokens = Tokens::new(self.data, count.saturating_mul(2));
        let mut state = (self, tokens, 0usize);
        chunked_subtask(
            ctx,
            chunk_size,
            &mut state,
            |size, (tokenizer, tokens, already_read)| {
                let to_read = (count - *already_read).min(size);
                let read = tokenizer.read_lines_into(to_read, tokens);
                *already_read += to_read;
                // the tokenizer ran dry before `count` lines
                if read < to_read {
                    *already_read = count;
                }
                read
            },
            |ctx, (tokenizer, _, _)| ctx.update(Progress::parsing(tokenizer.position, length)),
        )?;
        Ok(state.1)
    }

    /// Record every line of `data`
    pub fn read_all_lines(data: &'a str) -> Tokens<'a> {
        let mut tokenizer = Tokenizer::new(data);
        let mut tokens = Tokens::new(data, (data.len() / 80).max(2));
        while tokenizer.mark_line() {
            tokens.add(tokenizer.token_start, tokenizer.token_end);
        }
        tokens
    }

    /// Record every line of `data`, reporting progress every `chunk_size` lines
    pub fn read_all_lines_chunked(
        data: &'a str,
        ctx: &mut RuntimeContext,
        chunk_size: usize,
    ) -> Result<Tokens<'a>, ReaderError> {
        let mut state = (Tokenizer::new(data), Tokens::new(data, (data.len() / 80).max(2)));
        chunked_subtask(
            ctx,
            chunk_size,
            &mut state,
            |size, (tokenizer, tokens)| {
                let mut read = 0;
                while read < size && tokenizer.mark_line() {
                    tokens.add(tokenizer.token_start, tokenizer.token_end);
                    read += 1;
                }
                read
            },
            |ctx, (tokenizer, _)| ctx.update(Progress::parsing(tokenizer.position, data.len())),
        )?;
        Ok(state.1)
    }

    /// Advance until whitespace or a line break; the token ends there
    pub fn eat_value(&mut self) {
        let bytes = self.data.as_bytes();
        while self.position < self.length {
            match bytes[self.position] {
                b'\t' | b'\n' | b'\r' | b' ' => {
                    self.token_end = self.position;
                    return;
                }
                _ => self.position += 1,
            }
        }
        self.token_end = self.position;
    }

    /// Skip spaces, tabs and line breaks, counting lines (`\r\n` counts once).
    ///
    /// Returns the last skipped character, `None` if nothing was skipped.
    pub fn skip_whitespace(&mut self) -> Option<u8> {
        let bytes = self.data.as_bytes();
        let mut prev = None;
        while self.position < self.length {
            let c = bytes[self.position];
            match c {
                b'\t' | b' ' => {}
                b'\n' => {
                    if prev != Some(b'\r') {
                        self.line_number += 1;
                    }
                }
                b'\r' => self.line_number += 1,
                _ => return prev,
            }
            prev = Some(c);
            self.position += 1;
        }
        prev
    }

    /// Skip spaces and tabs only
    pub fn skip_strict_whitespace(&mut self) -> Option<u8> {
        let bytes = self.data.as_bytes();
        let mut prev = None;
        while self.position < self.length && is_blank(bytes[self.position]) {
            prev = Some(bytes[self.position]);
            self.position += 1;
        }
        prev
    }

    /// Narrow `start..end` by excluding leading and trailing spaces and tabs.
    ///
    /// The result becomes the current token and `position` moves to `end`.
    pub fn trim(&mut self, start: usize, end: usize) {
        let (s, e) = trim_range(self.data, start, end);
        self.token_start = s;
        self.token_end = e;
        self.position = end.min(self.length);
    }
}

/// `start..end` without leading and trailing spaces and tabs
pub fn trim_range(data: &str, start: usize, end: usize) -> (usize, usize) {
    let bytes = data.as_bytes();
    let mut e = end.min(bytes.len());
    let mut s = start.min(e);
    while s < e && is_blank(bytes[s]) {
        s += 1;
    }
    while e > s && is_blank(bytes[e - 1]) {
        e -= 1;
    }
    (s, e)
}

/// Trimmed `offset..offset + width` window of the line `line_start..line_end`.
///
/// The window is clamped to the line; one starting past the line end is empty.
pub fn fixed_range(
    data: &str,
    line_start: usize,
    line_end: usize,
    offset: usize,
    width: usize,
) -> (usize, usize) {
    let start = line_start + offset;
    if start >= line_end {
        return (line_end, line_end);
    }
    trim_range(data, start, (start + width).min(line_end))
}

/// Whitespace separated values of `data[start..end]`, at most `limit` of them
pub fn split_line(data: &str, start: usize, end: usize, limit: usize, out: &mut Vec<(usize, usize)>) {
    out.clear();
    let bytes = data.as_bytes();
    let mut pos = start;
    while pos < end && out.len() < limit {
        while pos < end && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= end {
            break;
        }
        let token_start = pos;
        while pos < end && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        out.push((token_start, pos));
    }
}

/// Trimmed text of `data[start..end]`
pub fn trim_str(data: &str, start: usize, end: usize) -> &str {
    let (s, e) = trim_range(data, start, end);
    slice(data, s, e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eat_line_handles_crlf() {
        let mut t = Tokenizer::new("ab\r\ncd\ref\n");
        assert_eq!(t.read_line(), "ab");
        assert_eq!(t.read_line(), "cd");
        assert_eq!(t.read_line(), "ef");
        assert_eq!(t.line_number, 4);
        assert!(!t.mark_line());
    }

    #[test]
    fn test_last_line_without_newline() {
        let mut t = Tokenizer::new("one\ntwo");
        assert_eq!(t.read_line(), "one");
        assert_eq!(t.read_line(), "two");
        assert!(t.at_end());
    }

    #[test]
    fn test_read_line_trim() {
        let mut t = Tokenizer::new("  \t hello world \t\nnext");
        assert_eq!(t.read_line_trim(), "hello world");
        assert_eq!(t.read_line(), "next");
    }

    #[test]
    fn test_skip_whitespace_counts_lines() {
        let mut t = Tokenizer::new(" \r\n\n\t x");
        assert_eq!(t.skip_whitespace(), Some(b' '));
        assert_eq!(t.line_number, 3);
        assert_eq!(t.position, 6);
        assert_eq!(t.skip_whitespace(), None);
    }

    #[test]
    fn test_eat_value() {
        let mut t = Tokenizer::new("abc def");
        t.mark_start();
        t.eat_value();
        assert_eq!(t.token_str(), "abc");
    }

    #[test]
    fn test_trim_empty_and_blank_ranges() {
        assert_eq!(trim_str("   ", 0, 3), "");
        assert_eq!(trim_str("a", 1, 1), "");
        assert_eq!(trim_str(" x ", 0, 99), "x");
    }

    #[test]
    fn test_read_all_lines() {
        let tokens = Tokenizer::read_all_lines("a\nb\n\nc\n");
        assert_eq!(tokens.iter().collect::<Vec<_>>(), vec!["a", "b", "", "c"]);
    }

    #[test]
    fn test_read_lines_chunked_matches_unchunked() {
        let data = (0..1000).map(|i| format!("line {i}\n")).collect::<String>();
        let mut ctx = RuntimeContext::new();
        let mut t = Tokenizer::new(&data);
        let chunked = t.read_lines_chunked(1000, &mut ctx, 7).unwrap();
        let mut t = Tokenizer::new(&data);
        let plain = t.mark_lines(1000);
        assert_eq!(chunked.count(), 1000);
        assert_eq!(chunked.indices(), plain.indices());

        let all = Tokenizer::read_all_lines_chunked(&data, &mut ctx, 3).unwrap();
        assert_eq!(all.indices(), plain.indices());
    }

    #[test]
    fn test_read_lines_chunked_stops_at_end() {
        let mut ctx = RuntimeContext::new();
        let mut t = Tokenizer::new("a\nb\n");
        let tokens = t.read_lines_chunked(100, &mut ctx, 10).unwrap();
        assert_eq!(tokens.count(), 2);
    }

    #[test]
    fn test_line_count_near_usize_max() {
        let mut ctx = RuntimeContext::new();
        let mut t = Tokenizer::new("a\nb\n");
        let tokens = t.read_lines_chunked(usize::MAX, &mut ctx, 10).unwrap();
        assert_eq!(tokens.count(), 2);
        let mut t = Tokenizer::new("a\nb\n");
        assert_eq!(t.mark_lines(usize::MAX).count(), 2);
    }
}
