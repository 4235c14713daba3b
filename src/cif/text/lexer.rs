//! CIF token stream over a [`Tokenizer`].

use crate::text::Tokenizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CifTokenType {
    Data,
    Save,
    Loop,
    Value,
    ColumnName,
    Comment,
    End,
}

pub(crate) struct CifLexer<'a> {
    pub t: Tokenizer<'a>,
    pub token_type: CifTokenType,
    is_import_get: bool,
    pub in_save_frame: bool,
}

#[inline]
fn is_space_or_break(c: u8) -> bool {
    matches!(c, b'\t' | b'\n' | b'\r' | b' ')
}

impl<'a> CifLexer<'a> {
    pub fn new(data: &'a str) -> Self {
        Self {
            t: Tokenizer::new(data),
            token_type: CifTokenType::End,
            is_import_get: false,
            in_save_frame: false,
        }
    }

    #[inline]
    fn byte(&self, pos: usize) -> Option<u8> {
        self.t.data().as_bytes().get(pos).copied()
    }

    #[inline]
    pub fn token_str(&self) -> &'a str {
        self.t.token_str()
    }

    #[inline]
    pub fn token_len(&self) -> usize {
        self.t.token_end - self.t.token_start
    }

    /// Quoted value. A closing quote only counts when followed by whitespace
    /// or the end of input, so `'xx'x'` reads as `xx'x`. An unclosed quote
    /// ends at the line break and keeps its opening quote.
    fn eat_escaped(&mut self, esc: u8) {
        let bytes = self.t.data().as_bytes();
        self.t.position += 1;
        while self.t.position < self.t.length {
            let c = bytes[self.t.position];
            if c == esc {
                match self.byte(self.t.position + 1) {
                    Some(next) if !is_space_or_break(next) => self.t.position += 1,
                    _ => {
                        self.t.token_start += 1;
                        self.t.token_end = self.t.position;
                        self.t.position += 1;
                        return;
                    }
                }
            } else if c == b'\n' || c == b'\r' {
                self.t.token_end = self.t.position;
                return;
            } else {
                self.t.position += 1;
            }
        }
        self.t.token_end = self.t.position;
    }

    fn is_triple_quote_at(&self, pos: usize) -> bool {
        self.byte(pos + 1) == Some(b'\'') && self.byte(pos + 2) == Some(b'\'')
    }

    fn eat_triple_quote(&mut self) {
        self.t.position += 3;
        while self.t.position < self.t.length {
            if self.byte(self.t.position) == Some(b'\'') && self.is_triple_quote_at(self.t.position) {
                self.t.token_start += 3;
                self.t.token_end = self.t.position;
                self.t.position += 3;
                return;
            }
            if self.byte(self.t.position) == Some(b'\n') {
                self.t.line_number += 1;
            }
            self.t.position += 1;
        }
        self.t.token_end = self.t.position;
    }

    /// `;` block running to the next line that starts with `;`.
    ///
    /// Leading and trailing line breaks of the content are dropped. Without a
    /// closing `;` line the value runs to the end of input.
    fn eat_multiline(&mut self) {
        let bytes = self.t.data().as_bytes();
        let mut prev = b';';
        let mut pos = self.t.position + 1;
        let mut end = self.t.length;
        while pos < self.t.length {
            let c = bytes[pos];
            if c == b';' && (prev == b'\n' || prev == b'\r') {
                end = pos;
                break;
            }
            if c == b'\r' || (c == b'\n' && prev != b'\r') {
                self.t.line_number += 1;
            }
            prev = c;
            pos += 1;
        }

        let mut start = self.t.token_start + 1;
        while start < end && matches!(bytes[start], b'\n' | b'\r') {
            start += 1;
        }
        let mut stop = end;
        while stop > start && matches!(bytes[stop - 1], b'\n' | b'\r') {
            stop -= 1;
        }
        self.t.token_start = start;
        self.t.token_end = stop;
        self.t.position = (end + 1).min(self.t.length);
    }

    /// `_import.get [...]` argument inside save frames, read up to the closing `]`
    fn eat_import_get(&mut self) {
        let bytes = self.t.data().as_bytes();
        while self.t.position < self.t.length {
            let c = bytes[self.t.position];
            self.t.position += 1;
            if c == b']' {
                break;
            }
            if c == b'\n' {
                self.t.line_number += 1;
            }
        }
        self.t.token_end = self.t.position;
        self.is_import_get = false;
    }

    fn skip_comment_line(&mut self) {
        let bytes = self.t.data().as_bytes();
        while self.t.position < self.t.length {
            if matches!(bytes[self.t.position], b'\n' | b'\r') {
                return;
            }
            self.t.position += 1;
        }
    }

    fn starts_with_keyword(&self, keyword: &[u8; 4]) -> bool {
        let start = self.t.token_start;
        self.t.data().as_bytes()[start..start + 4].eq_ignore_ascii_case(keyword)
    }

    fn is_import_get_token(&self) -> bool {
        self.token_str() == "_import.get"
    }

    fn move_next_internal(&mut self) {
        // start of input counts as start of line
        let prev = self.t.skip_whitespace().unwrap_or(b'\n');
        if self.t.at_end() {
            self.token_type = CifTokenType::End;
            return;
        }

        self.t.token_start = self.t.position;
        self.t.token_end = self.t.position;

        let c = self.byte(self.t.position).unwrap_or(b' ');
        match c {
            b'#' => {
                self.skip_comment_line();
                self.token_type = CifTokenType::Comment;
            }
            b'\'' if self.is_triple_quote_at(self.t.position) => {
                self.eat_triple_quote();
                self.token_type = CifTokenType::Value;
            }
            b'\'' | b'"' => {
                self.eat_escaped(c);
                self.token_type = CifTokenType::Value;
            }
            b';' => {
                // multiline values must start at the beginning of a line
                if prev == b'\n' || prev == b'\r' {
                    self.eat_multiline();
                } else {
                    self.t.eat_value();
                }
                self.token_type = CifTokenType::Value;
            }
            _ => {
                if self.is_import_get {
                    self.eat_import_get();
                } else {
                    self.t.eat_value();
                }

                self.token_type = if c == b'_' {
                    if self.in_save_frame && self.is_import_get_token() {
                        self.is_import_get = true;
                    }
                    CifTokenType::ColumnName
                } else if self.token_len() >= 5 && self.byte(self.t.token_start + 4) == Some(b'_') {
                    if self.starts_with_keyword(b"data") {
                        CifTokenType::Data
                    } else if self.starts_with_keyword(b"save") {
                        CifTokenType::Save
                    } else if self.token_len() == 5 && self.starts_with_keyword(b"loop") {
                        CifTokenType::Loop
                    } else {
                        CifTokenType::Value
                    }
                } else {
                    CifTokenType::Value
                };
            }
        }
    }

    /// Advance to the next token that is not a comment
    pub fn move_next(&mut self) {
        self.move_next_internal();
        while self.token_type == CifTokenType::Comment {
            self.move_next_internal();
        }
    }

    /// Offset of the first `.` in the current token, or its end
    pub fn namespace_end(&self) -> usize {
        self.token_str()
            .find('.')
            .map(|i| self.t.token_start + i)
            .unwrap_or(self.t.token_end)
    }

    /// Whether the current token has no `.`
    pub fn is_flat_namespace(&self) -> bool {
        !self.token_str().contains('.')
    }

    /// Whether the current token lies in namespace `data[start..end]`
    pub fn is_namespace(&self, start: usize, end: usize) -> bool {
        let bytes = self.t.data().as_bytes();
        let ns = &bytes[start..end];
        let token = &bytes[self.t.token_start..self.t.token_end];
        if token.len() < ns.len() || &token[..ns.len()] != ns {
            return false;
        }
        token.len() == ns.len() || token[ns.len()] == b'.'
    }
}
