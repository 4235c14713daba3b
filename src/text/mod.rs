//! Text primitives shared by every text format reader.
//!
//! - [`Tokenizer`]: cursor with line tracking over one in-memory buffer
//! - [`Tokens`]: growable `(start, end)` range buffer (the token builder)
//! - [`number`]: allocation-free integer and float parsing over byte ranges

pub mod number;
mod tokenizer;
mod tokens;

pub use number::{get_number_type, NumberType};
pub use tokenizer::{
    fixed_range, split_line, trim_range, trim_str, Tokenizer, DEFAULT_LINE_CHUNK_SIZE,
};
pub use tokens::Tokens;

#[inline]
pub(crate) fn is_blank(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// `data[start..end]` clamped to the buffer and to char boundaries.
///
/// Fixed-column formats address bytes, which may split a multi-byte
/// character in non-ASCII files; such ranges shrink instead of panicking.
pub fn slice(data: &str, start: usize, end: usize) -> &str {
    let end = end.min(data.len());
    let mut start = start.min(end);
    while !data.is_char_boundary(start) {
        start += 1;
    }
    let mut end = end.max(start);
    while !data.is_char_boundary(end) {
        end -= 1;
    }
    &data[start..end.max(start)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_clamps() {
        assert_eq!(slice("abcdef", 2, 4), "cd");
        assert_eq!(slice("abc", 2, 10), "c");
        assert_eq!(slice("abc", 5, 10), "");
        assert_eq!(slice("abc", 2, 1), "");
    }

    #[test]
    fn test_slice_respects_char_boundaries() {
        let s = "aé b";
        // byte 2 is inside 'é'
        assert_eq!(slice(s, 2, 5), " b");
        assert_eq!(slice(s, 0, 2), "a");
    }
}
