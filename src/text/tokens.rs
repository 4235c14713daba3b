//! Growable buffer of `(start, end)` token ranges into a source text.

use super::slice;

/// Token ranges recorded against a borrowed source text.
///
/// Nothing is copied: each token is a pair of byte offsets into `data`.
/// Ranges always lie on ASCII delimiters or are clamped to char boundaries
/// when read back, so slicing never panics.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    data: &'a str,
    indices: Vec<usize>,
    count: usize,
}

/// Golden-ratio growth of the backing storage
const GROWTH_FACTOR: f64 = 1.61;

impl<'a> Tokens<'a> {
    /// Create a builder sized for `size_hint` index entries (two per token).
    ///
    /// The hint is clamped to at least 10 entries and at most what the source
    /// text could possibly produce, so bogus counts in a file header cannot
    /// trigger huge allocations.
    pub fn new(data: &'a str, size_hint: usize) -> Self {
        let cap = size_hint.max(10).min(2 * data.len() + 10);
        Self {
            data,
            indices: Vec::with_capacity(cap),
            count: 0,
        }
    }

    fn grow(&mut self) {
        let len = self.indices.capacity().max(10);
        let target = (GROWTH_FACTOR * len as f64) as usize;
        self.indices.reserve_exact(target - self.indices.len());
    }

    /// Append a token range, growing the storage when it is full.
    pub fn add(&mut self, start: usize, end: usize) {
        if self.indices.len() + 2 > self.indices.capacity() {
            self.grow();
        }
        self.indices.push(start);
        self.indices.push(end);
        self.count += 1;
    }

    /// Append a token range without the growth policy.
    ///
    /// Used in hot loops where the capacity was sized up front from a record
    /// count; the push is still memory safe if that estimate was wrong.
    #[inline]
    pub fn add_unchecked(&mut self, start: usize, end: usize) {
        self.indices.push(start);
        self.indices.push(end);
        self.count += 1;
    }

    /// Number of tokens recorded
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether no token was recorded
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The source text
    pub fn data(&self) -> &'a str {
        self.data
    }

    /// Raw `[start0, end0, start1, end1, ...]` index buffer
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Byte range of token `i`
    #[inline]
    pub fn range(&self, i: usize) -> (usize, usize) {
        (self.indices[2 * i], self.indices[2 * i + 1])
    }

    /// Text of token `i`
    #[inline]
    pub fn text(&self, i: usize) -> &'a str {
        let (start, end) = self.range(i);
        slice(self.data, start, end)
    }

    /// Iterate token texts in order
    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        (0..self.count).map(move |i| self.text(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_read_back() {
        let data = "abc def ghi";
        let mut tokens = Tokens::new(data, 2);
        tokens.add(0, 3);
        tokens.add(4, 7);
        tokens.add_unchecked(8, 11);
        assert_eq!(tokens.count(), 3);
        assert_eq!(tokens.text(1), "def");
        assert_eq!(tokens.iter().collect::<Vec<_>>(), vec!["abc", "def", "ghi"]);
    }

    #[test]
    fn test_count_matches_appends_across_growth() {
        let data = "x".repeat(1000);
        let mut tokens = Tokens::new(&data, 0);
        for i in 0..500 {
            tokens.add(i, i + 1);
        }
        assert_eq!(tokens.count(), 500);
        assert_eq!(tokens.indices().len(), 1000);
        assert_eq!(tokens.range(499), (499, 500));
    }

    #[test]
    fn test_size_hint_is_clamped() {
        let tokens = Tokens::new("ab", usize::MAX / 4);
        assert!(tokens.indices.capacity() <= 64);
    }
}
