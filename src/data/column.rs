//! Lazy column accessors over token ranges and typed arrays.

use std::borrow::Cow;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::text::number::{parse_float, parse_int};
use crate::text::{fixed_range, slice, Tokens};

/// Per-row presence marker mirroring the CIF `.` and `?` conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueKind {
    /// A real value
    #[default]
    Present,
    /// `.`: the value is intentionally omitted
    NotPresent,
    /// `?`: the value is missing or unknown
    Unknown,
}

impl ValueKind {
    /// Map a BinaryCIF mask byte (0, 1, 2) to a kind; other bytes count as present
    pub fn from_mask(mask: i64) -> Self {
        match mask {
            1 => ValueKind::NotPresent,
            2 => ValueKind::Unknown,
            _ => ValueKind::Present,
        }
    }

    /// Kind of a raw text token: empty and `.` are not present, `?` is unknown
    pub fn of_token(text: &str) -> Self {
        match text {
            "" | "." => ValueKind::NotPresent,
            "?" => ValueKind::Unknown,
            _ => ValueKind::Present,
        }
    }
}

/// Declared value type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Text
    Str,
    /// 32-bit integer
    Int,
    /// 64-bit float
    Float,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Str => write!(f, "str"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
        }
    }
}

/// Row window for [`Column::to_array`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToArrayParams {
    /// First row (inclusive)
    pub start: usize,
    /// Last row (exclusive), `None` for the end of the column
    pub end: Option<usize>,
}

impl ToArrayParams {
    /// All rows
    pub fn all() -> Self {
        Self::default()
    }

    /// Rows `start..end`
    pub fn range(start: usize, end: usize) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// The window clamped to `row_count`
    pub fn bounds(&self, row_count: usize) -> (usize, usize) {
        let end = self.end.unwrap_or(row_count).min(row_count);
        (self.start.min(end), end)
    }
}

/// A read-only typed view over `row_count` rows.
///
/// Values are produced on demand; rows are addressed `0..row_count()` and
/// indexing outside that range panics like slice indexing does.
pub trait Column {
    /// Value produced for each row
    type Value: Clone;

    /// Number of rows
    fn row_count(&self) -> usize;

    /// Value of `row`
    fn value(&self, row: usize) -> Self::Value;

    /// Presence marker of `row`
    fn value_kind(&self, row: usize) -> ValueKind;

    /// Whether rows `a` and `b` hold the same value
    fn are_values_equal(&self, a: usize, b: usize) -> bool;

    /// Materialize a window of values.
    ///
    /// Array-backed columns borrow their storage; token-backed columns convert once.
    fn to_array(&self, params: &ToArrayParams) -> Cow<'_, [Self::Value]> {
        let (start, end) = params.bounds(self.row_count());
        Cow::Owned((start..end).map(|row| self.value(row)).collect())
    }

    /// Whether the column has no rows
    fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}

/// Conversion of a token range into a typed value
pub trait TokenValue<'a>: Clone + Sized {
    /// The column schema this conversion implements
    const VALUE_TYPE: ValueType;

    /// Convert `data[start..end]` as is
    fn parse(data: &'a str, start: usize, end: usize) -> Self;

    /// Convert a token, mapping the `.` and `?` placeholders to the empty value
    fn from_token(data: &'a str, start: usize, end: usize) -> Self {
        Self::parse(data, start, end)
    }
}

impl<'a> TokenValue<'a> for &'a str {
    const VALUE_TYPE: ValueType = ValueType::Str;

    fn parse(data: &'a str, start: usize, end: usize) -> Self {
        slice(data, start, end)
    }

    fn from_token(data: &'a str, start: usize, end: usize) -> Self {
        match slice(data, start, end) {
            "." | "?" => "",
            s => s,
        }
    }
}

impl<'a> TokenValue<'a> for i32 {
    const VALUE_TYPE: ValueType = ValueType::Int;

    fn parse(data: &'a str, start: usize, end: usize) -> Self {
        parse_int(data.as_bytes(), start, end)
    }
}

impl<'a> TokenValue<'a> for f64 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn parse(data: &'a str, start: usize, end: usize) -> Self {
        let v = parse_float(data.as_bytes(), start, end);
        if v.is_nan() {
            0.0
        } else {
            v
        }
    }
}

fn tokens_equal(tokens: &Tokens<'_>, a: usize, b: usize) -> bool {
    let (sa, ea) = tokens.range(a);
    let (sb, eb) = tokens.range(b);
    let bytes = tokens.data().as_bytes();
    ea - sa == eb - sb && bytes.get(sa..ea) == bytes.get(sb..eb)
}

/// Column over token ranges; one token per row
#[derive(Debug, Clone)]
pub struct TokenColumn<'a, T> {
    tokens: Arc<Tokens<'a>>,
    _value: PhantomData<T>,
}

impl<'a, T: TokenValue<'a>> TokenColumn<'a, T> {
    /// Build a column owning the token ranges
    pub fn new(tokens: Tokens<'a>) -> Self {
        Self::shared(Arc::new(tokens))
    }

    /// Build a column over token ranges shared with other columns
    pub fn shared(tokens: Arc<Tokens<'a>>) -> Self {
        Self {
            tokens,
            _value: PhantomData,
        }
    }

    /// Raw text of `row`, before null mapping or conversion
    pub fn raw(&self, row: usize) -> &'a str {
        self.tokens.text(row)
    }

    /// The underlying token ranges
    pub fn tokens(&self) -> &Tokens<'a> {
        &self.tokens
    }
}

impl<'a, T: TokenValue<'a>> Column for TokenColumn<'a, T> {
    type Value = T;

    fn row_count(&self) -> usize {
        self.tokens.count()
    }

    #[inline]
    fn value(&self, row: usize) -> T {
        let (start, end) = self.tokens.range(row);
        T::from_token(self.tokens.data(), start, end)
    }

    fn value_kind(&self, row: usize) -> ValueKind {
        ValueKind::of_token(self.tokens.text(row))
    }

    fn are_values_equal(&self, a: usize, b: usize) -> bool {
        tokens_equal(&self.tokens, a, b)
    }
}

/// Column reading a fixed byte window `offset..offset + width` of each line.
///
/// Windows are clamped to the line and trimmed of spaces and tabs; a window
/// starting past the end of its line reads as the empty value.
#[derive(Debug, Clone)]
pub struct FixedColumn<'a, T> {
    lines: Arc<Tokens<'a>>,
    offset: usize,
    width: usize,
    _value: PhantomData<T>,
}

impl<'a, T: TokenValue<'a>> FixedColumn<'a, T> {
    /// Build a column over shared line tokens
    pub fn new(lines: Arc<Tokens<'a>>, offset: usize, width: usize) -> Self {
        Self {
            lines,
            offset,
            width,
            _value: PhantomData,
        }
    }

    /// Build a column viewing line tokens that other columns also read
    pub fn view(lines: &Arc<Tokens<'a>>, offset: usize, width: usize) -> Self {
        Self::new(Arc::clone(lines), offset, width)
    }

    fn window(&self, row: usize) -> (usize, usize) {
        let (line_start, line_end) = self.lines.range(row);
        fixed_range(self.lines.data(), line_start, line_end, self.offset, self.width)
    }

    /// Trimmed raw text of `row`
    pub fn raw(&self, row: usize) -> &'a str {
        let (start, end) = self.window(row);
        slice(self.lines.data(), start, end)
    }
}

impl<'a, T: TokenValue<'a>> Column for FixedColumn<'a, T> {
    type Value = T;

    fn row_count(&self) -> usize {
        self.lines.count()
    }

    #[inline]
    fn value(&self, row: usize) -> T {
        let (start, end) = self.window(row);
        T::parse(self.lines.data(), start, end)
    }

    fn value_kind(&self, row: usize) -> ValueKind {
        if self.raw(row).is_empty() {
            ValueKind::NotPresent
        } else {
            ValueKind::Present
        }
    }

    fn are_values_equal(&self, a: usize, b: usize) -> bool {
        self.raw(a) == self.raw(b)
    }
}

/// Column over an owned typed array, as produced by binary formats
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayColumn<T> {
    values: Vec<T>,
    kinds: Option<Vec<ValueKind>>,
}

impl<T: Clone + PartialEq> ArrayColumn<T> {
    /// Column where every row is present
    pub fn new(values: Vec<T>) -> Self {
        Self {
            values,
            kinds: None,
        }
    }

    /// Column with explicit per-row value kinds
    pub fn with_kinds(values: Vec<T>, kinds: Vec<ValueKind>) -> Self {
        Self {
            values,
            kinds: Some(kinds),
        }
    }

    /// The backing values
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Consume the column, returning the backing values
    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

impl<T: Clone + PartialEq> Default for ArrayColumn<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Clone + PartialEq> From<Vec<T>> for ArrayColumn<T> {
    fn from(values: Vec<T>) -> Self {
        Self::new(values)
    }
}

impl<T: Clone + PartialEq> Column for ArrayColumn<T> {
    type Value = T;

    fn row_count(&self) -> usize {
        self.values.len()
    }

    #[inline]
    fn value(&self, row: usize) -> T {
        self.values[row].clone()
    }

    fn value_kind(&self, row: usize) -> ValueKind {
        self.kinds
            .as_ref()
            .and_then(|kinds| kinds.get(row).copied())
            .unwrap_or_default()
    }

    fn are_values_equal(&self, a: usize, b: usize) -> bool {
        self.values[a] == self.values[b]
    }

    fn to_array(&self, params: &ToArrayParams) -> Cow<'_, [T]> {
        let (start, end) = params.bounds(self.values.len());
        Cow::Borrowed(&self.values[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Tokenizer;

    fn words(data: &str) -> Tokens<'_> {
        let mut tokens = Tokens::new(data, 16);
        let mut t = Tokenizer::new(data);
        loop {
            t.skip_whitespace();
            if t.at_end() {
                break;
            }
            t.mark_start();
            t.eat_value();
            tokens.add(t.token_start, t.token_end);
        }
        tokens
    }

    #[test]
    fn test_token_column_types() {
        let data = "12 -3.5 ? . abc";
        let s: TokenColumn<&str> = TokenColumn::new(words(data));
        assert_eq!(s.value(0), "12");
        assert_eq!(s.value(2), "");
        assert_eq!(s.value(3), "");
        assert_eq!(s.raw(3), ".");
        assert_eq!(s.value_kind(2), ValueKind::Unknown);
        assert_eq!(s.value_kind(3), ValueKind::NotPresent);
        assert_eq!(s.value_kind(4), ValueKind::Present);

        let i: TokenColumn<i32> = TokenColumn::new(words(data));
        assert_eq!(i.value(0), 12);
        assert_eq!(i.value(4), 0);

        let f: TokenColumn<f64> = TokenColumn::new(words(data));
        assert!((f.value(1) + 3.5).abs() < 1e-12);
        assert_eq!(f.to_array(&ToArrayParams::range(0, 2)).len(), 2);
    }

    #[test]
    fn test_token_equality_compares_source_bytes() {
        let col: TokenColumn<&str> = TokenColumn::new(words("ALA GLY ALA AL"));
        assert!(col.are_values_equal(0, 2));
        assert!(!col.are_values_equal(0, 1));
        assert!(!col.are_values_equal(0, 3));
    }

    #[test]
    fn test_fixed_column_windows() {
        let data = "ATOM      1  N   ALA\nATOM     22  CA\nATOM";
        let lines = Arc::new(Tokenizer::read_all_lines(data));
        let serial: FixedColumn<i32> = FixedColumn::new(lines.clone(), 6, 5);
        let name: FixedColumn<&str> = FixedColumn::new(lines.clone(), 12, 4);
        let res: FixedColumn<&str> = FixedColumn::new(lines, 17, 3);
        assert_eq!(serial.value(0), 1);
        assert_eq!(serial.value(1), 22);
        assert_eq!(serial.value(2), 0);
        assert_eq!(name.value(0), "N");
        assert_eq!(name.value(1), "CA");
        assert_eq!(res.value(0), "ALA");
        assert_eq!(res.value(1), "");
        assert_eq!(res.value_kind(1), ValueKind::NotPresent);
    }

    #[test]
    fn test_array_column_borrows() {
        let col = ArrayColumn::with_kinds(
            vec![1, 2, 2],
            vec![ValueKind::Present, ValueKind::Unknown, ValueKind::Present],
        );
        assert!(matches!(col.to_array(&ToArrayParams::all()), Cow::Borrowed(_)));
        assert_eq!(&*col.to_array(&ToArrayParams::range(1, 10)), &[2, 2]);
        assert_eq!(col.value_kind(1), ValueKind::Unknown);
        assert!(col.are_values_equal(1, 2));
    }

    #[test]
    fn test_value_kind_from_mask() {
        assert_eq!(ValueKind::from_mask(0), ValueKind::Present);
        assert_eq!(ValueKind::from_mask(1), ValueKind::NotPresent);
        assert_eq!(ValueKind::from_mask(2), ValueKind::Unknown);
    }
}
