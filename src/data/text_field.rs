use std::sync::Arc;

use crate::text::number::{parse_float, parse_int};
use crate::text::Tokens;

use super::column::{Column, TokenColumn, TokenValue, ValueKind};

/// A token-backed field readable as text, integer or float.
///
/// This is the field type of text CIF categories and CSV tables, where the
/// value type is decided by the consumer rather than by the file.
#[derive(Debug, Clone)]
pub struct TextField<'a> {
    tokens: Arc<Tokens<'a>>,
}

impl<'a> TextField<'a> {
    /// Wrap the token ranges of one field, one token per row
    pub fn new(tokens: Tokens<'a>) -> Self {
        Self {
            tokens: Arc::new(tokens),
        }
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.tokens.count()
    }

    /// Raw token text of `row`
    pub fn raw(&self, row: usize) -> &'a str {
        self.tokens.text(row)
    }

    /// Text of `row`; `.` and `?` read as the empty string
    pub fn str(&self, row: usize) -> &'a str {
        match self.raw(row) {
            "." | "?" => "",
            s => s,
        }
    }

    /// Integer value of `row`; non-numeric text reads as 0
    pub fn int(&self, row: usize) -> i32 {
        let (start, end) = self.tokens.range(row);
        parse_int(self.tokens.data().as_bytes(), start, end)
    }

    /// Float value of `row`; non-numeric text reads as 0.0
    pub fn float(&self, row: usize) -> f64 {
        let (start, end) = self.tokens.range(row);
        let v = parse_float(self.tokens.data().as_bytes(), start, end);
        if v.is_nan() {
            0.0
        } else {
            v
        }
    }

    /// Presence marker of `row`
    pub fn value_kind(&self, row: usize) -> ValueKind {
        ValueKind::of_token(self.raw(row))
    }

    /// Whether rows `a` and `b` have identical source text
    pub fn are_values_equal(&self, a: usize, b: usize) -> bool {
        self.raw(a).as_bytes() == self.raw(b).as_bytes()
    }

    /// All rows as text
    pub fn to_str_vec(&self) -> Vec<&'a str> {
        (0..self.row_count()).map(|row| self.str(row)).collect()
    }

    /// All rows as integers
    pub fn to_int_vec(&self) -> Vec<i32> {
        (0..self.row_count()).map(|row| self.int(row)).collect()
    }

    /// All rows as floats
    pub fn to_float_vec(&self) -> Vec<f64> {
        (0..self.row_count()).map(|row| self.float(row)).collect()
    }

    /// A typed column view sharing this field's token ranges
    pub fn column<T: TokenValue<'a>>(&self) -> TokenColumn<'a, T> {
        TokenColumn::shared(self.tokens.clone())
    }

    /// The underlying token ranges
    pub fn tokens(&self) -> &Tokens<'a> {
        &self.tokens
    }
}

impl<'a> Column for TextField<'a> {
    type Value = &'a str;

    fn row_count(&self) -> usize {
        self.tokens.count()
    }

    fn value(&self, row: usize) -> &'a str {
        self.str(row)
    }

    fn value_kind(&self, row: usize) -> ValueKind {
        TextField::value_kind(self, row)
    }

    fn are_values_equal(&self, a: usize, b: usize) -> bool {
        TextField::are_values_equal(self, a, b)
    }
}
