//! Column model shared by all readers.
//!
//! Text formats expose [`TokenColumn`] and [`FixedColumn`] views that keep
//! `(start, end)` ranges into the source text and convert a value only when
//! it is requested. Binary formats expose [`ArrayColumn`] over owned typed
//! arrays. All of them implement the same [`Column`] contract, so downstream
//! code does not care which format a column came from.

mod column;
mod text_field;

pub use column::{
    ArrayColumn, Column, FixedColumn, ToArrayParams, TokenColumn, TokenValue, ValueKind, ValueType,
};
pub use text_field::TextField;
