//! CIF file / block / category / field model shared by the text and binary readers.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::data::{TextField, ValueKind};
use crate::text::number::{parse_float, parse_int};

/// A parsed CIF file: an ordered list of data blocks
#[derive(Debug, Clone, Default)]
pub struct CifFile<'a> {
    /// Optional name (file name or encoder), not part of the CIF content
    pub name: Option<String>,
    /// Data blocks in source order
    pub blocks: Vec<CifBlock<'a>>,
}

impl<'a> CifFile<'a> {
    /// Create a file from its blocks
    pub fn new(blocks: Vec<CifBlock<'a>>) -> Self {
        Self { name: None, blocks }
    }

    /// Attach a name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Find a block by header (case-sensitive)
    pub fn block(&self, header: &str) -> Option<&CifBlock<'a>> {
        self.blocks.iter().find(|b| b.header == header)
    }
}

/// Categories of a block or save frame, iterated in insertion order
#[derive(Debug, Clone, Default)]
pub struct CategoryMap<'a> {
    categories: Vec<CifCategory<'a>>,
    index: HashMap<String, usize>,
}

impl<'a> CategoryMap<'a> {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category; fields of an already present category are merged into it
    pub fn insert(&mut self, category: CifCategory<'a>) {
        match self.index.get(&category.name) {
            Some(&i) => self.categories[i].merge(category),
            None => {
                self.index.insert(category.name.clone(), self.categories.len());
                self.categories.push(category);
            }
        }
    }

    /// Look a category up by name (without the leading underscore)
    pub fn get(&self, name: &str) -> Option<&CifCategory<'a>> {
        self.index.get(name).map(|&i| &self.categories[i])
    }

    /// Category names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// Categories in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, CifCategory<'a>> {
        self.categories.iter()
    }

    /// Number of categories
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the map holds no category
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl<'a> FromIterator<CifCategory<'a>> for CategoryMap<'a> {
    fn from_iter<I: IntoIterator<Item = CifCategory<'a>>>(iter: I) -> Self {
        let mut map = CategoryMap::new();
        for category in iter {
            map.insert(category);
        }
        map
    }
}

/// A `data_` block
#[derive(Debug, Clone, Default)]
pub struct CifBlock<'a> {
    /// Text after `data_`
    pub header: String,
    /// Categories in source order
    pub categories: CategoryMap<'a>,
    /// `save_` frames of this block
    pub save_frames: Vec<CifSaveFrame<'a>>,
}

impl<'a> CifBlock<'a> {
    /// Create a block
    pub fn new(
        header: impl Into<String>,
        categories: CategoryMap<'a>,
        save_frames: Vec<CifSaveFrame<'a>>,
    ) -> Self {
        Self {
            header: header.into(),
            categories,
            save_frames,
        }
    }

    /// Look a category up by name
    pub fn category(&self, name: &str) -> Option<&CifCategory<'a>> {
        self.categories.get(name)
    }

    /// Look a field up by `category.field`; a missing `.field` part means the unnamed field
    pub fn get_field(&self, name: &str) -> Option<&CifField<'a>> {
        let (category, field) = name.split_once('.').unwrap_or((name, ""));
        self.categories.get(category)?.get_field(field)
    }
}

/// A `save_` frame inside a block
#[derive(Debug, Clone, Default)]
pub struct CifSaveFrame<'a> {
    /// Text after `save_`
    pub header: String,
    /// Categories in source order
    pub categories: CategoryMap<'a>,
}

/// A named table of same-length fields
#[derive(Debug, Clone)]
pub struct CifCategory<'a> {
    /// Category name without the leading underscore
    pub name: String,
    /// Shared row count of all fields
    pub row_count: usize,
    /// Field names in source order
    pub field_names: Vec<String>,
    fields: HashMap<String, CifField<'a>>,
}

impl<'a> CifCategory<'a> {
    /// Build a category from named fields. Row count is taken from the first field.
    pub fn of_fields(name: impl Into<String>, fields: Vec<(String, CifField<'a>)>) -> Self {
        let row_count = fields.first().map(|(_, f)| f.row_count()).unwrap_or(0);
        Self::new(name, row_count, fields)
    }

    /// Build a category with an explicit row count
    pub fn new(
        name: impl Into<String>,
        row_count: usize,
        fields: Vec<(String, CifField<'a>)>,
    ) -> Self {
        let mut category = Self::empty(name);
        category.row_count = row_count;
        for (field_name, field) in fields {
            category.add_field(field_name, field);
        }
        category
    }

    /// A category without fields
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            row_count: 0,
            field_names: Vec::new(),
            fields: HashMap::new(),
        }
    }

    fn add_field(&mut self, name: String, field: CifField<'a>) {
        if self.fields.insert(name.clone(), field).is_none() {
            self.field_names.push(name);
        }
    }

    /// Append the fields of another category with the same name
    pub fn merge(&mut self, other: CifCategory<'a>) {
        let mut fields = other.fields;
        for name in other.field_names {
            if let Some(field) = fields.remove(&name) {
                self.add_field(name, field);
            }
        }
    }

    /// Look a field up by name
    pub fn get_field(&self, name: &str) -> Option<&CifField<'a>> {
        self.fields.get(name)
    }

    /// Fields in source order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &CifField<'a>)> + '_ {
        self.field_names
            .iter()
            .filter_map(move |name| self.fields.get(name).map(|f| (name.as_str(), f)))
    }
}

/// Typed payload of a decoded BinaryCIF column
#[derive(Debug, Clone, PartialEq)]
pub enum BinaryData {
    /// Integer column
    Int(Vec<i32>),
    /// Float column
    Float(Vec<f64>),
    /// String column
    Str(Vec<String>),
}

impl BinaryData {
    /// Number of values
    pub fn len(&self) -> usize {
        match self {
            BinaryData::Int(v) => v.len(),
            BinaryData::Float(v) => v.len(),
            BinaryData::Str(v) => v.len(),
        }
    }

    /// Whether there are no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Array-backed field of a BinaryCIF category
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryField {
    /// Decoded values
    pub data: BinaryData,
    /// Per-row value kinds from the column mask, if any
    pub mask: Option<Vec<ValueKind>>,
}

impl BinaryField {
    fn value_kind(&self, row: usize) -> ValueKind {
        self.mask
            .as_ref()
            .and_then(|m| m.get(row).copied())
            .unwrap_or_default()
    }

    fn str(&self, row: usize) -> Cow<'_, str> {
        if self.value_kind(row) != ValueKind::Present {
            return Cow::Borrowed("");
        }
        match &self.data {
            BinaryData::Int(v) => Cow::Owned(v[row].to_string()),
            BinaryData::Float(v) => Cow::Owned(v[row].to_string()),
            BinaryData::Str(v) => Cow::Borrowed(v[row].as_str()),
        }
    }

    fn int(&self, row: usize) -> i32 {
        match &self.data {
            BinaryData::Int(v) => v[row],
            BinaryData::Float(v) => v[row] as i32,
            BinaryData::Str(v) => parse_int(v[row].as_bytes(), 0, v[row].len()),
        }
    }

    fn float(&self, row: usize) -> f64 {
        match &self.data {
            BinaryData::Int(v) => f64::from(v[row]),
            BinaryData::Float(v) => v[row],
            BinaryData::Str(v) => parse_float(v[row].as_bytes(), 0, v[row].len()),
        }
    }

    fn are_values_equal(&self, a: usize, b: usize) -> bool {
        match &self.data {
            BinaryData::Int(v) => v[a] == v[b],
            BinaryData::Float(v) => v[a] == v[b],
            BinaryData::Str(v) => v[a] == v[b],
        }
    }
}

/// One column of a CIF category.
///
/// Text fields borrow the source text; binary fields own decoded arrays.
/// Both answer the same per-row questions, so consumers never branch on the
/// file flavour.
#[derive(Debug, Clone)]
pub enum CifField<'a> {
    /// Token-backed field of a text CIF file
    Text(TextField<'a>),
    /// Array-backed field of a BinaryCIF file
    Binary(BinaryField),
}

impl CifField<'static> {
    /// Field over owned strings; `.`, `?` and empty strings are recorded as missing
    pub fn of_strings(values: Vec<String>) -> CifField<'static> {
        let mask = values.iter().map(|v| ValueKind::of_token(v)).collect();
        CifField::Binary(BinaryField {
            data: BinaryData::Str(values),
            mask: Some(mask),
        })
    }

    /// Field over integers
    pub fn of_ints(values: Vec<i32>) -> CifField<'static> {
        CifField::Binary(BinaryField {
            data: BinaryData::Int(values),
            mask: None,
        })
    }

    /// Field over floats
    pub fn of_floats(values: Vec<f64>) -> CifField<'static> {
        CifField::Binary(BinaryField {
            data: BinaryData::Float(values),
            mask: None,
        })
    }
}

impl<'a> CifField<'a> {
    /// Number of rows
    pub fn row_count(&self) -> usize {
        match self {
            CifField::Text(f) => f.row_count(),
            CifField::Binary(f) => f.data.len(),
        }
    }

    /// Text of `row`; missing values read as the empty string
    pub fn str(&self, row: usize) -> Cow<'_, str> {
        match self {
            CifField::Text(f) => Cow::Borrowed(f.str(row)),
            CifField::Binary(f) => f.str(row),
        }
    }

    /// Integer value of `row`
    pub fn int(&self, row: usize) -> i32 {
        match self {
            CifField::Text(f) => f.int(row),
            CifField::Binary(f) => f.int(row),
        }
    }

    /// Float value of `row`
    pub fn float(&self, row: usize) -> f64 {
        match self {
            CifField::Text(f) => f.float(row),
            CifField::Binary(f) => f.float(row),
        }
    }

    /// Presence marker of `row`
    pub fn value_kind(&self, row: usize) -> ValueKind {
        match self {
            CifField::Text(f) => f.value_kind(row),
            CifField::Binary(f) => f.value_kind(row),
        }
    }

    /// Whether rows `a` and `b` hold the same value
    pub fn are_values_equal(&self, a: usize, b: usize) -> bool {
        match self {
            CifField::Text(f) => f.are_values_equal(a, b),
            CifField::Binary(f) => f.are_values_equal(a, b),
        }
    }

    /// All rows as text
    pub fn to_str_vec(&self) -> Vec<String> {
        (0..self.row_count()).map(|row| self.str(row).into_owned()).collect()
    }

    /// All rows as integers
    pub fn to_int_vec(&self) -> Vec<i32> {
        match self {
            CifField::Binary(BinaryField {
                data: BinaryData::Int(v),
                ..
            }) => v.clone(),
            _ => (0..self.row_count()).map(|row| self.int(row)).collect(),
        }
    }

    /// All rows as floats
    pub fn to_float_vec(&self) -> Vec<f64> {
        match self {
            CifField::Binary(BinaryField {
                data: BinaryData::Float(v),
                ..
            }) => v.clone(),
            _ => (0..self.row_count()).map(|row| self.float(row)).collect(),
        }
    }

    /// The decoded arrays when this is a binary field
    pub fn binary(&self) -> Option<&BinaryField> {
        match self {
            CifField::Binary(f) => Some(f),
            CifField::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, fields: &[(&str, Vec<&str>)]) -> CifCategory<'static> {
        CifCategory::of_fields(
            name,
            fields
                .iter()
                .map(|(n, v)| {
                    (
                        n.to_string(),
                        CifField::of_strings(v.iter().map(|s| s.to_string()).collect()),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_get_field_by_dotted_name() {
        let mut map = CategoryMap::new();
        map.insert(category("cell", &[("length_a", vec!["10.5"])]));
        map.insert(category("audit", &[("", vec!["x"])]));
        let block = CifBlock::new("1ABC", map, vec![]);
        assert!((block.get_field("cell.length_a").unwrap().float(0) - 10.5).abs() < 1e-12);
        assert_eq!(block.get_field("audit").unwrap().str(0), "x");
        assert!(block.get_field("cell.missing").is_none());
        assert!(block.get_field("nope.x").is_none());
    }

    #[test]
    fn test_repeated_category_merges_fields() {
        let mut map = CategoryMap::new();
        map.insert(category("entry", &[("id", vec!["A"])]));
        map.insert(category("other", &[("x", vec!["1"])]));
        map.insert(category("entry", &[("name", vec!["B"]), ("id", vec!["C"])]));
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["entry", "other"]);
        let entry = map.get("entry").unwrap();
        assert_eq!(entry.field_names, vec!["id", "name"]);
        assert_eq!(entry.get_field("id").unwrap().str(0), "C");
    }

    #[test]
    fn test_binary_field_coercions() {
        let floats = CifField::of_floats(vec![1.0, 2.5]);
        assert_eq!(floats.str(0), "1");
        assert_eq!(floats.str(1), "2.5");
        assert_eq!(floats.int(1), 2);

        let ints = CifField::of_ints(vec![7, 7]);
        assert!(ints.are_values_equal(0, 1));
        assert_eq!(ints.to_float_vec(), vec![7.0, 7.0]);

        let strings = CifField::of_strings(vec!["12".into(), "?".into()]);
        assert_eq!(strings.int(0), 12);
        assert_eq!(strings.value_kind(1), ValueKind::Unknown);
        assert_eq!(strings.str(1), "");
    }
}
