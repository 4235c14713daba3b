//! ASCII PLY (polygon file format) reader.
//!
//! The header declares elements in file order, each with a row count and
//! either scalar properties (a table element) or a list property (a list
//! element, e.g. faces as vertex index lists). Only `format ascii 1.0` is
//! read.

use log::{debug, warn};

use crate::data::{TextField, ValueType};
use crate::result::{Parsed, ReaderError, ReaderResult};
use crate::task::{chunked_subtask, ParseOptions, Progress, RuntimeContext};
use crate::text::{Tokenizer, Tokens, DEFAULT_LINE_CHUNK_SIZE};

/// Scalar types a PLY property can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyType {
    /// `char` / `int8`
    Int8,
    /// `uchar` / `uint8`
    Uint8,
    /// `short` / `int16`
    Int16,
    /// `ushort` / `uint16`
    Uint16,
    /// `int` / `int32`
    Int32,
    /// `uint` / `uint32`
    Uint32,
    /// `float` / `float32`
    Float32,
    /// `double` / `float64`
    Float64,
}

impl PlyType {
    /// Parse a header type name
    pub fn from_name(name: &str) -> Result<Self, ReaderError> {
        Ok(match name {
            "char" | "int8" => PlyType::Int8,
            "uchar" | "uint8" => PlyType::Uint8,
            "short" | "int16" => PlyType::Int16,
            "ushort" | "uint16" => PlyType::Uint16,
            "int" | "int32" => PlyType::Int32,
            "uint" | "uint32" => PlyType::Uint32,
            "float" | "float32" => PlyType::Float32,
            "double" | "float64" => PlyType::Float64,
            other => return Err(ReaderError::Unsupported(format!("PLY type '{other}'"))),
        })
    }

    /// Column schema values of this type are read with
    pub fn value_type(self) -> ValueType {
        match self {
            PlyType::Float32 | PlyType::Float64 => ValueType::Float,
            _ => ValueType::Int,
        }
    }
}

/// A property declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlyProperty {
    /// `property <type> <name>`
    Scalar {
        /// Value type
        ty: PlyType,
        /// Property name
        name: String,
    },
    /// `property list <count type> <data type> <name>`
    List {
        /// Type of the leading entry count
        count_type: PlyType,
        /// Type of the entries
        data_type: PlyType,
        /// Property name
        name: String,
    },
}

/// Element with scalar properties, one column per property
#[derive(Debug, Clone)]
pub struct PlyTable<'a> {
    /// Element name, e.g. `vertex`
    pub name: String,
    /// Number of rows
    pub row_count: usize,
    /// Property names in declaration order
    pub property_names: Vec<String>,
    /// Property types in declaration order
    pub property_types: Vec<PlyType>,
    /// Property columns in declaration order
    pub columns: Vec<TextField<'a>>,
}

impl<'a> PlyTable<'a> {
    /// Column of a property
    pub fn get_property(&self, name: &str) -> Option<&TextField<'a>> {
        self.property_names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }
}

/// Element with a single list property; each row is `count e0 e1 ...`
#[derive(Debug, Clone)]
pub struct PlyList<'a> {
    /// Element name, e.g. `face`
    pub name: String,
    /// Name of the list property
    pub property_name: String,
    /// Type of the list entries
    pub data_type: PlyType,
    /// Number of rows
    pub row_count: usize,
    values: TextField<'a>,
    offsets: Vec<usize>,
}

impl PlyList<'_> {
    fn entry_range(&self, row: usize) -> std::ops::Range<usize> {
        let first = self.offsets[row];
        let end = self.offsets[row + 1];
        if first >= end {
            return first..first;
        }
        let declared = usize::try_from(self.values.int(first)).unwrap_or(0);
        (first + 1)..(first + 1 + declared).min(end)
    }

    /// Number of entries of `row`
    pub fn entry_count(&self, row: usize) -> usize {
        self.entry_range(row).len()
    }

    /// Entries of `row` as integers
    pub fn int_entries(&self, row: usize) -> Vec<i32> {
        self.entry_range(row).map(|i| self.values.int(i)).collect()
    }

    /// Entries of `row` as floats
    pub fn float_entries(&self, row: usize) -> Vec<f64> {
        self.entry_range(row).map(|i| self.values.float(i)).collect()
    }
}

/// A parsed element
#[derive(Debug, Clone)]
pub enum PlyElement<'a> {
    /// Scalar properties
    Table(PlyTable<'a>),
    /// A list property
    List(PlyList<'a>),
}

impl PlyElement<'_> {
    /// Element name
    pub fn name(&self) -> &str {
        match self {
            PlyElement::Table(table) => &table.name,
            PlyElement::List(list) => &list.name,
        }
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        match self {
            PlyElement::Table(table) => table.row_count,
            PlyElement::List(list) => list.row_count,
        }
    }
}

/// A parsed PLY file
#[derive(Debug, Clone)]
pub struct PlyFile<'a> {
    /// `comment` header lines
    pub comments: Vec<String>,
    /// Elements in file order
    pub elements: Vec<PlyElement<'a>>,
}

impl<'a> PlyFile<'a> {
    /// Element names in file order
    pub fn element_names(&self) -> Vec<&str> {
        self.elements.iter().map(PlyElement::name).collect()
    }

    /// Element by name
    pub fn get_element(&self, name: &str) -> Option<&PlyElement<'a>> {
        self.elements.iter().find(|e| e.name() == name)
    }
}

#[derive(Debug)]
struct ElementSpec {
    name: String,
    count: usize,
    properties: Vec<PlyProperty>,
}

struct Header {
    comments: Vec<String>,
    elements: Vec<ElementSpec>,
    warnings: Vec<String>,
}

fn parse_header(t: &mut Tokenizer<'_>) -> Result<Header, ReaderError> {
    let data = t.data();
    let end = data
        .find("end_header")
        .ok_or_else(|| ReaderError::format("no 'end_header' record found"))?;
    let text = &data[..end];
    t.position = end;
    t.eat_line();

    let mut lines = text.lines();
    if lines.next().map(str::trim) != Some("ply") {
        return Err(ReaderError::format("data not starting with 'ply'"));
    }
    if lines.next().map(str::trim) != Some("format ascii 1.0") {
        return Err(ReaderError::format("format not 'ascii 1.0'"));
    }

    let mut header = Header {
        comments: Vec::new(),
        elements: Vec::new(),
        warnings: Vec::new(),
    };
    for (i, line) in lines.enumerate() {
        let line = line.trim_end();
        let parts: Vec<&str> = line.split_whitespace().collect();
        if let Some(comment) = line.strip_prefix("comment") {
            header.comments.push(comment.trim().to_string());
        } else if line.starts_with("element") {
            header.elements.push(ElementSpec {
                name: parts.get(1).unwrap_or(&"").to_string(),
                count: parts.get(2).and_then(|c| c.parse().ok()).unwrap_or(0),
                properties: Vec::new(),
            });
        } else if line.starts_with("property") {
            let element = header
                .elements
                .last_mut()
                .ok_or_else(|| ReaderError::format("properties outside of element"))?;
            let property = if parts.get(1) == Some(&"list") {
                PlyProperty::List {
                    count_type: PlyType::from_name(parts.get(2).unwrap_or(&""))?,
                    data_type: PlyType::from_name(parts.get(3).unwrap_or(&""))?,
                    name: parts.get(4).unwrap_or(&"").to_string(),
                }
            } else {
                PlyProperty::Scalar {
                    ty: PlyType::from_name(parts.get(1).unwrap_or(&""))?,
                    name: parts.get(2).unwrap_or(&"").to_string(),
                }
            };
            element.properties.push(property);
        } else if !line.trim().is_empty() {
            let message = format!("Unknown PLY header line {}: '{line}'", i + 3);
            warn!("{message}");
            header.warnings.push(message);
        }
    }
    Ok(header)
}

fn missing_rows(element: &str, declared: usize, found: usize) -> ReaderError {
    ReaderError::format(format!(
        "element '{element}' declares {declared} rows, found {found}"
    ))
}

struct TableState<'t, 'a> {
    tokenizer: &'t mut Tokenizer<'a>,
    columns: Vec<Tokens<'a>>,
    remaining: usize,
}

fn read_table<'a>(
    t: &mut Tokenizer<'a>,
    spec: ElementSpec,
    ctx: &mut RuntimeContext,
    chunk_size: usize,
) -> Result<PlyTable<'a>, ReaderError> {
    let data = t.data();
    let length = t.length;
    let mut property_names = Vec::new();
    let mut property_types = Vec::new();
    for property in spec.properties {
        if let PlyProperty::Scalar { ty, name } = property {
            property_names.push(name);
            property_types.push(ty);
        }
    }

    let mut state = TableState {
        tokenizer: t,
        columns: property_names
            .iter()
            .map(|_| Tokens::new(data, spec.count.saturating_mul(2)))
            .collect(),
        remaining: spec.count,
    };
    chunked_subtask(
        ctx,
        chunk_size,
        &mut state,
        |size, state| {
            let to_read = state.remaining.min(size);
            let mut read = 0;
            while read < to_read && !state.columns.is_empty() {
                state.tokenizer.skip_whitespace();
                if state.tokenizer.at_end() {
                    break;
                }
                for column in state.columns.iter_mut() {
                    state.tokenizer.skip_whitespace();
                    state.tokenizer.mark_start();
                    state.tokenizer.eat_value();
                    column.add(state.tokenizer.token_start, state.tokenizer.token_end);
                }
                read += 1;
            }
            state.remaining -= read;
            read
        },
        |ctx, state| ctx.update(Progress::parsing(state.tokenizer.position, length)),
    )?;
    if state.remaining > 0 {
        return Err(missing_rows(&spec.name, spec.count, spec.count - state.remaining));
    }

    Ok(PlyTable {
        name: spec.name,
        row_count: spec.count,
        property_names,
        property_types,
        columns: state.columns.into_iter().map(TextField::new).collect(),
    })
}

fn read_list<'a>(
    t: &mut Tokenizer<'a>,
    spec: ElementSpec,
    ctx: &mut RuntimeContext,
) -> Result<PlyList<'a>, ReaderError> {
    let data = t.data();
    let (property_name, data_type) = spec
        .properties
        .into_iter()
        .find_map(|p| match p {
            PlyProperty::List { name, data_type, .. } => Some((name, data_type)),
            PlyProperty::Scalar { .. } => None,
        })
        .ok_or_else(|| ReaderError::format(format!("element '{}' has no list", spec.name)))?;

    // sized for triangles: count plus three indices per row
    let mut values = Tokens::new(data, spec.count.saturating_mul(8));
    let mut offsets = Vec::with_capacity(spec.count.min(t.length) + 1);
    offsets.push(0);
    for row in 0..spec.count {
        t.skip_whitespace();
        if t.at_end() {
            return Err(missing_rows(&spec.name, spec.count, row));
        }
        t.mark_line();
        let (start, end) = (t.token_start, t.token_end);
        let mut pos = start;
        let bytes = data.as_bytes();
        while pos < end {
            while pos < end && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            let value_start = pos;
            while pos < end && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos > value_start {
                values.add(value_start, pos);
            }
        }
        offsets.push(values.count());
    }
    ctx.update(Progress::parsing(t.position, t.length))?;

    Ok(PlyList {
        name: spec.name,
        property_name,
        data_type,
        row_count: spec.count,
        values: TextField::new(values),
        offsets,
    })
}

/// Parse an ASCII PLY file with a default runtime context
pub fn parse_ply(data: &str) -> ReaderResult<PlyFile<'_>> {
    parse_ply_with(data, &mut RuntimeContext::new(), &ParseOptions::default())
}

/// Parse an ASCII PLY file, reporting progress every chunk of table rows.
///
/// Unknown header lines are reported in [`Parsed::warnings`].
pub fn parse_ply_with<'a>(
    data: &'a str,
    ctx: &mut RuntimeContext,
    options: &ParseOptions,
) -> ReaderResult<PlyFile<'a>> {
    let chunk_size = options.chunk_size_or(DEFAULT_LINE_CHUNK_SIZE);
    let mut t = Tokenizer::new(data);
    ctx.update(Progress::parsing(0, data.len()))?;

    let header = parse_header(&mut t)?;
    let mut elements = Vec::with_capacity(header.elements.len());
    for spec in header.elements {
        let is_list = spec
            .properties
            .iter()
            .any(|p| matches!(p, PlyProperty::List { .. }));
        let element = if is_list {
            PlyElement::List(read_list(&mut t, spec, ctx)?)
        } else {
            PlyElement::Table(read_table(&mut t, spec, ctx, chunk_size)?)
        };
        elements.push(element);
    }

    debug!("Parsed PLY with {} element(s)", elements.len());
    Ok(Parsed::with_warnings(
        PlyFile {
            comments: header.comments,
            elements,
        },
        header.warnings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLY: &str = "\
ply
format ascii 1.0
comment made by hand
element vertex 4
property float x
property float y
property float z
property uchar red
element face 2
property list uchar int vertex_index
end_header
0 0 0 255
1 0 0 0
0 1 0 10
1 1 0.5 20
3 0 1 2
4 0 1 3 2
";

    #[test]
    fn test_parse_table_and_list() {
        let parsed = parse_ply(PLY).unwrap();
        assert!(parsed.warnings.is_empty());
        let file = parsed.result;
        assert_eq!(file.comments, vec!["made by hand"]);
        assert_eq!(file.element_names(), vec!["vertex", "face"]);

        let Some(PlyElement::Table(vertex)) = file.get_element("vertex") else {
            panic!("vertex element should be a table");
        };
        assert_eq!(vertex.row_count, 4);
        assert_eq!(vertex.property_types[3], PlyType::Uint8);
        assert_eq!(vertex.get_property("z").unwrap().float(3), 0.5);
        assert_eq!(vertex.get_property("red").unwrap().int(0), 255);

        let Some(PlyElement::List(face)) = file.get_element("face") else {
            panic!("face element should be a list");
        };
        assert_eq!(face.row_count, 2);
        assert_eq!(face.property_name, "vertex_index");
        assert_eq!(face.data_type.value_type(), ValueType::Int);
        assert_eq!(face.int_entries(0), vec![0, 1, 2]);
        assert_eq!(face.entry_count(1), 4);
        assert_eq!(face.int_entries(1), vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_header_errors() {
        assert!(parse_ply("ply\nformat ascii 1.0\n").is_err());
        let err = parse_ply("plx\nformat ascii 1.0\nend_header\n").unwrap_err();
        assert_eq!(err.to_string(), "data not starting with 'ply'");
        let err = parse_ply("ply\nformat binary_little_endian 1.0\nend_header\n").unwrap_err();
        assert_eq!(err.to_string(), "format not 'ascii 1.0'");
        let err = parse_ply("ply\nformat ascii 1.0\nproperty float x\nend_header\n").unwrap_err();
        assert_eq!(err.to_string(), "properties outside of element");
    }

    #[test]
    fn test_element_count_beyond_data() {
        let table = "ply\nformat ascii 1.0\nelement v 18446744073709551615\nproperty int a\nend_header\n1\n2\n";
        let err = parse_ply(table).unwrap_err();
        assert_eq!(
            err.to_string(),
            "element 'v' declares 18446744073709551615 rows, found 2"
        );

        let list = "ply\nformat ascii 1.0\nelement f 18446744073709551615\nproperty list uchar int i\nend_header\n3 0 1 2\n";
        let err = parse_ply(list).unwrap_err();
        assert_eq!(
            err.to_string(),
            "element 'f' declares 18446744073709551615 rows, found 1"
        );
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let data = "ply\nformat ascii 1.0\nelement v 1\nproperty half x\nend_header\n1\n";
        assert!(matches!(parse_ply(data), Err(ReaderError::Unsupported(_))));
    }

    #[test]
    fn test_unknown_header_line_warns() {
        let data = "ply\nformat ascii 1.0\nobj_info generated\nelement v 1\nproperty int a\nend_header\n7\n";
        let parsed = parse_ply(data).unwrap();
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("obj_info"));
        let Some(PlyElement::Table(v)) = parsed.result.get_element("v") else {
            panic!("expected table");
        };
        assert_eq!(v.columns[0].int(0), 7);
    }
}
