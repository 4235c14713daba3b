//! BinaryCIF reader.
//!
//! The file is a MessagePack document:
//!
//! ```text
//! { version, encoder, dataBlocks: [ { header, categories: [
//!     { name, rowCount, columns: [ { name, data: { data, encoding }, mask? } ] }
//! ] } ] }
//! ```
//!
//! Column bytes go through the codec chain in [`decoder`] and end up as
//! array-backed [`CifField`]s, so consumers see the same accessors as for text
//! CIF. Gzip-compressed input is detected by its magic bytes.

mod decoder;
mod msgpack;

use std::borrow::Cow;
use std::io::Read;

use flate2::read::GzDecoder;
use log::debug;

use crate::data::ValueKind;
use crate::result::{Parsed, ReaderError, ReaderResult};

use super::{BinaryData, BinaryField, CifBlock, CifCategory, CifField, CifFile};
pub use decoder::{decode, decode_encoded_data, Decoded, DecodeError};
pub use msgpack::Value;

/// Oldest BinaryCIF version this reader accepts, as (major, minor)
pub const MIN_VERSION: (u32, u32) = (0, 3);

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

impl From<DecodeError> for ReaderError {
    fn from(err: DecodeError) -> Self {
        ReaderError::Format(err.to_string())
    }
}

/// Parse a BinaryCIF document, optionally gzip-compressed
pub fn parse_cif_binary(bytes: &[u8]) -> ReaderResult<CifFile<'static>> {
    let bytes = maybe_gunzip(bytes)?;
    debug!("Parsing BinaryCIF ({} bytes)", bytes.len());

    let root = msgpack::decode(&bytes)?;
    let version = root
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or_default();
    check_version(version)?;

    let blocks = root
        .get("dataBlocks")
        .and_then(Value::as_array)
        .ok_or_else(|| ReaderError::format("Missing 'dataBlocks'"))?
        .iter()
        .map(read_block)
        .collect::<Result<Vec<_>, _>>()?;

    let mut file = CifFile::new(blocks);
    if let Some(encoder) = root.get("encoder").and_then(Value::as_str) {
        file = file.with_name(encoder);
    }
    debug!("Parsed {} BinaryCIF data block(s)", file.blocks.len());
    Ok(Parsed::new(file))
}

fn maybe_gunzip(bytes: &[u8]) -> Result<Cow<'_, [u8]>, ReaderError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut out = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut out)?;
        Ok(Cow::Owned(out))
    } else {
        Ok(Cow::Borrowed(bytes))
    }
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.trim().parse().ok()?;
    let minor = parts.next()?.trim().parse().ok()?;
    Some((major, minor))
}

/// Reject documents older than [`MIN_VERSION`] or without a readable version
pub fn check_version(version: &str) -> Result<(), ReaderError> {
    match parse_version(version) {
        Some(v) if v >= MIN_VERSION => Ok(()),
        _ => Err(ReaderError::format(format!(
            "Unsupported format version. Current {version}, required {}.{}.",
            MIN_VERSION.0, MIN_VERSION.1
        ))),
    }
}

fn read_block(block: &Value) -> Result<CifBlock<'static>, ReaderError> {
    let header = block
        .get("header")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let categories = block
        .get("categories")
        .and_then(Value::as_array)
        .ok_or_else(|| ReaderError::format(format!("Missing 'categories' in block '{header}'")))?
        .iter()
        .map(read_category)
        .collect::<Result<_, _>>()?;
    Ok(CifBlock::new(header, categories, Vec::new()))
}

fn read_category(category: &Value) -> Result<CifCategory<'static>, ReaderError> {
    let raw_name = category
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ReaderError::format("Category without a name"))?;
    let name = raw_name.strip_prefix('_').unwrap_or(raw_name);
    let row_count = category
        .get("rowCount")
        .and_then(Value::as_i64)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ReaderError::format(format!("Missing 'rowCount' in category '{name}'")))?;

    let mut fields = Vec::new();
    for column in category
        .get("columns")
        .and_then(Value::as_array)
        .ok_or_else(|| ReaderError::format(format!("Missing 'columns' in category '{name}'")))?
    {
        let field_name = column
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ReaderError::format(format!("Column without a name in '{name}'")))?;
        let field = read_column(column, row_count).map_err(|e| {
            ReaderError::format(format!("Column '{name}.{field_name}': {}", e.message()))
        })?;
        fields.push((field_name.to_string(), field));
    }
    Ok(CifCategory::new(name, row_count, fields))
}

fn read_column(column: &Value, row_count: usize) -> Result<CifField<'static>, ReaderError> {
    let encoded = column
        .get("data")
        .ok_or_else(|| ReaderError::format("missing 'data'"))?;
    let data = match decode_encoded_data(encoded)? {
        Decoded::Int(v) => BinaryData::Int(v),
        Decoded::Float(v) => BinaryData::Float(v),
        Decoded::Str(v) => BinaryData::Str(v),
        Decoded::Bytes(_) => return Err(ReaderError::format("encoding chain produced raw bytes")),
    };
    if data.len() != row_count {
        return Err(ReaderError::format(format!(
            "expected {row_count} values, decoded {}",
            data.len()
        )));
    }

    let mask = match column.get("mask") {
        Some(mask) if !mask.is_nil() => match decode_encoded_data(mask)? {
            Decoded::Int(codes) if codes.len() == row_count => Some(
                codes
                    .into_iter()
                    .map(|c| ValueKind::from_mask(i64::from(c)))
                    .collect(),
            ),
            _ => return Err(ReaderError::format("mask does not match the row count")),
        },
        _ => None,
    };

    Ok(CifField::Binary(BinaryField { data, mask }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use rmp::encode;

    fn write_byte_array_encoding(buf: &mut Vec<u8>, type_id: u8) {
        encode::write_array_len(buf, 1).unwrap();
        encode::write_map_len(buf, 2).unwrap();
        encode::write_str(buf, "kind").unwrap();
        encode::write_str(buf, "ByteArray").unwrap();
        encode::write_str(buf, "type").unwrap();
        encode::write_uint(buf, u64::from(type_id)).unwrap();
    }

    fn write_int_data(buf: &mut Vec<u8>, values: &[i32]) {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        encode::write_map_len(buf, 2).unwrap();
        encode::write_str(buf, "data").unwrap();
        encode::write_bin(buf, &bytes).unwrap();
        encode::write_str(buf, "encoding").unwrap();
        write_byte_array_encoding(buf, 3);
    }

    /// One block `test`, category `_atom_site` with an `id` column and a masked `charge` column
    fn document(version: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        encode::write_map_len(&mut buf, 3).unwrap();
        encode::write_str(&mut buf, "version").unwrap();
        encode::write_str(&mut buf, version).unwrap();
        encode::write_str(&mut buf, "encoder").unwrap();
        encode::write_str(&mut buf, "unit-test").unwrap();
        encode::write_str(&mut buf, "dataBlocks").unwrap();
        encode::write_array_len(&mut buf, 1).unwrap();

        encode::write_map_len(&mut buf, 2).unwrap();
        encode::write_str(&mut buf, "header").unwrap();
        encode::write_str(&mut buf, "test").unwrap();
        encode::write_str(&mut buf, "categories").unwrap();
        encode::write_array_len(&mut buf, 1).unwrap();

        encode::write_map_len(&mut buf, 3).unwrap();
        encode::write_str(&mut buf, "name").unwrap();
        encode::write_str(&mut buf, "_atom_site").unwrap();
        encode::write_str(&mut buf, "rowCount").unwrap();
        encode::write_uint(&mut buf, 3).unwrap();
        encode::write_str(&mut buf, "columns").unwrap();
        encode::write_array_len(&mut buf, 2).unwrap();

        encode::write_map_len(&mut buf, 3).unwrap();
        encode::write_str(&mut buf, "name").unwrap();
        encode::write_str(&mut buf, "id").unwrap();
        encode::write_str(&mut buf, "data").unwrap();
        write_int_data(&mut buf, &[1, 2, 3]);
        encode::write_str(&mut buf, "mask").unwrap();
        encode::write_nil(&mut buf).unwrap();

        encode::write_map_len(&mut buf, 3).unwrap();
        encode::write_str(&mut buf, "name").unwrap();
        encode::write_str(&mut buf, "charge").unwrap();
        encode::write_str(&mut buf, "data").unwrap();
        write_int_data(&mut buf, &[1, 0, 0]);
        encode::write_str(&mut buf, "mask").unwrap();
        write_int_data(&mut buf, &[0, 1, 2]);
        buf
    }

    #[test]
    fn test_old_version_is_rejected() {
        let err = parse_cif_binary(&document("0.2.0")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("0.2.0"), "{message}");
        assert!(message.contains("0.3"), "{message}");
    }

    #[test]
    fn test_current_version_is_accepted() {
        let file = parse_cif_binary(&document("0.3.5")).unwrap().result;
        assert_eq!(file.name.as_deref(), Some("unit-test"));
        let block = &file.blocks[0];
        assert_eq!(block.header, "test");

        let atom_site = block.category("atom_site").unwrap();
        assert_eq!(atom_site.row_count, 3);
        assert_eq!(atom_site.get_field("id").unwrap().to_int_vec(), vec![1, 2, 3]);

        let charge = atom_site.get_field("charge").unwrap();
        assert_eq!(charge.value_kind(0), ValueKind::Present);
        assert_eq!(charge.value_kind(1), ValueKind::NotPresent);
        assert_eq!(charge.value_kind(2), ValueKind::Unknown);
        assert_eq!(charge.str(0), "1");
        assert_eq!(charge.str(1), "");
    }

    #[test]
    fn test_gzip_wrapped_document() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&document("0.3.0")).unwrap();
        let compressed = encoder.finish().unwrap();
        let file = parse_cif_binary(&compressed).unwrap().result;
        assert_eq!(file.blocks.len(), 1);
    }

    #[test]
    fn test_version_parsing() {
        assert!(check_version("1.0").is_ok());
        assert!(check_version("0.3").is_ok());
        assert!(check_version("0.10.1").is_ok());
        assert!(check_version("0.2.9").is_err());
        assert!(check_version("").is_err());
        assert!(check_version("abc").is_err());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse_cif_binary(&[0xc1, 0x00]).is_err());
        assert!(parse_cif_binary(&[]).is_err());
    }
}
