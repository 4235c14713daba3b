//! BinaryCIF documents built with rmp and read back through the public API.

use molio::cif::{infer_field_type, parse_cif_binary};
use molio::data::{ValueKind, ValueType};
use molio::result::ReaderError;
use rmp::encode;

fn key(buf: &mut Vec<u8>, name: &str) {
    encode::write_str(buf, name).unwrap();
}

fn i32_bytes(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn byte_array(buf: &mut Vec<u8>, type_id: u8) {
    encode::write_map_len(buf, 2).unwrap();
    key(buf, "kind");
    encode::write_str(buf, "ByteArray").unwrap();
    key(buf, "type");
    encode::write_uint(buf, u64::from(type_id)).unwrap();
}

/// `{ data, encoding: [ByteArray(Int32)] }`
fn int_data(buf: &mut Vec<u8>, values: &[i32]) {
    encode::write_map_len(buf, 2).unwrap();
    key(buf, "data");
    encode::write_bin(buf, &i32_bytes(values)).unwrap();
    key(buf, "encoding");
    encode::write_array_len(buf, 1).unwrap();
    byte_array(buf, 3);
}

/// `{ data, encoding: [FixedPoint(factor), ByteArray(Int32)] }`
fn fixed_point_data(buf: &mut Vec<u8>, values: &[i32], factor: u64) {
    encode::write_map_len(buf, 2).unwrap();
    key(buf, "data");
    encode::write_bin(buf, &i32_bytes(values)).unwrap();
    key(buf, "encoding");
    encode::write_array_len(buf, 2).unwrap();
    encode::write_map_len(buf, 3).unwrap();
    key(buf, "kind");
    encode::write_str(buf, "FixedPoint").unwrap();
    key(buf, "factor");
    encode::write_uint(buf, factor).unwrap();
    key(buf, "srcType");
    encode::write_uint(buf, 33).unwrap();
    byte_array(buf, 3);
}

/// `{ data, encoding: [ByteArray(Float32)] }`
fn f32_data(buf: &mut Vec<u8>, values: &[f32]) {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    encode::write_map_len(buf, 2).unwrap();
    key(buf, "data");
    encode::write_bin(buf, &bytes).unwrap();
    key(buf, "encoding");
    encode::write_array_len(buf, 1).unwrap();
    byte_array(buf, 32);
}

/// `{ data, encoding: [StringArray] }` with Int32 offsets and indices
fn string_data(buf: &mut Vec<u8>, strings: &[&str], indices: &[i32]) {
    let mut offsets = vec![0];
    let mut joined = String::new();
    for s in strings {
        joined.push_str(s);
        offsets.push(joined.len() as i32);
    }
    encode::write_map_len(buf, 2).unwrap();
    key(buf, "data");
    encode::write_bin(buf, &i32_bytes(indices)).unwrap();
    key(buf, "encoding");
    encode::write_array_len(buf, 1).unwrap();
    encode::write_map_len(buf, 5).unwrap();
    key(buf, "kind");
    encode::write_str(buf, "StringArray").unwrap();
    key(buf, "dataEncoding");
    encode::write_array_len(buf, 1).unwrap();
    byte_array(buf, 3);
    key(buf, "stringData");
    encode::write_str(buf, &joined).unwrap();
    key(buf, "offsetEncoding");
    encode::write_array_len(buf, 1).unwrap();
    byte_array(buf, 3);
    key(buf, "offsets");
    encode::write_bin(buf, &i32_bytes(&offsets)).unwrap();
}

fn column_header(buf: &mut Vec<u8>, name: &str) {
    encode::write_map_len(buf, 3).unwrap();
    key(buf, "name");
    encode::write_str(buf, name).unwrap();
    key(buf, "data");
}

fn no_mask(buf: &mut Vec<u8>) {
    key(buf, "mask");
    encode::write_nil(buf).unwrap();
}

fn category_header(buf: &mut Vec<u8>, name: &str, rows: u64, columns: u32) {
    encode::write_map_len(buf, 3).unwrap();
    key(buf, "name");
    encode::write_str(buf, name).unwrap();
    key(buf, "rowCount");
    encode::write_uint(buf, rows).unwrap();
    key(buf, "columns");
    encode::write_array_len(buf, columns).unwrap();
}

/// Block `1ABC` with `_entry` (1 row) and `_atom_site` (3 rows, 4 columns)
fn structure(atom_rows: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    encode::write_map_len(&mut buf, 3).unwrap();
    key(&mut buf, "version");
    encode::write_str(&mut buf, "0.3.0").unwrap();
    key(&mut buf, "encoder");
    encode::write_str(&mut buf, "integration-test").unwrap();
    key(&mut buf, "dataBlocks");
    encode::write_array_len(&mut buf, 1).unwrap();

    encode::write_map_len(&mut buf, 2).unwrap();
    key(&mut buf, "header");
    encode::write_str(&mut buf, "1ABC").unwrap();
    key(&mut buf, "categories");
    encode::write_array_len(&mut buf, 2).unwrap();

    category_header(&mut buf, "_entry", 1, 1);
    column_header(&mut buf, "id");
    string_data(&mut buf, &["1ABC"], &[0]);
    no_mask(&mut buf);

    category_header(&mut buf, "_atom_site", atom_rows, 4);
    column_header(&mut buf, "id");
    int_data(&mut buf, &[1, 2, 3]);
    no_mask(&mut buf);

    column_header(&mut buf, "label_comp_id");
    string_data(&mut buf, &["ALA", "GLY"], &[0, 1, 0]);
    no_mask(&mut buf);

    column_header(&mut buf, "Cartn_x");
    fixed_point_data(&mut buf, &[10500, -2250, 0], 1000);
    key(&mut buf, "mask");
    int_data(&mut buf, &[0, 0, 2]);

    column_header(&mut buf, "B_iso_or_equiv");
    f32_data(&mut buf, &[1.5, 2.5, 3.0]);
    no_mask(&mut buf);
    buf
}

#[test]
fn test_binary_structure() {
    let parsed = parse_cif_binary(&structure(3)).unwrap();
    assert!(parsed.warnings.is_empty());
    let file = parsed.result;
    assert_eq!(file.name.as_deref(), Some("integration-test"));

    let block = file.block("1ABC").unwrap();
    assert_eq!(block.get_field("entry.id").unwrap().str(0), "1ABC");

    let atoms = block.category("atom_site").unwrap();
    assert_eq!(atoms.row_count, 3);
    assert_eq!(
        atoms.field_names,
        vec!["id", "label_comp_id", "Cartn_x", "B_iso_or_equiv"]
    );

    let comp = atoms.get_field("label_comp_id").unwrap();
    assert_eq!(comp.to_str_vec(), vec!["ALA", "GLY", "ALA"]);
    assert!(comp.are_values_equal(0, 2));

    let x = atoms.get_field("Cartn_x").unwrap();
    assert_eq!(x.float(0), 10.5);
    assert_eq!(x.float(1), -2.25);
    assert_eq!(x.value_kind(2), ValueKind::Unknown);
    assert_eq!(x.str(2), "");

    let b = atoms.get_field("B_iso_or_equiv").unwrap();
    assert_eq!(b.to_float_vec(), vec![1.5, 2.5, 3.0]);
}

#[test]
fn test_binary_field_types() {
    let file = parse_cif_binary(&structure(3)).unwrap().result;
    let atoms = file.blocks[0].category("atom_site").unwrap();
    let types: Vec<_> = atoms.fields().map(|(_, f)| infer_field_type(f)).collect();
    assert_eq!(
        types,
        vec![ValueType::Int, ValueType::Str, ValueType::Float, ValueType::Float]
    );
}

#[test]
fn test_row_count_mismatch_is_an_error() {
    let err = parse_cif_binary(&structure(4)).unwrap_err();
    assert!(matches!(err, ReaderError::Format(_)));
    let message = err.to_string();
    assert!(message.contains("atom_site.id"), "{message}");
    assert!(message.contains("expected 4 values"), "{message}");
}

#[test]
fn test_text_is_not_binary() {
    assert!(parse_cif_binary(b"data_x\n_a.b 1\n").is_err());
}
