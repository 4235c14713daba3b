//! BinaryCIF codec chain.
//!
//! A column stores its bytes together with the list of encodings that produced
//! them. Decoding applies the inverse of each encoding in reverse order.

use byteorder::{ByteOrder, LittleEndian};

use super::msgpack::Value;

/// Errors that can occur while decoding BinaryCIF data
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The MessagePack envelope is malformed
    #[error("MessagePack error: {0}")]
    Msgpack(String),

    /// A required key is absent or has the wrong type
    #[error("Missing or invalid '{key}' in {context}")]
    Missing {
        /// Key that was looked up
        key: &'static str,
        /// Object that was searched
        context: &'static str,
    },

    /// Encoding kind this decoder does not know
    #[error("Unsupported encoding '{0}'")]
    UnknownEncoding(String),

    /// ByteArray type id this decoder does not know
    #[error("Unsupported ByteArray type {0}")]
    UnknownDataType(i64),

    /// An encoding received input of the wrong shape
    #[error("{encoding} expects {expected} input")]
    UnexpectedInput {
        /// Encoding being applied
        encoding: &'static str,
        /// Input shape it needs
        expected: &'static str,
    },

    /// Uint32 value that does not fit the signed 32-bit integer columns
    #[error("Uint32 value {0} exceeds the 32-bit signed range")]
    OutOfRange(u32),

    /// IntegerPacking byte count other than 1 or 2
    #[error("Unsupported IntegerPacking byteCount {0}")]
    UnsupportedByteCount(i64),

    /// Decoded values are inconsistent (bad offsets, odd run-length data, ...)
    #[error("Corrupt {0} data")]
    Corrupt(&'static str),
}

/// Intermediate and final result of decoding one column
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Raw bytes before any ByteArray step
    Bytes(Vec<u8>),
    /// Integer values
    Int(Vec<i32>),
    /// Float values
    Float(Vec<f64>),
    /// String values
    Str(Vec<String>),
}

fn missing(key: &'static str, context: &'static str) -> DecodeError {
    DecodeError::Missing { key, context }
}

fn int_param(enc: &Value, key: &'static str, context: &'static str) -> Result<i64, DecodeError> {
    enc.get(key).and_then(Value::as_i64).ok_or_else(|| missing(key, context))
}

fn float_param(enc: &Value, key: &'static str, context: &'static str) -> Result<f64, DecodeError> {
    enc.get(key).and_then(Value::as_f64).ok_or_else(|| missing(key, context))
}

fn expect_bytes(input: Decoded, encoding: &'static str) -> Result<Vec<u8>, DecodeError> {
    match input {
        Decoded::Bytes(b) => Ok(b),
        _ => Err(DecodeError::UnexpectedInput {
            encoding,
            expected: "byte",
        }),
    }
}

fn expect_ints(input: Decoded, encoding: &'static str) -> Result<Vec<i32>, DecodeError> {
    match input {
        Decoded::Int(v) => Ok(v),
        _ => Err(DecodeError::UnexpectedInput {
            encoding,
            expected: "integer",
        }),
    }
}

/// Decode an `{ data, encoding }` object
pub fn decode_encoded_data(encoded: &Value) -> Result<Decoded, DecodeError> {
    let data = encoded
        .get("data")
        .and_then(Value::as_bin)
        .ok_or_else(|| missing("data", "encoded data"))?;
    let encoding = encoded
        .get("encoding")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("encoding", "encoded data"))?;
    decode(data, encoding)
}

/// Decode `data` through the encoding chain, innermost encoding last in the list
pub fn decode(data: &[u8], encoding: &[Value]) -> Result<Decoded, DecodeError> {
    let mut current = Decoded::Bytes(data.to_vec());
    for enc in encoding.iter().rev() {
        current = decode_step(current, enc)?;
    }
    Ok(current)
}

fn decode_step(input: Decoded, enc: &Value) -> Result<Decoded, DecodeError> {
    let kind = enc
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("kind", "encoding"))?;
    match kind {
        "ByteArray" => byte_array(expect_bytes(input, "ByteArray")?, enc),
        "FixedPoint" => fixed_point(expect_ints(input, "FixedPoint")?, enc),
        "IntervalQuantization" => interval_quantization(expect_ints(input, "IntervalQuantization")?, enc),
        "RunLength" => run_length(expect_ints(input, "RunLength")?, enc),
        "Delta" => delta(expect_ints(input, "Delta")?, enc),
        "IntegerPacking" => integer_packing(expect_ints(input, "IntegerPacking")?, enc),
        "StringArray" => string_array(expect_bytes(input, "StringArray")?, enc),
        other => Err(DecodeError::UnknownEncoding(other.to_string())),
    }
}

/// Little-endian typed array
fn byte_array(bytes: Vec<u8>, enc: &Value) -> Result<Decoded, DecodeError> {
    let type_id = int_param(enc, "type", "ByteArray")?;
    let ints = |width: usize, read: fn(&[u8]) -> i32| -> Decoded {
        Decoded::Int(bytes.chunks_exact(width).map(read).collect())
    };
    let decoded = match type_id {
        1 => ints(1, |b| i32::from(b[0] as i8)),
        2 => ints(2, |b| i32::from(LittleEndian::read_i16(b))),
        3 => ints(4, LittleEndian::read_i32),
        4 => ints(1, |b| i32::from(b[0])),
        5 => ints(2, |b| i32::from(LittleEndian::read_u16(b))),
        6 => Decoded::Int(
            bytes
                .chunks_exact(4)
                .map(|b| {
                    let v = LittleEndian::read_u32(b);
                    i32::try_from(v).map_err(|_| DecodeError::OutOfRange(v))
                })
                .collect::<Result<_, _>>()?,
        ),
        32 => Decoded::Float(
            bytes
                .chunks_exact(4)
                .map(|b| f64::from(LittleEndian::read_f32(b)))
                .collect(),
        ),
        33 => Decoded::Float(bytes.chunks_exact(8).map(LittleEndian::read_f64).collect()),
        other => return Err(DecodeError::UnknownDataType(other)),
    };
    Ok(decoded)
}

fn fixed_point(values: Vec<i32>, enc: &Value) -> Result<Decoded, DecodeError> {
    let factor = float_param(enc, "factor", "FixedPoint")?;
    Ok(Decoded::Float(
        values.into_iter().map(|v| f64::from(v) / factor).collect(),
    ))
}

fn interval_quantization(values: Vec<i32>, enc: &Value) -> Result<Decoded, DecodeError> {
    let min = float_param(enc, "min", "IntervalQuantization")?;
    let max = float_param(enc, "max", "IntervalQuantization")?;
    let num_steps = int_param(enc, "numSteps", "IntervalQuantization")?;
    if num_steps < 2 {
        return Err(DecodeError::Corrupt("IntervalQuantization"));
    }
    let delta = (max - min) / (num_steps - 1) as f64;
    Ok(Decoded::Float(
        values
            .into_iter()
            .map(|v| min + delta * f64::from(v))
            .collect(),
    ))
}

/// `(value, count)` pairs
fn run_length(values: Vec<i32>, enc: &Value) -> Result<Decoded, DecodeError> {
    if values.len() % 2 != 0 {
        return Err(DecodeError::Corrupt("RunLength"));
    }
    let src_size = int_param(enc, "srcSize", "RunLength")?.max(0) as usize;
    let mut out = Vec::with_capacity(src_size.min(values.len() * 64));
    for pair in values.chunks_exact(2) {
        let count = pair[1].max(0) as usize;
        if out.len() + count > src_size {
            return Err(DecodeError::Corrupt("RunLength"));
        }
        out.extend(std::iter::repeat(pair[0]).take(count));
    }
    Ok(Decoded::Int(out))
}

fn delta(mut values: Vec<i32>, enc: &Value) -> Result<Decoded, DecodeError> {
    let origin = enc.get("origin").and_then(Value::as_i64).unwrap_or(0) as i32;
    let mut acc = origin;
    for v in values.iter_mut() {
        acc = acc.wrapping_add(*v);
        *v = acc;
    }
    Ok(Decoded::Int(values))
}

/// Values packed into 8 or 16 bits; a value at the type limit continues into the next one
fn integer_packing(packed: Vec<i32>, enc: &Value) -> Result<Decoded, DecodeError> {
    let byte_count = int_param(enc, "byteCount", "IntegerPacking")?;
    let src_size = int_param(enc, "srcSize", "IntegerPacking")?.max(0) as usize;
    let is_unsigned = enc.get("isUnsigned").and_then(Value::as_bool).unwrap_or(false);

    let upper: i32 = match (byte_count, is_unsigned) {
        (1, true) => 0xFF,
        (1, false) => 0x7F,
        (2, true) => 0xFFFF,
        (2, false) => 0x7FFF,
        (other, _) => return Err(DecodeError::UnsupportedByteCount(other)),
    };
    let lower = if is_unsigned { None } else { Some(-upper - 1) };
    let at_limit = |t: i32| t == upper || Some(t) == lower;

    let mut out = Vec::with_capacity(src_size.min(packed.len()));
    let mut i = 0;
    while i < packed.len() && out.len() < src_size {
        let mut value = 0i32;
        while i < packed.len() && at_limit(packed[i]) {
            value = value.wrapping_add(packed[i]);
            i += 1;
        }
        if i < packed.len() {
            value = value.wrapping_add(packed[i]);
            i += 1;
        }
        out.push(value);
    }
    Ok(Decoded::Int(out))
}

/// Indices into a table of strings given as one blob plus offsets; a negative index is the empty string
fn string_array(bytes: Vec<u8>, enc: &Value) -> Result<Decoded, DecodeError> {
    let string_data = enc
        .get("stringData")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("stringData", "StringArray"))?;
    let offsets_bytes = enc
        .get("offsets")
        .and_then(Value::as_bin)
        .ok_or_else(|| missing("offsets", "StringArray"))?;
    let offset_encoding = enc
        .get("offsetEncoding")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("offsetEncoding", "StringArray"))?;
    let data_encoding = enc
        .get("dataEncoding")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("dataEncoding", "StringArray"))?;

    let offsets = expect_ints(decode(offsets_bytes, offset_encoding)?, "StringArray offsets")?;
    let mut strings = Vec::with_capacity(offsets.len().saturating_sub(1));
    for w in offsets.windows(2) {
        let s = usize::try_from(w[0]).map_err(|_| DecodeError::Corrupt("StringArray"))?;
        let e = usize::try_from(w[1]).map_err(|_| DecodeError::Corrupt("StringArray"))?;
        let text = string_data
            .get(s..e)
            .ok_or(DecodeError::Corrupt("StringArray"))?;
        strings.push(text);
    }

    let indices = expect_ints(decode(&bytes, data_encoding)?, "StringArray indices")?;
    let values = indices
        .into_iter()
        .map(|idx| match usize::try_from(idx) {
            Ok(i) => strings
                .get(i)
                .map(|s| s.to_string())
                .ok_or(DecodeError::Corrupt("StringArray")),
            Err(_) => Ok(String::new()),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Decoded::Str(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(kind: &str, params: Vec<(&str, Value)>) -> Value {
        let mut pairs = vec![(Value::Str("kind".into()), Value::Str(kind.into()))];
        pairs.extend(params.into_iter().map(|(k, v)| (Value::Str(k.into()), v)));
        Value::Map(pairs)
    }

    fn byte_array_enc(type_id: u64) -> Value {
        enc("ByteArray", vec![("type", Value::Uint(type_id))])
    }

    fn i32_bytes(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_byte_array_types() {
        let bytes = i32_bytes(&[1, -2, 300]);
        assert_eq!(decode(&bytes, &[byte_array_enc(3)]).unwrap(), Decoded::Int(vec![1, -2, 300]));
        assert_eq!(decode(&[0xff, 0x01], &[byte_array_enc(1)]).unwrap(), Decoded::Int(vec![-1, 1]));
        assert_eq!(decode(&[0xff, 0x01], &[byte_array_enc(4)]).unwrap(), Decoded::Int(vec![255, 1]));
        let floats: Vec<u8> = 2.5f64.to_le_bytes().to_vec();
        assert_eq!(decode(&floats, &[byte_array_enc(33)]).unwrap(), Decoded::Float(vec![2.5]));
        assert!(matches!(
            decode(&[0], &[byte_array_enc(99)]),
            Err(DecodeError::UnknownDataType(99))
        ));
    }

    #[test]
    fn test_fixed_point_over_delta_over_run_length() {
        // runs [(10, 3)] -> [10,10,10], delta from origin 0 -> [10,20,30], /100
        let bytes = i32_bytes(&[10, 3]);
        let chain = vec![
            enc("FixedPoint", vec![("factor", Value::Uint(100))]),
            enc("Delta", vec![("origin", Value::Uint(0))]),
            enc("RunLength", vec![("srcSize", Value::Uint(3))]),
            byte_array_enc(3),
        ];
        match decode(&bytes, &chain).unwrap() {
            Decoded::Float(v) => {
                assert_eq!(v.len(), 3);
                assert!((v[0] - 0.1).abs() < 1e-12);
                assert!((v[2] - 0.3).abs() < 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_delta_origin() {
        let bytes = i32_bytes(&[1, 1, 1]);
        let chain = vec![enc("Delta", vec![("origin", Value::Int(-5))]), byte_array_enc(3)];
        assert_eq!(decode(&bytes, &chain).unwrap(), Decoded::Int(vec![-4, -3, -2]));
    }

    #[test]
    fn test_integer_packing() {
        // 127 + 3 = 130 packed as int8, then -128 + -2 = -130, then 5
        let packed: Vec<u8> = [127i8, 3, -128, -2, 5].iter().map(|&v| v as u8).collect();
        let chain = vec![
            enc(
                "IntegerPacking",
                vec![
                    ("byteCount", Value::Uint(1)),
                    ("srcSize", Value::Uint(3)),
                    ("isUnsigned", Value::Bool(false)),
                ],
            ),
            byte_array_enc(1),
        ];
        assert_eq!(decode(&packed, &chain).unwrap(), Decoded::Int(vec![130, -130, 5]));
    }

    #[test]
    fn test_uint32_out_of_signed_range() {
        let bytes: Vec<u8> = [7u32, 0x8000_0000].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert!(matches!(
            decode(&bytes, &[byte_array_enc(6)]),
            Err(DecodeError::OutOfRange(0x8000_0000))
        ));
        let max = i32::MAX as u32;
        assert_eq!(
            decode(&max.to_le_bytes(), &[byte_array_enc(6)]).unwrap(),
            Decoded::Int(vec![i32::MAX])
        );
    }

    #[test]
    fn test_integer_packing_byte_count() {
        let packed = i32_bytes(&[1, 2]);
        for byte_count in [0, 4] {
            let chain = vec![
                enc(
                    "IntegerPacking",
                    vec![
                        ("byteCount", Value::Uint(byte_count)),
                        ("srcSize", Value::Uint(2)),
                        ("isUnsigned", Value::Bool(false)),
                    ],
                ),
                byte_array_enc(3),
            ];
            assert!(matches!(
                decode(&packed, &chain),
                Err(DecodeError::UnsupportedByteCount(n)) if n == byte_count as i64
            ));
        }
    }

    #[test]
    fn test_interval_quantization() {
        let bytes = i32_bytes(&[0, 1, 2]);
        let chain = vec![
            enc(
                "IntervalQuantization",
                vec![
                    ("min", Value::F64(1.0)),
                    ("max", Value::F64(2.0)),
                    ("numSteps", Value::Uint(3)),
                ],
            ),
            byte_array_enc(3),
        ];
        assert_eq!(decode(&bytes, &chain).unwrap(), Decoded::Float(vec![1.0, 1.5, 2.0]));
    }

    #[test]
    fn test_string_array() {
        let offsets = i32_bytes(&[0, 3, 5]);
        let indices = i32_bytes(&[0, 1, -1, 0]);
        let chain = vec![enc(
            "StringArray",
            vec![
                ("dataEncoding", Value::Array(vec![byte_array_enc(3)])),
                ("stringData", Value::Str("ALAGL".into())),
                ("offsetEncoding", Value::Array(vec![byte_array_enc(3)])),
                ("offsets", Value::Bin(offsets)),
            ],
        )];
        assert_eq!(
            decode(&indices, &chain).unwrap(),
            Decoded::Str(vec!["ALA".into(), "GL".into(), String::new(), "ALA".into()])
        );
    }

    #[test]
    fn test_unknown_encoding() {
        let chain = vec![enc("Zstd", vec![])];
        assert!(matches!(
            decode(&[], &chain),
            Err(DecodeError::UnknownEncoding(kind)) if kind == "Zstd"
        ));
    }

    #[test]
    fn test_run_length_cannot_exceed_declared_size() {
        let bytes = i32_bytes(&[1, 1_000_000]);
        let chain = vec![enc("RunLength", vec![("srcSize", Value::Uint(2))]), byte_array_enc(3)];
        assert!(matches!(decode(&bytes, &chain), Err(DecodeError::Corrupt("RunLength"))));
    }
}
