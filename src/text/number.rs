//! Fast number parsing over byte ranges of the source text.
//!
//! These parsers never allocate and never fail: they stop at the first
//! character that cannot be part of the number and return what was read so far.

/// Classification of a textual value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberType {
    /// Optional sign followed by digits (or a trailing `.` with no fraction)
    Int,
    /// Digits with a fractional part
    Float,
    /// Mantissa with an `e`/`E` exponent
    Scientific,
    /// Anything else
    NaN,
}

/// Parse an integer from `bytes[start..end]`, stopping at the first non-digit.
pub fn parse_int(bytes: &[u8], start: usize, end: usize) -> i32 {
    let end = end.min(bytes.len());
    let mut pos = start;
    let mut neg = 1i32;
    if pos < end && bytes[pos] == b'-' {
        neg = -1;
        pos += 1;
    } else if pos < end && bytes[pos] == b'+' {
        pos += 1;
    }
    let mut ret = 0i32;
    while pos < end {
        let c = bytes[pos].wrapping_sub(b'0');
        if c > 9 {
            break;
        }
        ret = ret.wrapping_mul(10).wrapping_add(c as i32);
        pos += 1;
    }
    neg.wrapping_mul(ret)
}

/// Same as [`parse_int`] but skips leading spaces first.
pub fn parse_int_skip_leading_whitespace(bytes: &[u8], start: usize, end: usize) -> i32 {
    let end = end.min(bytes.len());
    let mut pos = start;
    while pos < end && bytes[pos] == b' ' {
        pos += 1;
    }
    parse_int(bytes, pos, end)
}

fn parse_scientific(main: f64, bytes: &[u8], start: usize, end: usize) -> f64 {
    let mut pos = start;
    // '+' in "1e+1"
    if pos < end && bytes[pos] == b'+' {
        pos += 1;
    }
    main * 10f64.powi(parse_int(bytes, pos, end))
}

/// Parse a float from `bytes[start..end]` supporting sign, fraction and exponent.
pub fn parse_float(bytes: &[u8], start: usize, end: usize) -> f64 {
    let end = end.min(bytes.len());
    let mut pos = start;
    let mut neg = 1.0;
    let mut ret = 0.0;
    if pos < end && bytes[pos] == b'-' {
        neg = -1.0;
        pos += 1;
    } else if pos < end && bytes[pos] == b'+' {
        pos += 1;
    }

    while pos < end {
        let c = bytes[pos];
        if c.is_ascii_digit() {
            ret = ret * 10.0 + f64::from(c - b'0');
            pos += 1;
        } else if c == b'.' {
            pos += 1;
            let mut point = 0.0;
            let mut div = 1.0;
            while pos < end {
                let c = bytes[pos];
                if c.is_ascii_digit() {
                    point = point * 10.0 + f64::from(c - b'0');
                    div *= 10.0;
                    pos += 1;
                } else if c == b'e' || c == b'E' {
                    return parse_scientific(neg * (ret + point / div), bytes, pos + 1, end);
                } else {
                    break;
                }
            }
            return neg * (ret + point / div);
        } else if c == b'e' || c == b'E' {
            return parse_scientific(neg * ret, bytes, pos + 1, end);
        } else {
            break;
        }
    }
    neg * ret
}

/// Same as [`parse_float`] but skips leading spaces first.
pub fn parse_float_skip_leading_whitespace(bytes: &[u8], start: usize, end: usize) -> f64 {
    let end = end.min(bytes.len());
    let mut pos = start;
    while pos < end && bytes[pos] == b' ' {
        pos += 1;
    }
    parse_float(bytes, pos, end)
}

fn is_int(bytes: &[u8], mut start: usize, end: usize) -> bool {
    if start < end && bytes[start] == b'-' {
        start += 1;
    }
    bytes[start.min(end)..end].iter().all(u8::is_ascii_digit)
}

fn scientific_type(bytes: &[u8], mut start: usize, end: usize) -> NumberType {
    if start < end && bytes[start] == b'+' {
        start += 1;
    }
    if is_int(bytes, start, end) {
        NumberType::Scientific
    } else {
        NumberType::NaN
    }
}

/// Classify a whole string. The entire string must match, otherwise `NaN`.
pub fn get_number_type(s: &str) -> NumberType {
    let bytes = s.as_bytes();
    let end = bytes.len();
    let mut pos = 0;
    if pos < end && bytes[pos] == b'-' {
        pos += 1;
    }
    // "." or "-."
    if pos < end && bytes[pos] == b'.' && end - pos == 1 {
        return NumberType::NaN;
    }

    while pos < end {
        let c = bytes[pos];
        if c.is_ascii_digit() {
            pos += 1;
        } else if c == b'.' {
            pos += 1;
            let mut has_digit = false;
            while pos < end {
                let c = bytes[pos];
                if c.is_ascii_digit() {
                    has_digit = true;
                    pos += 1;
                } else if c == b'e' || c == b'E' {
                    return scientific_type(bytes, pos + 1, end);
                } else {
                    return NumberType::NaN;
                }
            }
            return if has_digit {
                NumberType::Float
            } else {
                NumberType::Int
            };
        } else if c == b'e' || c == b'E' {
            return scientific_type(bytes, pos + 1, end);
        } else {
            break;
        }
    }

    if pos == end {
        NumberType::Int
    } else {
        NumberType::NaN
    }
}
