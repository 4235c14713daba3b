//! Field type inference and tensor field naming.

use crate::data::{ValueKind, ValueType};
use crate::result::ReaderError;
use crate::text::{get_number_type, NumberType};

use super::{BinaryData, CifCategory, CifField};

/// Infer the value type of a field from its present values.
///
/// Integers only give [`ValueType::Int`], any decimal gives [`ValueType::Float`].
/// Scientific notation is indistinguishable from text and gives [`ValueType::Str`],
/// as does a field with no present value at all. Numeric binary fields keep
/// their decoded type.
pub fn infer_field_type(field: &CifField<'_>) -> ValueType {
    match field.binary().map(|f| &f.data) {
        Some(BinaryData::Int(_)) => return ValueType::Int,
        Some(BinaryData::Float(_)) => return ValueType::Float,
        _ => {}
    }

    let row_count = field.row_count();
    let mut float_count = 0;
    let mut undefined_count = 0;
    for row in 0..row_count {
        if field.value_kind(row) != ValueKind::Present {
            undefined_count += 1;
            continue;
        }
        match get_number_type(&field.str(row)) {
            NumberType::Int => {}
            NumberType::Float => float_count += 1,
            NumberType::Scientific | NumberType::NaN => return ValueType::Str,
        }
    }

    if undefined_count == row_count {
        ValueType::Str
    } else if float_count > 0 {
        ValueType::Float
    } else {
        ValueType::Int
    }
}

/// How tensor components are spelled in field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorNaming {
    /// `matrix_12`
    #[default]
    Underscore,
    /// `matrix[1][2]`
    Brackets,
}

/// Names of the scalar fields storing one tensor
#[derive(Debug, Clone)]
pub struct TensorFieldNames {
    field: String,
    rank: usize,
    offset: usize,
    naming: TensorNaming,
}

/// Field names of a rank 1 to 3 tensor stored as one field per component.
///
/// Fails with [`ReaderError::Unsupported`] for rank 0 or rank above 3.
pub fn tensor_field_name(
    field: &str,
    rank: usize,
    zero_indexed: bool,
    naming: TensorNaming,
) -> Result<TensorFieldNames, ReaderError> {
    if rank == 0 || rank > 3 {
        return Err(ReaderError::Unsupported(
            "Tensors with rank > 3 or rank 0 are currently not supported.".to_string(),
        ));
    }
    Ok(TensorFieldNames {
        field: field.to_string(),
        rank,
        offset: if zero_indexed { 0 } else { 1 },
        naming,
    })
}

impl TensorFieldNames {
    /// Tensor rank
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Field name of the component at `index` (one index per dimension)
    pub fn name(&self, index: &[usize]) -> String {
        let mut name = self.field.clone();
        match self.naming {
            TensorNaming::Brackets => {
                for i in index.iter().take(self.rank) {
                    name.push_str(&format!("[{}]", i + self.offset));
                }
            }
            TensorNaming::Underscore => {
                name.push('_');
                for i in index.iter().take(self.rank) {
                    name.push_str(&(i + self.offset).to_string());
                }
            }
        }
        name
    }
}

/// Read one tensor of `row` in row-major order; missing components read as 0.0.
pub fn get_tensor(
    category: &CifCategory<'_>,
    row: usize,
    dimensions: &[usize],
    names: &TensorFieldNames,
) -> Result<Vec<f64>, ReaderError> {
    if dimensions.len() != names.rank() {
        return Err(ReaderError::Unsupported(format!(
            "Tensor of rank {} read with {} dimensions",
            names.rank(),
            dimensions.len()
        )));
    }

    let size = dimensions.iter().product();
    let mut values = Vec::with_capacity(size);
    let mut index = vec![0usize; dimensions.len()];
    for _ in 0..size {
        let value = category
            .get_field(&names.name(&index))
            .map(|f| f.float(row))
            .unwrap_or(0.0);
        values.push(value);

        // odometer increment, last dimension fastest
        for d in (0..index.len()).rev() {
            index[d] += 1;
            if index[d] < dimensions[d] {
                break;
            }
            index[d] = 0;
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> CifField<'static> {
        CifField::of_strings(values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_infer_field_type() {
        assert_eq!(infer_field_type(&strings(&["1", "2", "?"])), ValueType::Int);
        assert_eq!(infer_field_type(&strings(&["1", "2.5", "."])), ValueType::Float);
        assert_eq!(infer_field_type(&strings(&["1", "1e5"])), ValueType::Str);
        assert_eq!(infer_field_type(&strings(&["ALA", "1"])), ValueType::Str);
        assert_eq!(infer_field_type(&strings(&["?", "."])), ValueType::Str);
        assert_eq!(infer_field_type(&CifField::of_floats(vec![1.0])), ValueType::Float);
    }

    #[test]
    fn test_tensor_names() {
        let n = tensor_field_name("matrix", 2, false, TensorNaming::Underscore).unwrap();
        assert_eq!(n.name(&[0, 2]), "matrix_13");
        let n = tensor_field_name("m", 3, true, TensorNaming::Brackets).unwrap();
        assert_eq!(n.name(&[1, 0, 2]), "m[1][0][2]");
        let n = tensor_field_name("v", 1, false, TensorNaming::Brackets).unwrap();
        assert_eq!(n.name(&[0]), "v[1]");
    }

    #[test]
    fn test_unsupported_rank() {
        assert!(matches!(
            tensor_field_name("m", 0, false, TensorNaming::Underscore),
            Err(ReaderError::Unsupported(_))
        ));
        assert!(matches!(
            tensor_field_name("m", 4, false, TensorNaming::Underscore),
            Err(ReaderError::Unsupported(_))
        ));
    }

    #[test]
    fn test_get_tensor_row_major() {
        let category = CifCategory::of_fields(
            "op",
            vec![
                ("m_11".to_string(), CifField::of_floats(vec![1.0])),
                ("m_12".to_string(), CifField::of_floats(vec![2.0])),
                ("m_21".to_string(), CifField::of_floats(vec![3.0])),
            ],
        );
        let names = tensor_field_name("m", 2, false, TensorNaming::Underscore).unwrap();
        let t = get_tensor(&category, 0, &[2, 2], &names).unwrap();
        assert_eq!(t, vec![1.0, 2.0, 3.0, 0.0]);
    }
}
