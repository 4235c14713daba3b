use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, Int32Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use crate::cif::{infer_field_type, CifCategory, CifField};
use crate::data::{ValueKind, ValueType};

use super::ExportError;

/// Column name used for the unnamed field of a category
pub(crate) const UNNAMED_FIELD: &str = "value";

fn column_name(field_name: &str) -> &str {
    if field_name.is_empty() {
        UNNAMED_FIELD
    } else {
        field_name
    }
}

pub(crate) fn arrow_type(value_type: ValueType) -> DataType {
    match value_type {
        ValueType::Str => DataType::Utf8,
        ValueType::Int => DataType::Int32,
        ValueType::Float => DataType::Float64,
    }
}

/// Arrow schema of a category, one nullable column per field
pub fn category_schema(category: &CifCategory<'_>) -> SchemaRef {
    let fields: Vec<Field> = category
        .fields()
        .map(|(name, field)| {
            Field::new(
                column_name(name),
                arrow_type(infer_field_type(field)),
                true,
            )
        })
        .collect();
    Arc::new(Schema::new(fields))
}

fn build_column(field: &CifField<'_>, value_type: ValueType, rows: usize) -> ArrayRef {
    let present = |row: usize| field.value_kind(row) == ValueKind::Present;
    match value_type {
        ValueType::Str => {
            let mut builder = StringBuilder::with_capacity(rows, rows * 8);
            for row in 0..rows {
                if present(row) {
                    builder.append_value(field.str(row));
                } else {
                    builder.append_null();
                }
            }
            Arc::new(builder.finish())
        }
        ValueType::Int => {
            let mut builder = Int32Builder::with_capacity(rows);
            for row in 0..rows {
                if present(row) {
                    builder.append_value(field.int(row));
                } else {
                    builder.append_null();
                }
            }
            Arc::new(builder.finish())
        }
        ValueType::Float => {
            let mut builder = Float64Builder::with_capacity(rows);
            for row in 0..rows {
                if present(row) {
                    builder.append_value(field.float(row));
                } else {
                    builder.append_null();
                }
            }
            Arc::new(builder.finish())
        }
    }
}

/// Convert a category into a record batch with the schema of [`category_schema`]
pub fn category_to_record_batch(category: &CifCategory<'_>) -> Result<RecordBatch, ExportError> {
    let rows = category.row_count;
    let schema = category_schema(category);
    let mut columns = Vec::with_capacity(schema.fields().len());
    for ((name, field), arrow_field) in category.fields().zip(schema.fields().iter()) {
        if field.row_count() != rows {
            return Err(ExportError::InvalidData(format!(
                "field '{}.{}' has {} rows, category has {}",
                category.name,
                name,
                field.row_count(),
                rows
            )));
        }
        let value_type = match arrow_field.data_type() {
            DataType::Int32 => ValueType::Int,
            DataType::Float64 => ValueType::Float,
            _ => ValueType::Str,
        };
        columns.push(build_column(field, value_type, rows));
    }

    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    Ok(RecordBatch::try_new_with_options(schema, columns, &options)?)
}
