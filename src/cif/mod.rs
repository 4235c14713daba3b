//! CIF and BinaryCIF readers.
//!
//! Both flavours produce the same [`CifFile`] model. Text fields borrow the
//! source string and parse values on access; binary fields hold the decoded
//! arrays.
//!
//! ```
//! use molio::cif::parse_cif_text;
//!
//! let file = parse_cif_text("data_x\n_cell.length_a 10.5\n").unwrap().result;
//! let a = file.blocks[0].get_field("cell.length_a").unwrap();
//! assert_eq!(a.float(0), 10.5);
//! ```

pub mod binary;
mod data_model;
pub mod schema;
pub mod text;

pub use binary::parse_cif_binary;
pub use data_model::{
    BinaryData, BinaryField, CategoryMap, CifBlock, CifCategory, CifField, CifFile, CifSaveFrame,
};
pub use schema::{get_tensor, infer_field_type, tensor_field_name, TensorFieldNames, TensorNaming};
pub use text::{parse_cif_text, parse_cif_text_with};
