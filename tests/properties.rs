//! Property tests for the text primitives and the CIF loop reader.

use molio::cif::{parse_cif_text, parse_cif_text_with};
use molio::data::ValueKind;
use molio::task::{ParseOptions, RuntimeContext};
use molio::text::number::{parse_float, parse_int};
use molio::text::Tokenizer;

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    /// A bare CIF value that cannot be mistaken for a keyword, tag or null marker
    fn plain_value() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9+-]{0,7}"
    }

    fn loop_text(columns: usize, values: &[String]) -> String {
        let mut cif = String::from("data_prop\nloop_\n");
        for c in 0..columns {
            cif.push_str(&format!("_t.c{c}\n"));
        }
        for (i, value) in values.iter().enumerate() {
            cif.push_str(value);
            cif.push(if (i + 1) % columns == 0 { '\n' } else { ' ' });
        }
        cif
    }

    proptest! {
        /// Every value written into a loop reads back at its row and column
        #[test]
        fn test_loop_values_read_back(
            columns in 1usize..6,
            rows in 1usize..20,
            seed in prop::collection::vec(plain_value(), 120),
        ) {
            let values: Vec<String> = seed.into_iter().take(columns * rows).collect();
            let cif = loop_text(columns, &values);
            let file = parse_cif_text(&cif).unwrap().result;
            let category = file.blocks[0].category("t").unwrap();

            prop_assert_eq!(category.row_count, rows);
            for c in 0..columns {
                let field = category.get_field(&format!("c{c}")).unwrap();
                for r in 0..rows {
                    prop_assert_eq!(&*field.str(r), values[r * columns + c].as_str());
                    prop_assert_eq!(field.value_kind(r), ValueKind::Present);
                }
            }
        }

        /// A loop whose value count is not a multiple of its column count is rejected
        #[test]
        fn test_loop_arity_is_checked(
            columns in 2usize..6,
            rows in 1usize..10,
            extra in 1usize..5,
        ) {
            prop_assume!(extra % columns != 0);
            let values: Vec<String> = (0..columns * rows + extra).map(|i| format!("v{i}")).collect();
            let cif = loop_text(columns, &values);
            prop_assert!(parse_cif_text(&cif).is_err());
        }

        /// Chunking only changes when progress is reported, never the result
        #[test]
        fn test_chunk_size_is_transparent(
            rows in 1usize..60,
            chunk_size in 1usize..16,
        ) {
            let values: Vec<String> = (0..rows * 2).map(|i| format!("x{i}")).collect();
            let cif = loop_text(2, &values);
            let whole = parse_cif_text(&cif).unwrap().result;
            let chunked = parse_cif_text_with(
                &cif,
                &mut RuntimeContext::new(),
                &ParseOptions::new().with_chunk_size(chunk_size),
            )
            .unwrap()
            .result;

            let a = whole.blocks[0].category("t").unwrap();
            let b = chunked.blocks[0].category("t").unwrap();
            prop_assert_eq!(a.row_count, b.row_count);
            for name in ["c0", "c1"] {
                prop_assert_eq!(
                    a.get_field(name).unwrap().to_str_vec(),
                    b.get_field(name).unwrap().to_str_vec()
                );
            }
        }

        /// `.` and `?` map to not present and unknown wherever they appear
        #[test]
        fn test_null_markers(markers in prop::collection::vec(prop::sample::select(vec![".", "?", "v"]), 1..30)) {
            let values: Vec<String> = markers.iter().map(|s| s.to_string()).collect();
            let cif = loop_text(1, &values);
            let file = parse_cif_text(&cif).unwrap().result;
            let field = file.blocks[0].get_field("t.c0").unwrap();
            for (row, marker) in markers.iter().enumerate() {
                let expected = match *marker {
                    "." => ValueKind::NotPresent,
                    "?" => ValueKind::Unknown,
                    _ => ValueKind::Present,
                };
                prop_assert_eq!(field.value_kind(row), expected);
            }
        }

        /// Integer parsing matches the standard library
        #[test]
        fn test_parse_int(value in -1_000_000_000i32..1_000_000_000) {
            let text = value.to_string();
            prop_assert_eq!(parse_int(text.as_bytes(), 0, text.len()), value);
        }

        /// Fixed-precision float parsing stays within rounding error of the standard library
        #[test]
        fn test_parse_float(value in -1.0e6f64..1.0e6, digits in 0usize..6) {
            let text = format!("{value:.digits$}");
            let expected: f64 = text.parse().unwrap();
            let parsed = parse_float(text.as_bytes(), 0, text.len());
            prop_assert!((parsed - expected).abs() <= 1e-9 * expected.abs().max(1.0), "{} vs {}", parsed, expected);
        }

        /// Line tokens agree with `str::lines` for `\n` separated text
        #[test]
        fn test_read_all_lines(text in "[a-z \n]{0,200}") {
            let tokens = Tokenizer::read_all_lines(&text);
            let expected: Vec<&str> = text.lines().collect();
            prop_assert_eq!(tokens.count(), expected.len());
            for (i, line) in expected.iter().enumerate() {
                prop_assert_eq!(tokens.text(i), *line);
            }
        }
    }
}
