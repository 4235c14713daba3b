//! SD file reader: MOL records with data items, separated by `$$$$`.
//!
//! A record whose counts line cannot be read is skipped up to the next `$$$$`
//! and reported in [`Parsed::warnings`].

use log::{debug, warn};

use crate::data::TokenColumn;
use crate::result::{Parsed, ReaderResult};
use crate::task::{Progress, RuntimeContext};
use crate::text::{trim_range, Tokenizer, Tokens};

use super::mol::{read_mol_record, MolFile};

const DELIMITER: &str = "$$$$";

/// `> <name>` data items following a MOL record
#[derive(Debug, Clone)]
pub struct SdfDataItems<'a> {
    /// Header text after `>`, e.g. `<PUBCHEM_COMPOUND_CID>`
    pub data_header: TokenColumn<'a, &'a str>,
    /// Value lines, joined as they appear in the file
    pub data: TokenColumn<'a, &'a str>,
}

/// One compound of an SD file
#[derive(Debug, Clone)]
pub struct SdfCompound<'a> {
    /// The molecule
    pub mol: MolFile<'a>,
    /// Its data items
    pub data_items: SdfDataItems<'a>,
}

/// A parsed SD file
#[derive(Debug, Clone)]
pub struct SdfFile<'a> {
    /// Compounds in file order
    pub compounds: Vec<SdfCompound<'a>>,
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Data items up to and including the `$$$$` line
fn read_data_items<'a>(t: &mut Tokenizer<'a>) -> SdfDataItems<'a> {
    let data = t.data();
    let mut headers = Tokens::new(data, 32);
    let mut values = Tokens::new(data, 32);

    while !t.at_end() {
        let line = t.read_line();
        if line.starts_with(DELIMITER) {
            break;
        }
        if !line.starts_with('>') {
            continue;
        }
        let (start, end) = trim_range(data, t.token_start + 1, t.token_end);
        headers.add(start, end);

        let mut value: Option<(usize, usize)> = None;
        while !t.at_end() {
            let (position, line_number) = (t.position, t.line_number);
            let line = t.read_line();
            if line.starts_with(DELIMITER) || line.starts_with('>') {
                t.position = position;
                t.line_number = line_number;
                break;
            }
            if is_blank(line) {
                break;
            }
            value = Some(match value {
                Some((start, _)) => (start, t.token_end),
                None => (t.token_start, t.token_end),
            });
        }
        let (start, end) = value.unwrap_or((t.position, t.position));
        values.add(start, end);
    }

    SdfDataItems {
        data_header: TokenColumn::new(headers),
        data: TokenColumn::new(values),
    }
}

fn skip_past_delimiter(t: &mut Tokenizer<'_>) {
    while !t.at_end() {
        if t.read_line().starts_with(DELIMITER) {
            return;
        }
    }
}

/// Parse an SD file with a default runtime context
pub fn parse_sdf(data: &str) -> ReaderResult<SdfFile<'_>> {
    parse_sdf_with(data, &mut RuntimeContext::new())
}

/// Parse an SD file, reporting progress after every compound
pub fn parse_sdf_with<'a>(data: &'a str, ctx: &mut RuntimeContext) -> ReaderResult<SdfFile<'a>> {
    let mut t = Tokenizer::new(data);
    let mut compounds = Vec::new();
    let mut warnings = Vec::new();

    ctx.update(Progress::parsing(0, data.len()))?;
    while !t.at_end() && !is_blank(&data[t.position..]) {
        let (start, start_line) = (t.position, t.line_number);
        match read_mol_record(&mut t) {
            Ok(mol) => {
                let data_items = read_data_items(&mut t);
                compounds.push(SdfCompound { mol, data_items });
            }
            Err(err) => {
                let message = format!(
                    "Skipped compound starting at line {start_line}: {}",
                    err.message()
                );
                warn!("{message}");
                warnings.push(message);
                // the header may itself contain the delimiter of a truncated record
                t.position = start;
                t.line_number = start_line;
                skip_past_delimiter(&mut t);
            }
        }
        ctx.update(Progress::parsing(t.position, data.len()))?;
    }

    debug!(
        "Parsed {} SDF compound(s), {} skipped",
        compounds.len(),
        warnings.len()
    );
    Ok(Parsed::with_warnings(SdfFile { compounds }, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    const SDF: &str = "\
water
  prog

  1  0  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
M  END
> <NAME>
water

> <NOTES>
line one
line two

$$$$
broken
  prog

 xx yy
garbage
$$$$
methane
  prog

  1  0  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
M  END
$$$$
";

    #[test]
    fn test_compounds_and_data_items() {
        let parsed = parse_sdf(SDF).unwrap();
        let file = parsed.result;
        assert_eq!(file.compounds.len(), 2);

        let water = &file.compounds[0];
        assert_eq!(water.mol.title, "water");
        assert_eq!(water.mol.atoms.type_symbol.value(0), "O");
        let items = &water.data_items;
        assert_eq!(items.data_header.row_count(), 2);
        assert_eq!(items.data_header.value(0), "<NAME>");
        assert_eq!(items.data.value(0), "water");
        assert_eq!(items.data_header.value(1), "<NOTES>");
        assert_eq!(items.data.value(1), "line one\nline two");

        let methane = &file.compounds[1];
        assert_eq!(methane.mol.title, "methane");
        assert_eq!(methane.data_items.data.row_count(), 0);
    }

    #[test]
    fn test_malformed_compound_is_reported() {
        let parsed = parse_sdf(SDF).unwrap();
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("line 15"), "{}", parsed.warnings[0]);
    }

    #[test]
    fn test_truncated_header_keeps_next_compound() {
        let data = "\
broken
  prog
$$$$
methane
  prog

  1  0  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
M  END
$$$$
";
        let parsed = parse_sdf(data).unwrap();
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("line 1"), "{}", parsed.warnings[0]);
        let compounds = &parsed.result.compounds;
        assert_eq!(compounds.len(), 1);
        assert_eq!(compounds[0].mol.title, "methane");
        assert_eq!(compounds[0].mol.atoms.type_symbol.value(0), "C");
    }

    #[test]
    fn test_value_directly_before_delimiter() {
        let data = "a\nb\nc\n  0  0  0  0  0  0  0  0  0  0999 V2000\nM  END\n> <ID>\n42\n$$$$\n";
        let file = parse_sdf(data).unwrap().result;
        assert_eq!(file.compounds.len(), 1);
        assert_eq!(file.compounds[0].data_items.data.value(0), "42");
    }
}
