//! Cross-format behavior: detection, gzip input, chunking and cancellation.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use molio::cif::parse_cif_text;
use molio::data::Column;
use molio::formats::{
    decompress, parse_csv_with, parse_gro, parse_gro_with, parse_pdb, parse_pdb_with, CsvOptions,
    Format,
};
use molio::result::ReaderError;
use molio::task::{CancellationToken, ParseOptions, RuntimeContext};

const PDB: &str = "\
HEADER    TEST
ATOM      1  N   ALA A   1      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  ALA A   1      11.639   6.071  -5.147  1.00  0.00           C
ATOM      3  C   ALA A   1      13.149   6.002  -5.245  1.00  0.00           C
END
";

const MMCIF: &str = "\
data_TEST
loop_
_atom_site.id
_atom_site.label_atom_id
_atom_site.Cartn_x
_atom_site.Cartn_y
_atom_site.Cartn_z
1 N  11.104 6.134 -6.504
2 CA 11.639 6.071 -5.147
3 C  13.149 6.002 -5.245
";

const GRO: &str = "\
two frames
    2
    1SOL     OW    1   0.126   1.624   1.679
    1SOL    HW1    2   0.190   1.661   1.747
   1.82060   1.82060   1.82060
two frames, t= 2.0
    2
    1SOL     OW    1   0.127   1.625   1.680
    1SOL    HW1    2   0.191   1.662   1.748
   1.82060   1.82060   1.82060
";

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn test_detect_and_read_gzipped_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.pdb.gz");
    std::fs::write(&path, gzip(PDB.as_bytes())).unwrap();

    assert_eq!(Format::from_path(&path), Some(Format::Pdb));
    let bytes = decompress(std::fs::read(&path).unwrap()).unwrap();
    let text = std::str::from_utf8(&bytes).unwrap();
    let file = parse_pdb(text).unwrap().result;
    assert_eq!(file.atom_site().row_count(), 3);
}

#[test]
fn test_pdb_and_mmcif_agree() {
    let pdb = parse_pdb(PDB).unwrap().result;
    let atoms = pdb.atom_site();
    let cif = parse_cif_text(MMCIF).unwrap().result;
    let atom_site = cif.blocks[0].category("atom_site").unwrap();

    assert_eq!(atoms.row_count(), atom_site.row_count);
    let names = atom_site.get_field("label_atom_id").unwrap();
    let xs = atom_site.get_field("Cartn_x").unwrap();
    let zs = atom_site.get_field("Cartn_z").unwrap();
    for row in 0..atoms.row_count() {
        assert_eq!(atoms.name.value(row), names.str(row));
        assert!((atoms.x.value(row) - xs.float(row)).abs() < 1e-9);
        assert!((atoms.z.value(row) - zs.float(row)).abs() < 1e-9);
    }
}

#[test]
fn test_chunk_size_is_transparent() {
    let options = ParseOptions::new().with_chunk_size(1);

    let whole = parse_pdb(PDB).unwrap().result;
    let chunked = parse_pdb_with(PDB, None, false, &mut RuntimeContext::new(), &options)
        .unwrap()
        .result;
    assert_eq!(whole.line_count(), chunked.line_count());
    assert_eq!(
        whole.atom_site().serial.to_array(&Default::default()),
        chunked.atom_site().serial.to_array(&Default::default())
    );

    let whole = parse_gro(GRO).unwrap().result;
    let chunked = parse_gro_with(GRO, &mut RuntimeContext::new(), &options)
        .unwrap()
        .result;
    assert_eq!(whole.structures.len(), 2);
    assert_eq!(chunked.structures.len(), 2);
    for (a, b) in whole.structures.iter().zip(&chunked.structures) {
        assert_eq!(a.header.title, b.header.title);
        assert_eq!(a.atoms.count, b.atoms.count);
        for row in 0..a.atoms.count {
            assert_eq!(a.atoms.x.value(row), b.atoms.x.value(row));
        }
    }
    assert_eq!(chunked.structures[1].header.time_in_ps, 2.0);

    let csv = "id,name\n1,a\n2,b\n3,c\n";
    let a = parse_csv_with(csv, CsvOptions::default(), &mut RuntimeContext::new(), &options)
        .unwrap()
        .result;
    assert_eq!(a.table.row_count, 3);
    assert_eq!(
        a.table.get_column("name").unwrap().to_str_vec(),
        vec!["a", "b", "c"]
    );
}

#[test]
fn test_cancellation_is_an_error_everywhere() {
    let cancelled = || {
        let token = CancellationToken::new();
        token.cancel();
        RuntimeContext::new().with_cancellation(token)
    };

    let err = parse_pdb_with(PDB, None, false, &mut cancelled(), &ParseOptions::default())
        .unwrap_err();
    assert!(matches!(err, ReaderError::Cancelled));

    let err = parse_csv_with(
        "a,b\n1,2\n",
        CsvOptions::default(),
        &mut cancelled(),
        &ParseOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ReaderError::Cancelled));
}
