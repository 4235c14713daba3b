#![no_main]

use libfuzzer_sys::fuzz_target;
use molio::formats;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        let _ = formats::parse_dcd(data);
        let _ = formats::parse_trr(data);
        return;
    };

    if let Ok(pdb) = formats::parse_pdb(text) {
        let atoms = pdb.result.atom_site();
        for row in 0..atoms.row_count().min(100) {
            let _ = molio::data::Column::value(&atoms.x, row);
        }
    }
    let _ = formats::parse_mol(text);
    let _ = formats::parse_sdf(text);
    let _ = formats::parse_mol2(text);
    let _ = formats::parse_psf(text);
    let _ = formats::parse_prmtop(text);
    let _ = formats::parse_top(text);
    let _ = formats::parse_gro(text);
    let _ = formats::parse_xyz(text);
    let _ = formats::parse_csv(text);
    let _ = formats::parse_ply(text);
});
