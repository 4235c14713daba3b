#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Parsing may fail but must never panic, and neither may field access
    if let Ok(parsed) = molio::cif::parse_cif_text(text) {
        for block in &parsed.result.blocks {
            for category in block.categories.iter() {
                for (_, field) in category.fields() {
                    for row in 0..field.row_count().min(100) {
                        let _ = field.str(row);
                        let _ = field.float(row);
                        let _ = field.value_kind(row);
                    }
                }
            }
        }
    }
});
