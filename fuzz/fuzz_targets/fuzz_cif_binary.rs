#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary MessagePack must decode or fail with an error
    if let Ok(parsed) = molio::cif::parse_cif_binary(data) {
        for block in &parsed.result.blocks {
            for category in block.categories.iter() {
                for (_, field) in category.fields() {
                    for row in 0..field.row_count().min(100) {
                        let _ = field.str(row);
                        let _ = field.int(row);
                    }
                }
            }
        }
    }
});
