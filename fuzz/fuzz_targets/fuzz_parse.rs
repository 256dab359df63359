#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(doc) = std::str::from_utf8(data) {
        let rows = trimcsv::parse(doc);
        if doc.is_empty() {
            assert!(rows.is_empty());
        }
        for row in &rows {
            assert!(!row.is_empty());
        }
        assert_eq!(rows, trimcsv::parse(doc));
    }
});
