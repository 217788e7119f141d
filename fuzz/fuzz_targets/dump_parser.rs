#![no_main]

use libfuzzer_sys::fuzz_target;
use pufstat::dump::parse_dump;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must reject or accept, never panic
        if let Ok(records) = parse_dump(input) {
            let bits = pufstat::bitstream::decode(&records);
            assert_eq!(bits.len(), records.len() * 8);
        }
    }
});
