//! Fuzz the definition codec: arbitrary payload bytes must never panic,
//! and anything that decodes must re-encode and decode to the same payload.

#![no_main]

use libfuzzer_sys::fuzz_target;

use irbridge::codec;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(payload) = codec::decode(text) {
        let json = codec::encode(&payload).expect("decoded payload must encode");
        let again = codec::decode(&json).expect("canonical JSON must decode");
        assert_eq!(again, payload);
    }
});
