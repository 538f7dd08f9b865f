//! Fuzz the IR frame classifier with arbitrary timing trains.

#![no_main]

use libfuzzer_sys::fuzz_target;

use irbridge::command::MAX_RAW_SAMPLES;
use irbridge::drivers::ir::classify;

fuzz_target!(|data: &[u8]| {
    let timings: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let signal = classify(&timings);
    // Unclassified trains keep their timings, capped at the sample limit.
    if signal.protocol.is_none() {
        assert!(signal.raw.len() <= MAX_RAW_SAMPLES);
        assert!(signal.raw.len() <= timings.len());
    }
});
