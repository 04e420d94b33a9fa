#![no_main]
use libfuzzer_sys::fuzz_target;

use normtx_codec::{decode, encode};

fuzz_target!(|data: &[u8]| {
    let hex_tx = hex::encode(data);

    // Arbitrary bytes either fail to decode (truncated, trailing garbage,
    // non-minimal varints) or decode to a transaction whose re-encoding
    // reproduces the input exactly. A silent partial decode or a lossy
    // round-trip is a bug either way.
    if let Ok(tx) = decode(&hex_tx) {
        assert_eq!(encode(&tx), hex_tx, "round-trip must be exact");
    }
});
