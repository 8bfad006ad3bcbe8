//! Certificate bodies come from the network; decoding must fail cleanly.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ses_reputation_guard::certificate::rsa_public_key;

fuzz_target!(|data: &[u8]| {
    let _ = rsa_public_key(data);
});
