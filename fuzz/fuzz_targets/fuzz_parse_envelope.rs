//! Arbitrary request bodies must never panic the envelope parser or the
//! canonical string builder.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ses_reputation_guard::{envelope, verification};

fuzz_target!(|data: &[u8]| {
    if let Ok(env) = envelope::parse(data) {
        let _ = verification::string_to_sign(&env);
        let _ = ses_reputation_guard::alarm::validate(&env.message);
    }
});
