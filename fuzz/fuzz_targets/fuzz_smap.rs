#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(alphabet) = sfxidx::alphabet::smap::parse("fuzz", data) {
        for raw in 0..=u8::MAX {
            let _ = alphabet.decode(alphabet.encode(raw));
        }
    }
});
