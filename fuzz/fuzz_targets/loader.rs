#![no_main]

use libfuzzer_sys::fuzz_target;
use pescope::PeObject;

fuzz_target!(|data: &[u8]| {
    let _ = PeObject::from_mem(data.to_vec());
});
