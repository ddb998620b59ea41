#![no_main]

use libfuzzer_sys::fuzz_target;
use pescope::{Executable, ObjectFile};

fuzz_target!(|data: &[u8]| {
    let _ = Executable::from_mem(data.to_vec());
    let _ = ObjectFile::from_mem(data.to_vec());
});
