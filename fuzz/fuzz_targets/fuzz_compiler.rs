#![no_main]

use libfuzzer_sys::fuzz_target;
use stackjs::Interpreter;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    if source.len() > 100_000 {
        return;
    }

    // Compile only: running arbitrary input could loop forever
    let mut interp = Interpreter::new();
    let _ = interp.compile("fuzz.js", source);
});
