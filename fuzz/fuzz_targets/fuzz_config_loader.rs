#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use phasetune::config::loader::ConfigLoader;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        // Any outcome is fine as long as loading does not panic.
        let _ = ConfigLoader::with_defaults().load_str(yaml, Path::new("<fuzz>"));
    }
});
