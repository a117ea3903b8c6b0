#![no_main]

use libfuzzer_sys::fuzz_target;
use phasetune::output::timeline::{average_by_state, parse_timeline};

fuzz_target!(|data: &[u8]| {
    let events = parse_timeline(data, "J0");
    if let Some(averages) = average_by_state(&events) {
        assert!(averages.values().all(|avg| *avg >= 0.0 || avg.is_nan()));
    }
});
