#![no_main]

use libfuzzer_sys::fuzz_target;
use phasetune::optimizer::repair_rounding;

fuzz_target!(|input: (Vec<f64>, u8, u8, u16)| {
    let (raw, min, span, total) = input;
    if raw.len() > 32 {
        return;
    }
    let (min, max, total) = (u32::from(min), u32::from(min) + u32::from(span), u32::from(total));
    if let Ok(out) = repair_rounding(&raw, min, max, total) {
        assert_eq!(out.len(), raw.len());
        assert_eq!(out.iter().sum::<u32>(), total);
        assert!(out.iter().all(|d| (min..=max).contains(d)));
    }
});
