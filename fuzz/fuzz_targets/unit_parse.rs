#![no_main]

use ironmetric_core::units::{Unit, get_unit_prefix_factor};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    // "입력 단위|출력 단위" 형식이면 변환까지 시도
    let (input, output) = raw.split_once('|').unwrap_or((raw, raw));
    let input = Unit::parse(input);
    let output = Unit::parse(output);
    let _ = input.short();

    if let Ok(conversion) = get_unit_prefix_factor(&input, &output) {
        let _ = conversion.apply(1.0);
    }
});
