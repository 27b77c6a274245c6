#![no_main]

use ironmetric_processor::MessageProcessor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 설정 파서는 &str을 받으므로 UTF-8 변환 필요
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let processor = MessageProcessor::new();
    if processor.from_config_json(raw).is_err() {
        // 실패한 적용은 기존 상태를 바꾸지 않아야 함
        assert_eq!(processor.rule_count(), 0);
    }
});
