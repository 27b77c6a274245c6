#![no_main]

use std::collections::HashMap;

use arbitrary::Arbitrary;
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

use ironmetric_core::message::Message;
use ironmetric_processor::MessageProcessor;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 드롭 조건식
    condition: String,
    /// 평가 대상 메시지 구성 요소
    name: String,
    tag_key: String,
    tag_value: String,
    unit: String,
    value: f64,
    seconds: i32,
}

fuzz_target!(|input: FuzzInput| {
    let processor = MessageProcessor::new();

    // 컴파일이 실패해도 크래시는 안 됨
    if processor
        .add_drop_messages_by_condition(&input.condition)
        .is_err()
    {
        return;
    }

    // NaN은 자기 자신과 같지 않아 아래 비교가 성립하지 않음
    if input.value.is_nan() {
        return;
    }

    let Some(ts) = Utc.timestamp_opt(i64::from(input.seconds), 0).single() else {
        return;
    };
    let msg = Message::new_metric(
        input.name,
        HashMap::from([(input.tag_key, input.tag_value)]),
        HashMap::from([("unit".to_owned(), input.unit)]),
        input.value,
        ts,
    );

    // 평가는 Ok/Err 중 하나를 반환해야 하며 입력은 바뀌지 않아야 함
    let before = msg.clone();
    let _ = processor.process_message(&msg);
    assert_eq!(before, msg);
});
