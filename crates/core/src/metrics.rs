//! 메트릭 상수 및 설명 등록
//!
//! 메시지 처리기가 기록하는 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 레코더가 설치되지 않은 경우 `metrics` 매크로 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `ironmetric_`
//! - 모듈명: `processor_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(ironmetric_core::metrics::PROCESSOR_MESSAGES_PROCESSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 스테이지 레이블 키 (drop_if, rename_if ...)
pub const LABEL_STAGE: &str = "stage";

/// 드롭 사유 레이블 키 (name, type, condition)
pub const LABEL_REASON: &str = "reason";

// ─── Message Processor 메트릭 ──────────────────────────────────────

/// Processor: 처리 완료된 메시지 수 (counter)
pub const PROCESSOR_MESSAGES_PROCESSED_TOTAL: &str =
    "ironmetric_processor_messages_processed_total";

/// Processor: 드롭된 메시지 수 (counter, label: reason)
pub const PROCESSOR_MESSAGES_DROPPED_TOTAL: &str = "ironmetric_processor_messages_dropped_total";

/// Processor: 조건 평가/처리 에러 수 (counter, label: stage)
pub const PROCESSOR_EVALUATION_ERRORS_TOTAL: &str =
    "ironmetric_processor_evaluation_errors_total";

/// Processor: 등록된 규칙 수 (gauge)
pub const PROCESSOR_RULES_LOADED: &str = "ironmetric_processor_rules_loaded";

/// Processor: 메시지 1건 처리 지연 시간 (histogram, 초)
pub const PROCESSOR_PROCESSING_DURATION_SECONDS: &str =
    "ironmetric_processor_processing_duration_seconds";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 메시지 처리 지연 시간 히스토그램 버킷 (초)
///
/// 1us ~ 10ms 범위
pub const PROCESSING_DURATION_BUCKETS: [f64; 8] =
    [0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.01];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        PROCESSOR_MESSAGES_PROCESSED_TOTAL,
        "Total number of messages that passed through the processor"
    );
    describe_counter!(
        PROCESSOR_MESSAGES_DROPPED_TOTAL,
        "Messages dropped by name, type or condition"
    );
    describe_counter!(
        PROCESSOR_EVALUATION_ERRORS_TOTAL,
        "Condition evaluation or protected-field errors per stage"
    );
    describe_gauge!(
        PROCESSOR_RULES_LOADED,
        "Number of rules currently configured in the processor"
    );
    describe_histogram!(
        PROCESSOR_PROCESSING_DURATION_SECONDS,
        "Per-message processing latency in seconds"
    );
}
