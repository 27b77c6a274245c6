//! 파이프라인 trait -- 메시지 처리 확장 포인트 정의
//!
//! 수신기(receiver)와 싱크(sink) 쪽 코드는 구체적인 처리기 타입 대신
//! [`MessageHandler`]를 통해 메시지를 넘기고, [`ProcessOutcome`]에 따라
//! 전달/폐기를 결정합니다.

use crate::message::Message;

/// 메시지 1건의 처리 결과
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// 처리 완료, 다음 단계로 전달
    Forward(Message),
    /// 규칙에 의해 의도적으로 폐기됨 (에러 아님)
    Drop,
    /// 처리 실패. 부분 처리된 메시지를 전달할지는 호출자가 결정
    Failed {
        /// 실패 시점까지 변경된 메시지
        partial: Message,
        /// 실패 사유
        reason: String,
    },
}

impl ProcessOutcome {
    /// 실패 여부
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// 전달 정책에 따라 내보낼 메시지를 반환합니다.
    ///
    /// `forward_on_error`가 참이면 실패한 메시지도 부분 처리된 상태로 내보냅니다.
    pub fn into_forwarded(self, forward_on_error: bool) -> Option<Message> {
        match self {
            Self::Forward(msg) => Some(msg),
            Self::Drop => None,
            Self::Failed { partial, .. } => forward_on_error.then_some(partial),
        }
    }
}

/// 메시지 처리 trait
///
/// 새로운 처리 단계를 파이프라인에 끼워 넣으려면 이 trait을 구현합니다.
pub trait MessageHandler: Send + Sync {
    /// 처리기 이름
    fn name(&self) -> &str;

    /// 메시지를 처리합니다. 입력 메시지는 변경하지 않습니다.
    fn handle(&self, message: &Message) -> ProcessOutcome;
}
