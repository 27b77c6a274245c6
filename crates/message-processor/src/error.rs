//! 메시지 처리기 에러 타입
//!
//! - [`ProcessorError`]: 규칙 등록/설정 적용 시점의 에러
//! - [`ProcessError`]: 메시지 처리 도중 발생한 에러 (부분 처리된 메시지 포함)
//! - [`ExprError`]: 조건식 컴파일/평가 에러
//!
//! `From<ProcessorError> for IronmetricError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use std::fmt;

use ironmetric_core::error::IronmetricError;
use ironmetric_core::message::Message;

use crate::stage::Stage;

/// 규칙 등록 및 설정 적용 에러
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// 알 수 없는 스테이지 이름
    #[error("invalid stage {name} at index {index}")]
    InvalidStage {
        /// 스테이지 목록 내 위치
        index: usize,
        /// 입력된 이름
        name: String,
    },

    /// 조건식 컴파일 실패
    #[error("failed to create condition evaluable of '{condition}': {reason}")]
    Compile {
        /// 원본 조건식
        condition: String,
        /// 실패 사유
        reason: String,
    },

    /// 드롭 대상으로 지정할 수 없는 메시지 종류
    #[error("invalid message type '{0}'")]
    InvalidMessageType(String),

    /// 알 수 없는 단위 접두어
    #[error("invalid unit prefix '{0}'")]
    InvalidPrefix(String),

    /// 설정 문서의 특정 옵션 해석 실패
    #[error("failed to parse option '{option}': {reason}")]
    ConfigParse {
        /// 실패한 옵션 이름 (`drop_messages_if` 등)
        option: String,
        /// 실패 사유
        reason: String,
    },

    /// 규칙 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    Load {
        /// 규칙 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessorError {
    /// 옵션 이름을 붙여 설정 해석 에러로 감쌉니다.
    pub(crate) fn in_option(self, option: &str) -> Self {
        match self {
            Self::ConfigParse { .. } | Self::Load { .. } | Self::Io(_) => self,
            other => Self::ConfigParse {
                option: option.to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<ProcessorError> for IronmetricError {
    fn from(err: ProcessorError) -> Self {
        IronmetricError::Processor(err.to_string())
    }
}

/// 조건식 컴파일/평가 에러
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    /// 구문 에러
    #[error("syntax error at offset {offset}: {reason}")]
    Syntax { offset: usize, reason: String },

    /// 타입 검사 에러
    #[error("type error: {0}")]
    Type(String),

    /// 평가 중 런타임 에러
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// 메시지 처리 실패 종류
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessErrorKind {
    /// 조건식 평가 실패
    Evaluation(String),
    /// 예약 필드 삭제/이동 시도
    ProtectedField(String),
}

impl fmt::Display for ProcessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evaluation(reason) => write!(f, "failed to evaluate: {reason}"),
            Self::ProtectedField(key) => write!(f, "cannot delete protected fields: '{key}'"),
        }
    }
}

/// 메시지 처리 에러
///
/// 실패한 스테이지 직전까지 변경된 메시지를 함께 담습니다.
/// 입력 메시지는 처리기가 변경하지 않으므로 호출자는 원본과 부분 결과 중
/// 무엇을 내보낼지 직접 선택할 수 있습니다.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("stage '{stage}': {kind}")]
pub struct ProcessError {
    /// 실패한 스테이지
    pub stage: Stage,
    /// 실패 종류
    pub kind: ProcessErrorKind,
    partial: Box<Message>,
}

impl ProcessError {
    pub(crate) fn new(stage: Stage, kind: ProcessErrorKind, partial: Message) -> Self {
        Self {
            stage,
            kind,
            partial: Box::new(partial),
        }
    }

    /// 부분 처리된 메시지 참조
    pub fn partial(&self) -> &Message {
        &self.partial
    }

    /// 부분 처리된 메시지를 꺼냅니다.
    pub fn into_partial(self) -> Message {
        *self.partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_stage_display() {
        let err = ProcessorError::InvalidStage {
            index: 2,
            name: "explode".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid stage explode at index 2");
    }

    #[test]
    fn compile_error_display_contains_condition() {
        let err = ProcessorError::Compile {
            condition: "name ==".to_owned(),
            reason: "unexpected end of input".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("failed to create condition evaluable of 'name =='"));
        assert!(msg.contains("unexpected end of input"));
    }

    #[test]
    fn in_option_wraps_compile_errors() {
        let err = ProcessorError::InvalidPrefix("X".to_owned()).in_option("change_unit_prefix");
        match err {
            ProcessorError::ConfigParse { option, reason } => {
                assert_eq!(option, "change_unit_prefix");
                assert!(reason.contains("'X'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn in_option_keeps_existing_config_parse() {
        let err = ProcessorError::ConfigParse {
            option: "drop_messages".to_owned(),
            reason: "expected a list".to_owned(),
        }
        .in_option("other");
        assert!(matches!(err, ProcessorError::ConfigParse { option, .. } if option == "drop_messages"));
    }

    #[test]
    fn converts_to_ironmetric_error() {
        let err = ProcessorError::InvalidMessageType("unknown".to_owned());
        let top: IronmetricError = err.into();
        assert!(matches!(top, IronmetricError::Processor(_)));
        assert!(top.to_string().contains("unknown"));
    }

    #[test]
    fn process_error_keeps_partial_message() {
        let msg = Message::new_metric(
            "cpu",
            Default::default(),
            Default::default(),
            1.0,
            chrono::Utc::now(),
        );
        let err = ProcessError::new(
            Stage::DeleteField,
            ProcessErrorKind::ProtectedField("value".to_owned()),
            msg.clone(),
        );
        assert!(err.to_string().contains("delete_field"));
        assert!(err.to_string().contains("cannot delete protected fields"));
        assert_eq!(err.partial(), &msg);
        assert_eq!(err.into_partial(), msg);
    }

    #[test]
    fn expr_error_display() {
        let err = ExprError::Syntax {
            offset: 5,
            reason: "unexpected token".to_owned(),
        };
        assert_eq!(err.to_string(), "syntax error at offset 5: unexpected token");
        assert!(ExprError::Runtime("x".to_owned()).to_string().starts_with("runtime error"));
    }
}
