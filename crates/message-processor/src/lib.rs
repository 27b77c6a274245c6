#![doc = include_str!("../README.md")]

pub mod actions;
pub mod config;
pub mod env;
pub mod error;
pub mod expr;
pub mod loader;
pub mod processor;
pub mod rule;
pub mod stage;

// --- 주요 타입 re-export ---

// 처리기
pub use processor::MessageProcessor;

// 설정
pub use config::{ConditionalKeyValue, ProcessorConfig};
pub use loader::{ConfigLoader, RuleFormat};

// 에러
pub use error::{ExprError, ProcessError, ProcessErrorKind, ProcessorError};

// 스테이지와 조건식
pub use env::BaseEnv;
pub use expr::Program;
pub use stage::Stage;
