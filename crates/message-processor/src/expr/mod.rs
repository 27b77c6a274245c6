//! 조건식 언어
//!
//! 규칙의 `if` 조건을 한 번 컴파일해 두고 메시지마다 평가합니다.
//!
//! # 구성
//! - [`lexer`]: 토크나이저
//! - [`parser`]: Pratt 파서와 구문 트리
//! - [`compile`]: 정적 타입 검사, 상수 인라인, 리터럴 정규식 사전 컴파일
//! - [`eval`]: 실행 트리 평가
//! - [`value`]: 런타임 값
//!
//! # 예시
//! ```
//! use ironmetric_processor::env::BaseEnv;
//! use ironmetric_processor::expr::Program;
//!
//! let env = BaseEnv::new();
//! let program = Program::compile("name == 'cpu_load' && tags.type == 'node'", &env).unwrap();
//! assert_eq!(program.source(), "name == 'cpu_load' && tags.type == 'node'");
//! ```

pub mod compile;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

pub use compile::{Binding, Bindings, Type, Var};
pub use eval::Scope;
pub use value::Value;

use crate::error::ExprError;

use compile::Node;

/// 모든 메시지에 대해 참인 조건
pub const MATCH_ALL: &str = "*";

/// 컴파일된 조건식
#[derive(Debug, Clone)]
pub struct Program {
    source: String,
    root: Node,
}

impl Program {
    /// 조건식을 컴파일합니다. `"*"`는 항상 참입니다.
    ///
    /// # Errors
    /// 구문 에러, 알 수 없는 이름, 타입 불일치, bool이 아닌 결과 타입이면 실패합니다.
    pub fn compile(source: &str, bindings: &dyn Bindings) -> Result<Self, ExprError> {
        let root = if source.trim() == MATCH_ALL {
            Node::Const(Value::Bool(true))
        } else {
            compile::lower(&parser::parse(source)?, bindings)?
        };
        Ok(Self {
            source: source.to_owned(),
            root,
        })
    }

    /// 원본 조건식
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 조건식을 평가합니다.
    pub fn run(&self, scope: &dyn Scope) -> Result<Value, ExprError> {
        eval::eval(&self.root, scope)
    }

    /// 조건식을 평가하고 결과가 bool인지 확인합니다.
    pub fn matches(&self, scope: &dyn Scope) -> Result<bool, ExprError> {
        match self.run(scope)? {
            Value::Bool(b) => Ok(b),
            other => Err(ExprError::Runtime(format!(
                "expected bool, but got {}",
                other.type_name()
            ))),
        }
    }
}
