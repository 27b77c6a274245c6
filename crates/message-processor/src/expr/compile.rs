//! 정적 타입 검사와 실행 트리로의 변환
//!
//! 구문 트리를 한 번 훑으면서
//! - 알 수 없는 최상위 이름, 알 수 없는 함수를 거부하고
//! - 타입이 확정된 피연산자끼리의 연산 오류를 잡고
//! - 상수 환경 값을 인라인하고 리터럴 정규식을 미리 컴파일합니다.
//!
//! 맵에서 꺼낸 값은 모두 [`Type::Any`]이며, 이 경우 검사는 평가 시점으로 미뤄집니다.

use std::fmt;

use regex::Regex;

use crate::error::ExprError;

use super::parser::{BinaryOp, Expr, UnaryOp};
use super::value::Value;

/// 정적 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Any,
    Nil,
    Bool,
    Int,
    Float,
    String,
    Array,
    Map,
}

impl Type {
    fn of(value: &Value) -> Self {
        match value {
            Value::Nil => Self::Nil,
            Value::Bool(_) => Self::Bool,
            Value::Int(_) => Self::Int,
            Value::Float(_) => Self::Float,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Map(_) => Self::Map,
        }
    }

    fn accepts(self, want: Type) -> bool {
        self == Self::Any || self == want
    }

    fn is_numeric(self) -> bool {
        matches!(self, Self::Any | Self::Int | Self::Float)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Any => "interface {}",
            Self::Nil => "nil",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float64",
            Self::String => "string",
            Self::Array => "array",
            Self::Map => "map",
        };
        f.write_str(name)
    }
}

/// 메시지 스냅샷에서 값을 읽어 오는 변수
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Var {
    /// 메시지 이름
    Name,
    /// `metric`, `event`, `control`, `log`, `unknown`
    MessageType,
    /// 유닉스 초
    Timestamp,
    /// 예약 필드 바로가기 (`value`, `event` ...)
    Field(&'static str),
    Fields,
    Tags,
    Meta,
    /// 메시지 전체 (`message.name`, `message.tags` ...)
    Message,
}

impl Var {
    fn static_type(self) -> Type {
        match self {
            Self::Name | Self::MessageType => Type::String,
            Self::Timestamp => Type::Int,
            Self::Field(_) => Type::Any,
            Self::Fields | Self::Tags | Self::Meta | Self::Message => Type::Map,
        }
    }
}

/// 이름이 가리키는 대상
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// 메시지마다 달라지는 값
    Var(Var),
    /// 컴파일 시점에 고정되는 상수
    Const(Value),
}

/// 컴파일 시점의 이름 해석기
pub trait Bindings {
    /// 최상위 이름을 해석합니다. 알 수 없는 이름이면 `None`.
    fn resolve(&self, name: &str) -> Option<Binding>;
}

/// 내장 함수
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Lower,
    Upper,
    Trim,
    Int,
    Float,
    String,
    Abs,
}

impl Builtin {
    fn from_name(name: &str) -> Option<Self> {
        let builtin = match name {
            "len" => Self::Len,
            "lower" => Self::Lower,
            "upper" => Self::Upper,
            "trim" => Self::Trim,
            "int" => Self::Int,
            "float" => Self::Float,
            "string" => Self::String,
            "abs" => Self::Abs,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Len => "len",
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::Trim => "trim",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Abs => "abs",
        }
    }

    fn result_type(self, arg: Type) -> Result<Type, ExprError> {
        let ok = match self {
            Self::Len => matches!(arg, Type::Any | Type::String | Type::Array | Type::Map),
            Self::Lower | Self::Upper | Self::Trim => arg.accepts(Type::String),
            Self::Int | Self::Float => arg.is_numeric() || arg == Type::String,
            Self::String => true,
            Self::Abs => arg.is_numeric(),
        };
        if !ok {
            return Err(ExprError::Type(format!(
                "invalid argument for {} (type {arg})",
                self.name()
            )));
        }
        Ok(match self {
            Self::Len | Self::Int => Type::Int,
            Self::Float => Type::Float,
            Self::Lower | Self::Upper | Self::Trim | Self::String => Type::String,
            Self::Abs => arg,
        })
    }
}

/// 평가 가능한 실행 트리
#[derive(Debug, Clone)]
pub enum Node {
    Const(Value),
    Var(Var),
    Array(Vec<Node>),
    Member {
        object: Box<Node>,
        key: String,
        optional: bool,
    },
    Index {
        object: Box<Node>,
        index: Box<Node>,
    },
    Call {
        func: Builtin,
        arg: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    /// 리터럴 패턴을 미리 컴파일한 `matches`
    Matches {
        subject: Box<Node>,
        regex: Regex,
    },
    Ternary {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
}

/// 구문 트리를 검사하고 실행 트리로 변환합니다. 루트는 bool이어야 합니다.
pub fn lower(expr: &Expr, bindings: &dyn Bindings) -> Result<Node, ExprError> {
    let (node, ty) = Lowering { bindings }.lower(expr)?;
    if !ty.accepts(Type::Bool) {
        return Err(ExprError::Type(format!("expected bool, but got {ty}")));
    }
    Ok(node)
}

struct Lowering<'a> {
    bindings: &'a dyn Bindings,
}

fn mismatch(op: BinaryOp, lhs: Type, rhs: Type) -> ExprError {
    ExprError::Type(format!(
        "invalid operation: {lhs} {} {rhs}",
        op.symbol()
    ))
}

impl Lowering<'_> {
    fn lower(&self, expr: &Expr) -> Result<(Node, Type), ExprError> {
        match expr {
            Expr::Nil => Ok((Node::Const(Value::Nil), Type::Nil)),
            Expr::Bool(b) => Ok((Node::Const(Value::Bool(*b)), Type::Bool)),
            Expr::Int(i) => Ok((Node::Const(Value::Int(*i)), Type::Int)),
            Expr::Float(f) => Ok((Node::Const(Value::Float(*f)), Type::Float)),
            Expr::Str(s) => Ok((Node::Const(Value::String(s.clone())), Type::String)),
            Expr::Array(items) => {
                let nodes = items
                    .iter()
                    .map(|item| self.lower(item).map(|(node, _)| node))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((Node::Array(nodes), Type::Array))
            }
            Expr::Ident(name) => match self.bindings.resolve(name) {
                Some(Binding::Var(var)) => Ok((Node::Var(var), var.static_type())),
                Some(Binding::Const(value)) => {
                    let ty = Type::of(&value);
                    Ok((Node::Const(value), ty))
                }
                None => Err(ExprError::Type(format!("unknown name {name}"))),
            },
            Expr::Member {
                object,
                key,
                optional,
            } => {
                let (object, ty) = self.lower(object)?;
                self.member(object, ty, key, *optional)
            }
            Expr::Index { object, index } => {
                let (object, object_ty) = self.lower(object)?;
                let (index, index_ty) = self.lower(index)?;
                if let Node::Const(Value::String(key)) = &index {
                    if matches!(object_ty, Type::Map | Type::Any | Type::Nil) {
                        return self.member(object, object_ty, key, false);
                    }
                }
                let ty = match object_ty {
                    Type::Array if index_ty.accepts(Type::Int) => Type::Any,
                    Type::Map if index_ty.accepts(Type::String) => Type::Any,
                    Type::Any => Type::Any,
                    _ => {
                        return Err(ExprError::Type(format!(
                            "cannot index {object_ty} with {index_ty}"
                        )));
                    }
                };
                Ok((
                    Node::Index {
                        object: Box::new(object),
                        index: Box::new(index),
                    },
                    ty,
                ))
            }
            Expr::Call { func, args } => {
                let builtin = Builtin::from_name(func)
                    .ok_or_else(|| ExprError::Type(format!("unknown function {func}")))?;
                let [arg] = args.as_slice() else {
                    return Err(ExprError::Type(format!(
                        "{func} expects 1 argument, got {}",
                        args.len()
                    )));
                };
                let (arg, arg_ty) = self.lower(arg)?;
                let ty = builtin.result_type(arg_ty)?;
                Ok((
                    Node::Call {
                        func: builtin,
                        arg: Box::new(arg),
                    },
                    ty,
                ))
            }
            Expr::Unary { op, operand } => {
                let (operand, ty) = self.lower(operand)?;
                let result = match op {
                    UnaryOp::Not if ty.accepts(Type::Bool) => Type::Bool,
                    UnaryOp::Neg if ty.is_numeric() => ty,
                    UnaryOp::Not => {
                        return Err(ExprError::Type(format!("invalid operation: !{ty}")));
                    }
                    UnaryOp::Neg => {
                        return Err(ExprError::Type(format!("invalid operation: -{ty}")));
                    }
                };
                Ok((
                    Node::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    result,
                ))
            }
            Expr::Binary { op, lhs, rhs } => {
                let (lhs, lt) = self.lower(lhs)?;
                let (rhs, rt) = self.lower(rhs)?;
                self.binary(*op, lhs, lt, rhs, rt)
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                let (cond, ct) = self.lower(cond)?;
                if !ct.accepts(Type::Bool) {
                    return Err(ExprError::Type(format!(
                        "non-bool expression (type {ct}) used as condition"
                    )));
                }
                let (then, tt) = self.lower(then)?;
                let (otherwise, ot) = self.lower(otherwise)?;
                let ty = if tt == ot { tt } else { Type::Any };
                Ok((
                    Node::Ternary {
                        cond: Box::new(cond),
                        then: Box::new(then),
                        otherwise: Box::new(otherwise),
                    },
                    ty,
                ))
            }
        }
    }

    fn member(
        &self,
        object: Node,
        ty: Type,
        key: &str,
        optional: bool,
    ) -> Result<(Node, Type), ExprError> {
        // 상수 맵은 컴파일 시점에 풀어 둔다
        if let Node::Const(Value::Map(entries)) = &object {
            let value = entries.get(key).cloned().unwrap_or(Value::Nil);
            let ty = Type::of(&value);
            return Ok((Node::Const(value), ty));
        }

        let result = match (ty, &object) {
            (Type::Map, Node::Var(Var::Message)) => match key {
                "name" | "type" | "messagetype" => Type::String,
                "timestamp" | "time" => Type::Int,
                "tags" | "tag" | "meta" | "fields" | "field" => Type::Map,
                _ => Type::Any,
            },
            (Type::Map | Type::Any, _) => Type::Any,
            (Type::Nil, _) if optional => Type::Nil,
            (Type::Nil, _) => {
                return Err(ExprError::Type(format!("cannot fetch {key} from nil")));
            }
            (other, _) => {
                return Err(ExprError::Type(format!(
                    "type {other} has no field {key}"
                )));
            }
        };

        Ok((
            Node::Member {
                object: Box::new(object),
                key: key.to_owned(),
                optional,
            },
            result,
        ))
    }

    fn binary(
        &self,
        op: BinaryOp,
        lhs: Node,
        lt: Type,
        rhs: Node,
        rt: Type,
    ) -> Result<(Node, Type), ExprError> {
        let any = lt == Type::Any || rt == Type::Any;
        let both_int = lt == Type::Int && rt == Type::Int;

        let ty = match op {
            BinaryOp::Or | BinaryOp::And => {
                if !lt.accepts(Type::Bool) || !rt.accepts(Type::Bool) {
                    return Err(mismatch(op, lt, rt));
                }
                Type::Bool
            }
            BinaryOp::Eq | BinaryOp::Ne => Type::Bool,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let comparable = any
                    || (lt.is_numeric() && rt.is_numeric())
                    || (lt == Type::String && rt == Type::String);
                if !comparable {
                    return Err(mismatch(op, lt, rt));
                }
                Type::Bool
            }
            BinaryOp::In | BinaryOp::NotIn => {
                if !matches!(rt, Type::Any | Type::Array | Type::Map | Type::Nil) {
                    return Err(mismatch(op, lt, rt));
                }
                Type::Bool
            }
            BinaryOp::Matches => {
                if !lt.accepts(Type::String) || !rt.accepts(Type::String) {
                    return Err(mismatch(op, lt, rt));
                }
                if let Node::Const(Value::String(pattern)) = &rhs {
                    let regex = Regex::new(pattern).map_err(|e| {
                        ExprError::Type(format!("invalid regular expression '{pattern}': {e}"))
                    })?;
                    return Ok((
                        Node::Matches {
                            subject: Box::new(lhs),
                            regex,
                        },
                        Type::Bool,
                    ));
                }
                Type::Bool
            }
            BinaryOp::Contains | BinaryOp::StartsWith | BinaryOp::EndsWith => {
                if !lt.accepts(Type::String) || !rt.accepts(Type::String) {
                    return Err(mismatch(op, lt, rt));
                }
                Type::Bool
            }
            BinaryOp::Add => match (lt, rt) {
                (Type::String, Type::String) => Type::String,
                _ if both_int => Type::Int,
                (Type::Any, t) | (t, Type::Any)
                    if matches!(t, Type::Any | Type::Int | Type::Float | Type::String) =>
                {
                    Type::Any
                }
                _ if lt.is_numeric() && rt.is_numeric() => Type::Float,
                _ => return Err(mismatch(op, lt, rt)),
            },
            BinaryOp::Sub | BinaryOp::Mul => {
                if !lt.is_numeric() || !rt.is_numeric() {
                    return Err(mismatch(op, lt, rt));
                }
                if both_int {
                    Type::Int
                } else if any {
                    Type::Any
                } else {
                    Type::Float
                }
            }
            BinaryOp::Div => {
                if !lt.is_numeric() || !rt.is_numeric() {
                    return Err(mismatch(op, lt, rt));
                }
                Type::Float
            }
            BinaryOp::Mod => {
                if !lt.accepts(Type::Int) || !rt.accepts(Type::Int) {
                    return Err(mismatch(op, lt, rt));
                }
                Type::Int
            }
            BinaryOp::Coalesce => {
                if lt == Type::Nil {
                    rt
                } else if lt == rt {
                    lt
                } else {
                    Type::Any
                }
            }
        };

        Ok((
            Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        ))
    }
}
