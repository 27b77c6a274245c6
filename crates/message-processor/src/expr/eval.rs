//! 실행 트리 평가기

use std::cmp::Ordering;

use regex::Regex;

use crate::error::ExprError;

use super::compile::{Builtin, Node, Var};
use super::parser::{BinaryOp, UnaryOp};
use super::value::Value;

/// 평가 시점의 변수 공급자
///
/// 맵 변수(`tags`, `meta`, `fields`)는 전체를 복사하지 않도록
/// 키 단위 조회를 별도로 제공합니다.
pub trait Scope {
    /// 변수 전체 값
    fn var(&self, var: Var) -> Value;

    /// 맵 변수의 키 조회. 맵이 아닌 변수면 `None`, 키가 없으면 `Some(Value::Nil)`.
    fn member(&self, var: Var, key: &str) -> Option<Value>;

    /// 맵 변수의 키 존재 여부. 맵이 아닌 변수면 `None`.
    fn contains_key(&self, var: Var, key: &str) -> Option<bool>;
}

fn runtime(reason: impl Into<String>) -> ExprError {
    ExprError::Runtime(reason.into())
}

fn invalid(op: BinaryOp, lhs: &Value, rhs: &Value) -> ExprError {
    runtime(format!(
        "invalid operation: {} {} {}",
        lhs.type_name(),
        op.symbol(),
        rhs.type_name()
    ))
}

/// 실행 트리를 평가합니다.
pub fn eval(node: &Node, scope: &dyn Scope) -> Result<Value, ExprError> {
    match node {
        Node::Const(value) => Ok(value.clone()),
        Node::Var(var) => Ok(scope.var(*var)),
        Node::Array(items) => items
            .iter()
            .map(|item| eval(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Node::Member {
            object,
            key,
            optional,
        } => {
            if let Node::Var(var) = object.as_ref() {
                if let Some(value) = scope.member(*var, key) {
                    return Ok(value);
                }
            }
            let object = eval(object, scope)?;
            member(object, key, *optional)
        }
        Node::Index { object, index } => {
            let object = eval(object, scope)?;
            let index = eval(index, scope)?;
            index_of(object, &index)
        }
        Node::Call { func, arg } => call(*func, eval(arg, scope)?),
        Node::Unary { op, operand } => {
            let operand = eval(operand, scope)?;
            match (op, operand) {
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Neg, Value::Int(i)) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| runtime("integer overflow")),
                (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
                (UnaryOp::Not, other) => Err(runtime(format!(
                    "invalid operation: !{}",
                    other.type_name()
                ))),
                (UnaryOp::Neg, other) => Err(runtime(format!(
                    "invalid operation: -{}",
                    other.type_name()
                ))),
            }
        }
        Node::Binary { op, lhs, rhs } => binary(*op, lhs, rhs, scope),
        Node::Matches { subject, regex } => match eval(subject, scope)? {
            Value::String(s) => Ok(Value::Bool(regex.is_match(&s))),
            other => Err(runtime(format!(
                "invalid operation: {} matches string",
                other.type_name()
            ))),
        },
        Node::Ternary {
            cond,
            then,
            otherwise,
        } => match eval(cond, scope)? {
            Value::Bool(true) => eval(then, scope),
            Value::Bool(false) => eval(otherwise, scope),
            other => Err(runtime(format!(
                "non-bool value (type {}) used as condition",
                other.type_name()
            ))),
        },
    }
}

fn member(object: Value, key: &str, optional: bool) -> Result<Value, ExprError> {
    match object {
        Value::Map(mut entries) => Ok(entries.remove(key).unwrap_or(Value::Nil)),
        Value::Nil if optional => Ok(Value::Nil),
        other => Err(runtime(format!(
            "cannot fetch {key} from {}",
            other.type_name()
        ))),
    }
}

fn index_of(object: Value, index: &Value) -> Result<Value, ExprError> {
    match (object, index) {
        (Value::Map(mut entries), Value::String(key)) => {
            Ok(entries.remove(key).unwrap_or(Value::Nil))
        }
        (Value::Array(mut items), Value::Int(i)) => {
            let len = items.len() as i64;
            let pos = if *i < 0 { len + i } else { *i };
            if pos < 0 || pos >= len {
                return Err(runtime(format!(
                    "index out of range: {i} (array length is {len})"
                )));
            }
            Ok(items.swap_remove(pos as usize))
        }
        (object, index) => Err(runtime(format!(
            "cannot index {} with {}",
            object.type_name(),
            index.type_name()
        ))),
    }
}

fn expect_bool(op: BinaryOp, value: Value) -> Result<bool, ExprError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(runtime(format!(
            "invalid operation: {} on {}",
            op.symbol(),
            other.type_name()
        ))),
    }
}

fn binary(op: BinaryOp, lhs: &Node, rhs: &Node, scope: &dyn Scope) -> Result<Value, ExprError> {
    // 단락 평가
    match op {
        BinaryOp::And => {
            if !expect_bool(op, eval(lhs, scope)?)? {
                return Ok(Value::Bool(false));
            }
            return expect_bool(op, eval(rhs, scope)?).map(Value::Bool);
        }
        BinaryOp::Or => {
            if expect_bool(op, eval(lhs, scope)?)? {
                return Ok(Value::Bool(true));
            }
            return expect_bool(op, eval(rhs, scope)?).map(Value::Bool);
        }
        BinaryOp::Coalesce => {
            let left = eval(lhs, scope)?;
            return if left.is_nil() {
                eval(rhs, scope)
            } else {
                Ok(left)
            };
        }
        BinaryOp::In | BinaryOp::NotIn => {
            let found = contains(lhs, rhs, scope)?;
            return Ok(Value::Bool(found == (op == BinaryOp::In)));
        }
        _ => {}
    }

    let left = eval(lhs, scope)?;
    let right = eval(rhs, scope)?;

    match op {
        BinaryOp::Eq => Ok(Value::Bool(left.loose_eq(&right))),
        BinaryOp::Ne => Ok(Value::Bool(!left.loose_eq(&right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = left
                .compare(&right)
                .ok_or_else(|| invalid(op, &left, &right))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Matches => match (&left, &right) {
            (Value::String(s), Value::String(pattern)) => {
                let regex = Regex::new(pattern).map_err(|e| {
                    runtime(format!("invalid regular expression '{pattern}': {e}"))
                })?;
                Ok(Value::Bool(regex.is_match(s)))
            }
            _ => Err(invalid(op, &left, &right)),
        },
        BinaryOp::Contains | BinaryOp::StartsWith | BinaryOp::EndsWith => {
            match (&left, &right) {
                (Value::String(s), Value::String(needle)) => Ok(Value::Bool(match op {
                    BinaryOp::Contains => s.contains(needle.as_str()),
                    BinaryOp::StartsWith => s.starts_with(needle.as_str()),
                    _ => s.ends_with(needle.as_str()),
                })),
                _ => Err(invalid(op, &left, &right)),
            }
        }
        _ => arithmetic(op, left, right),
    }
}

fn contains(lhs: &Node, rhs: &Node, scope: &dyn Scope) -> Result<bool, ExprError> {
    let needle = eval(lhs, scope)?;

    if let (Node::Var(var), Value::String(key)) = (rhs, &needle) {
        if let Some(found) = scope.contains_key(*var, key) {
            return Ok(found);
        }
    }

    match eval(rhs, scope)? {
        Value::Map(entries) => Ok(match &needle {
            Value::String(key) => entries.contains_key(key),
            _ => false,
        }),
        Value::Array(items) => Ok(items.iter().any(|item| item.loose_eq(&needle))),
        Value::Nil => Ok(false),
        other => Err(invalid(BinaryOp::In, &needle, &other)),
    }
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExprError> {
    let overflow = || runtime("integer overflow");

    match (&left, &right) {
        (Value::String(a), Value::String(b)) if op == BinaryOp::Add => {
            Ok(Value::String(format!("{a}{b}")))
        }
        (Value::Int(a), Value::Int(b)) => match op {
            BinaryOp::Add => a.checked_add(*b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Sub => a.checked_sub(*b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Mul => a.checked_mul(*b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Div => Ok(Value::Float(*a as f64 / *b as f64)),
            BinaryOp::Mod => {
                if *b == 0 {
                    return Err(runtime("integer divide by zero"));
                }
                a.checked_rem(*b).map(Value::Int).ok_or_else(overflow)
            }
            _ => Err(invalid(op, &left, &right)),
        },
        _ => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(invalid(op, &left, &right));
            };
            match op {
                BinaryOp::Add => Ok(Value::Float(a + b)),
                BinaryOp::Sub => Ok(Value::Float(a - b)),
                BinaryOp::Mul => Ok(Value::Float(a * b)),
                BinaryOp::Div => Ok(Value::Float(a / b)),
                _ => Err(invalid(op, &left, &right)),
            }
        }
    }
}

fn call(func: Builtin, arg: Value) -> Result<Value, ExprError> {
    let bad_arg = |arg: &Value| {
        runtime(format!(
            "invalid argument for {} (type {})",
            func.name(),
            arg.type_name()
        ))
    };

    match (func, arg) {
        (Builtin::Len, Value::String(s)) => Ok(Value::Int(s.chars().count() as i64)),
        (Builtin::Len, Value::Array(items)) => Ok(Value::Int(items.len() as i64)),
        (Builtin::Len, Value::Map(entries)) => Ok(Value::Int(entries.len() as i64)),
        (Builtin::Lower, Value::String(s)) => Ok(Value::String(s.to_lowercase())),
        (Builtin::Upper, Value::String(s)) => Ok(Value::String(s.to_uppercase())),
        (Builtin::Trim, Value::String(s)) => Ok(Value::String(s.trim().to_owned())),
        (Builtin::Int, Value::Int(i)) => Ok(Value::Int(i)),
        (Builtin::Int, Value::Float(f)) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
        (Builtin::Int, Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .map(Value::Int)
                .ok_or_else(|| runtime(format!("cannot convert '{s}' to int")))
        }
        (Builtin::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (Builtin::Float, Value::Float(f)) => Ok(Value::Float(f)),
        (Builtin::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| runtime(format!("cannot convert '{s}' to float"))),
        (Builtin::String, value) => Ok(Value::String(value.to_string())),
        (Builtin::Abs, Value::Int(i)) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| runtime("integer overflow")),
        (Builtin::Abs, Value::Float(f)) => Ok(Value::Float(f.abs())),
        (_, other) => Err(bad_arg(&other)),
    }
}
