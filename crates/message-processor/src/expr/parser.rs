//! 조건식 구문 트리와 Pratt 파서
//!
//! 우선순위 (낮은 것부터):
//!
//! | 단계 | 연산자 |
//! |------|--------|
//! | 0 | `?:` (삼항, 우결합) |
//! | 1 | `??` (우결합) |
//! | 2 | `\|\|`, `or` |
//! | 3 | `&&`, `and` |
//! | 4 | `== != < <= > >= in not in matches contains startsWith endsWith` |
//! | 5 | `+ -` |
//! | 6 | `* / %` |
//! | 7 | 단항 `! not -` |
//! | 8 | 후위 `. ?. [] ()` |

use crate::error::ExprError;

use super::lexer::{Spanned, Token, tokenize};

/// 단항 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// 이항 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Coalesce,
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Matches,
    Contains,
    StartsWith,
    EndsWith,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    fn precedence(self) -> u8 {
        match self {
            Self::Coalesce => 1,
            Self::Or => 2,
            Self::And => 3,
            Self::Eq
            | Self::Ne
            | Self::Lt
            | Self::Le
            | Self::Gt
            | Self::Ge
            | Self::In
            | Self::NotIn
            | Self::Matches
            | Self::Contains
            | Self::StartsWith
            | Self::EndsWith => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Mod => 6,
        }
    }

    fn right_assoc(self) -> bool {
        self == Self::Coalesce
    }

    /// 소스 표기
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Coalesce => "??",
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Matches => "matches",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }
}

/// 구문 트리
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Expr>),
    Ident(String),
    Member {
        object: Box<Expr>,
        key: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        func: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// 중첩 깊이 상한. 악의적인 입력으로 스택이 넘치지 않도록 제한합니다.
const MAX_DEPTH: usize = 128;

/// 조건식 문자열을 구문 트리로 파싱합니다.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected token {other:?} after expression"))),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        self.tokens
            .get(self.pos + n)
            .or_else(|| self.tokens.last())
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.offset)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, reason: impl Into<String>) -> ExprError {
        ExprError::Syntax {
            offset: self.offset(),
            reason: reason.into(),
        }
    }

    fn expect(&mut self, want: &Token, what: &str) -> Result<(), ExprError> {
        if self.peek() == want {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {what}, found {:?}", self.peek())))
        }
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        self.enter()?;
        let result = self.ternary();
        self.leave();
        result
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let cond = self.binary(1)?;
        if self.peek() != &Token::Question {
            return Ok(cond);
        }
        self.advance();
        let then = self.expression()?;
        self.expect(&Token::Colon, "':' in ternary expression")?;
        let otherwise = self.expression()?;
        Ok(Expr::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// 현재 위치의 이항 연산자와 차지하는 토큰 수
    fn peek_binary(&self) -> Option<(BinaryOp, usize)> {
        let op = match self.peek() {
            Token::DoubleQuestion => BinaryOp::Coalesce,
            Token::OrOr => BinaryOp::Or,
            Token::AndAnd => BinaryOp::And,
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::Ne,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Percent => BinaryOp::Mod,
            Token::Ident(word) => match word.as_str() {
                "or" => BinaryOp::Or,
                "and" => BinaryOp::And,
                "in" => BinaryOp::In,
                "matches" => BinaryOp::Matches,
                "contains" => BinaryOp::Contains,
                "startsWith" => BinaryOp::StartsWith,
                "endsWith" => BinaryOp::EndsWith,
                "not" if matches!(self.peek_nth(1), Token::Ident(next) if next == "in") => {
                    return Some((BinaryOp::NotIn, 2));
                }
                _ => return None,
            },
            _ => return None,
        };
        Some((op, 1))
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        // 왼쪽으로 쌓이는 트리도 깊이에 포함한다
        let mut chained = 0;
        while let Some((op, width)) = self.peek_binary() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            for _ in 0..width {
                self.advance();
            }
            let next_min = if op.right_assoc() { prec } else { prec + 1 };
            self.enter()?;
            chained += 1;
            let rhs = self.binary(next_min)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth -= chained;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Token::Bang => Some(UnaryOp::Not),
            Token::Ident(word) if word == "not" => Some(UnaryOp::Not),
            Token::Minus => Some(UnaryOp::Neg),
            Token::Plus => None,
            _ => {
                let primary = self.primary()?;
                return self.postfix(primary);
            }
        };

        self.advance();
        self.enter()?;
        let operand = self.unary();
        self.leave();
        let operand = operand?;
        Ok(match op {
            Some(op) => Expr::Unary {
                op,
                operand: Box::new(operand),
            },
            // 단항 `+`는 그대로 통과
            None => operand,
        })
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Token::Int(i) => Ok(Expr::Int(i)),
            Token::Float(f) => Ok(Expr::Float(f)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => {
                let items = self.list(&Token::RBracket, "']'")?;
                Ok(Expr::Array(items))
            }
            Token::Ident(word) => self.ident_or_call(word),
            Token::Eof => Err(self.error("unexpected end of input")),
            other => {
                self.pos -= 1;
                Err(self.error(format!("unexpected token {other:?}")))
            }
        }
    }

    fn ident_or_call(&mut self, word: String) -> Result<Expr, ExprError> {
        match word.as_str() {
            "true" => return Ok(Expr::Bool(true)),
            "false" => return Ok(Expr::Bool(false)),
            "nil" => return Ok(Expr::Nil),
            "and" | "or" | "in" | "not" | "matches" | "contains" | "startsWith" | "endsWith" => {
                self.pos -= 1;
                return Err(self.error(format!("unexpected keyword '{word}'")));
            }
            _ => {}
        }

        if self.peek() == &Token::LParen {
            self.advance();
            let args = self.list(&Token::RParen, "')'")?;
            return Ok(Expr::Call { func: word, args });
        }
        Ok(Expr::Ident(word))
    }

    /// 쉼표로 구분된 식 목록을 닫는 토큰까지 읽습니다.
    fn list(&mut self, close: &Token, what: &str) -> Result<Vec<Expr>, ExprError> {
        let mut items = Vec::new();
        if self.peek() == close {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            match self.peek() {
                Token::Comma => {
                    self.advance();
                    // 후행 쉼표 허용
                    if self.peek() == close {
                        self.advance();
                        return Ok(items);
                    }
                }
                t if t == close => {
                    self.advance();
                    return Ok(items);
                }
                other => {
                    return Err(self.error(format!("expected ',' or {what}, found {other:?}")));
                }
            }
        }
    }

    fn postfix(&mut self, mut expr: Expr) -> Result<Expr, ExprError> {
        let mut chained = 0;
        loop {
            if matches!(self.peek(), Token::Dot | Token::QuestionDot | Token::LBracket) {
                self.enter()?;
                chained += 1;
            }
            match self.peek() {
                Token::Dot | Token::QuestionDot => {
                    let optional = self.peek() == &Token::QuestionDot;
                    self.advance();
                    match self.advance() {
                        Token::Ident(key) => {
                            expr = Expr::Member {
                                object: Box::new(expr),
                                key,
                                optional,
                            };
                        }
                        other => {
                            self.pos -= 1;
                            return Err(
                                self.error(format!("expected member name, found {other:?}"))
                            );
                        }
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(&Token::RBracket, "']'")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => {
                    self.depth -= chained;
                    return Ok(expr);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.to_owned()))
    }

    fn member(object: &str, key: &str) -> Box<Expr> {
        Box::new(Expr::Member {
            object: ident(object),
            key: key.to_owned(),
            optional: false,
        })
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("a || b && c").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Or,
                lhs: ident("a"),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::And,
                    lhs: ident("b"),
                    rhs: ident("c"),
                }),
            }
        );
    }

    #[test]
    fn comparison_over_member_access() {
        let expr = parse("tags.type == 'node'").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Eq,
                lhs: member("tags", "type"),
                rhs: Box::new(Expr::Str("node".to_owned())),
            }
        );
    }

    #[test]
    fn arithmetic_precedence_and_left_assoc() {
        let expr = parse("1 - 2 - 3 * 4").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Sub,
                lhs: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    lhs: Box::new(Expr::Int(1)),
                    rhs: Box::new(Expr::Int(2)),
                }),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: Box::new(Expr::Int(3)),
                    rhs: Box::new(Expr::Int(4)),
                }),
            }
        );
    }

    #[test]
    fn word_operators() {
        let expr = parse("not a and b or c").unwrap();
        let Expr::Binary { op: BinaryOp::Or, lhs, .. } = expr else {
            panic!("expected or at root");
        };
        assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn not_in_is_single_operator() {
        let expr = parse("'x' not in tags").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::NotIn, .. }));
    }

    #[test]
    fn coalesce_is_right_associative() {
        let expr = parse("a ?? b ?? c").unwrap();
        let Expr::Binary { op: BinaryOp::Coalesce, lhs, rhs } = expr else {
            panic!("expected coalesce");
        };
        assert_eq!(lhs, ident("a"));
        assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Coalesce, .. }));
    }

    #[test]
    fn ternary_and_optional_member() {
        let expr = parse("meta?.unit == 'B' ? true : false").unwrap();
        let Expr::Ternary { cond, .. } = expr else {
            panic!("expected ternary");
        };
        let Expr::Binary { lhs, .. } = *cond else {
            panic!("expected comparison");
        };
        assert!(matches!(*lhs, Expr::Member { optional: true, .. }));
    }

    #[test]
    fn calls_arrays_and_index() {
        let expr = parse("len(tags) > 0 && fields['value'] in [1, 2, 3,]").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::And, .. }));
        assert!(matches!(
            parse("lower(name)").unwrap(),
            Expr::Call { ref func, ref args } if func == "lower" && args.len() == 1
        ));
    }

    #[test]
    fn syntax_errors() {
        for source in ["", "name ==", "(a", "a b", "tags.", "[1, 2", "a ? b", "in"] {
            assert!(
                matches!(parse(source), Err(ExprError::Syntax { .. })),
                "expected syntax error for {source:?}"
            );
        }
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let source = format!("{}true{}", "(".repeat(500), ")".repeat(500));
        assert!(parse(&source).is_err());
        let source = "!".repeat(500) + "true";
        assert!(parse(&source).is_err());
        let source = "1".to_owned() + &" + 1".repeat(500);
        assert!(parse(&source).is_err());
        let source = "tags".to_owned() + &".a".repeat(500);
        assert!(parse(&source).is_err());
        assert!(parse(&("1".to_owned() + &" + 1".repeat(50))).is_ok());
    }
}
