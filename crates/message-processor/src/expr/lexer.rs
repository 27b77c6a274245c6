//! 조건식 토크나이저

use crate::error::ExprError;

/// 토큰 종류
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    QuestionDot,
    Question,
    DoubleQuestion,
    Colon,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eof,
}

/// 위치 정보가 붙은 토큰
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    /// 소스 내 바이트 오프셋
    pub offset: usize,
}

/// 조건식 문자열을 토큰 목록으로 나눕니다. 마지막 토큰은 항상 [`Token::Eof`]입니다.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    Lexer {
        src: source,
        bytes: source.as_bytes(),
        pos: 0,
    }
    .run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Spanned>, ExprError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let offset = self.pos;
            let Some(&c) = self.bytes.get(self.pos) else {
                tokens.push(Spanned {
                    token: Token::Eof,
                    offset,
                });
                return Ok(tokens);
            };

            let token = match c {
                b'0'..=b'9' => self.number()?,
                b'.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number()?,
                b'\'' | b'"' => self.string(c)?,
                c if c == b'_' || c == b'$' || c.is_ascii_alphabetic() => self.ident(),
                _ => self.punct()?,
            };
            tokens.push(Spanned { token, offset });
        }
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek_at(0).is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, offset: usize, reason: impl Into<String>) -> ExprError {
        ExprError::Syntax {
            offset,
            reason: reason.into(),
        }
    }

    fn number(&mut self) -> Result<Token, ExprError> {
        let start = self.pos;
        let mut is_float = false;

        while self.peek_at(0).is_some_and(|c| c.is_ascii_digit() || c == b'_') {
            self.pos += 1;
        }
        if self.peek_at(0) == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            while self.peek_at(0).is_some_and(|c| c.is_ascii_digit() || c == b'_') {
                self.pos += 1;
            }
        }
        if matches!(self.peek_at(0), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|e| self.error(start, format!("invalid float literal '{text}': {e}")))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|e| self.error(start, format!("invalid integer literal '{text}': {e}")))
        }
    }

    fn string(&mut self, quote: u8) -> Result<Token, ExprError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.src[self.pos..].char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\\' | '\'' | '"' => out.push(escaped),
                        other => {
                            return Err(self.error(
                                self.pos + i,
                                format!("unknown escape sequence '\\{other}'"),
                            ));
                        }
                    }
                }
                c if c as u32 == u32::from(quote) => {
                    self.pos += i + 1;
                    return Ok(Token::Str(out));
                }
                c => out.push(c),
            }
        }

        Err(self.error(start, "unterminated string literal"))
    }

    fn ident(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_at(0)
            .is_some_and(|c| c == b'_' || c == b'$' || c.is_ascii_alphanumeric())
        {
            self.pos += 1;
        }
        Token::Ident(self.src[start..self.pos].to_owned())
    }

    fn punct(&mut self) -> Result<Token, ExprError> {
        let start = self.pos;
        let c = self.bytes[self.pos];
        let next = self.peek_at(1);

        let (token, width) = match (c, next) {
            (b'=', Some(b'=')) => (Token::EqEq, 2),
            (b'!', Some(b'=')) => (Token::NotEq, 2),
            (b'<', Some(b'=')) => (Token::Le, 2),
            (b'>', Some(b'=')) => (Token::Ge, 2),
            (b'&', Some(b'&')) => (Token::AndAnd, 2),
            (b'|', Some(b'|')) => (Token::OrOr, 2),
            (b'?', Some(b'?')) => (Token::DoubleQuestion, 2),
            // `?.5` 는 삼항 연산자 뒤의 실수 리터럴
            (b'?', Some(b'.')) if !self.peek_at(2).is_some_and(|d| d.is_ascii_digit()) => {
                (Token::QuestionDot, 2)
            }
            (b'?', _) => (Token::Question, 1),
            (b'<', _) => (Token::Lt, 1),
            (b'>', _) => (Token::Gt, 1),
            (b'!', _) => (Token::Bang, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            (b'[', _) => (Token::LBracket, 1),
            (b']', _) => (Token::RBracket, 1),
            (b',', _) => (Token::Comma, 1),
            (b'.', _) => (Token::Dot, 1),
            (b':', _) => (Token::Colon, 1),
            (b'+', _) => (Token::Plus, 1),
            (b'-', _) => (Token::Minus, 1),
            (b'*', _) => (Token::Star, 1),
            (b'/', _) => (Token::Slash, 1),
            (b'%', _) => (Token::Percent, 1),
            _ => {
                let ch = self.src[start..].chars().next().unwrap_or('?');
                return Err(self.error(start, format!("unexpected character '{ch}'")));
            }
        };
        self.pos += width;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn comparison_expression() {
        assert_eq!(
            kinds("name == 'net_bytes_in'"),
            vec![
                Token::Ident("name".to_owned()),
                Token::EqEq,
                Token::Str("net_bytes_in".to_owned()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("1 2.5 1e3 1_000"),
            vec![
                Token::Int(1),
                Token::Float(2.5),
                Token::Float(1000.0),
                Token::Int(1000),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn member_access_is_not_a_float() {
        assert_eq!(
            kinds("tags.type"),
            vec![
                Token::Ident("tags".to_owned()),
                Token::Dot,
                Token::Ident("type".to_owned()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn multi_char_operators() {
        assert_eq!(
            kinds("a ?? b?.c && d || !e != f <= g >= h"),
            vec![
                Token::Ident("a".to_owned()),
                Token::DoubleQuestion,
                Token::Ident("b".to_owned()),
                Token::QuestionDot,
                Token::Ident("c".to_owned()),
                Token::AndAnd,
                Token::Ident("d".to_owned()),
                Token::OrOr,
                Token::Bang,
                Token::Ident("e".to_owned()),
                Token::NotEq,
                Token::Ident("f".to_owned()),
                Token::Le,
                Token::Ident("g".to_owned()),
                Token::Ge,
                Token::Ident("h".to_owned()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn ternary_followed_by_fraction() {
        assert_eq!(
            kinds("x ?.5 : 1"),
            vec![
                Token::Ident("x".to_owned()),
                Token::Question,
                Token::Float(0.5),
                Token::Colon,
                Token::Int(1),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes_and_quotes() {
        assert_eq!(
            kinds(r#""a\"b" 'it\'s' 'tab\t'"#),
            vec![
                Token::Str("a\"b".to_owned()),
                Token::Str("it's".to_owned()),
                Token::Str("tab\t".to_owned()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn unicode_inside_strings() {
        assert_eq!(
            kinds("'°C'"),
            vec![Token::Str("°C".to_owned()), Token::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_error() {
        let err = tokenize("name == 'abc").unwrap_err();
        assert!(matches!(err, ExprError::Syntax { offset: 8, .. }));
    }

    #[test]
    fn unknown_character_is_error() {
        assert!(matches!(
            tokenize("a = b"),
            Err(ExprError::Syntax { offset: 2, .. })
        ));
        assert!(tokenize("a # b").is_err());
    }

    #[test]
    fn integer_overflow_is_error() {
        assert!(tokenize("99999999999999999999").is_err());
    }
}
