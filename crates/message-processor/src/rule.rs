//! 조건부 규칙과 규칙 집합
//!
//! 규칙은 등록 순서대로 평가됩니다. 같은 조건식을 다시 등록하면
//! 기존 규칙의 자리에서 동작만 교체합니다.

use crate::expr::Program;

/// 키/값 동작 (태그/메타/필드 추가, 삭제, 이동)
///
/// 삭제 규칙은 `value`를 쓰지 않고, 이동 규칙은 `value`를 새 키로 씁니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// 컴파일된 조건식과 동작
#[derive(Debug, Clone)]
pub struct Rule<A> {
    pub program: Program,
    pub action: A,
}

impl<A> Rule<A> {
    /// 등록 시 사용한 원본 조건식
    pub fn source(&self) -> &str {
        self.program.source()
    }
}

/// 순서가 유지되는 규칙 집합
#[derive(Debug, Clone)]
pub struct RuleSet<A> {
    rules: Vec<Rule<A>>,
}

impl<A> RuleSet<A> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// 규칙을 추가합니다. 같은 조건식이 있으면 그 자리에서 교체합니다.
    pub fn upsert(&mut self, program: Program, action: A) {
        let rule = Rule { program, action };
        match self
            .rules
            .iter_mut()
            .find(|existing| existing.source() == rule.source())
        {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    /// 조건식으로 규칙을 제거합니다. 제거했으면 `true`.
    pub fn remove(&mut self, source: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.source() != source);
        self.rules.len() != before
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule<A>> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<A> Default for RuleSet<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, A> IntoIterator for &'a RuleSet<A> {
    type Item = &'a Rule<A>;
    type IntoIter = std::slice::Iter<'a, Rule<A>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
