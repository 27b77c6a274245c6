//! 스테이지별 메시지 변경 동작
//!
//! 모든 조건은 처리 시작 시점의 스냅샷([`Params`])으로 평가하고,
//! 변경은 작업 사본(`out`)에만 적용합니다.

use ironmetric_core::message::{FieldValue, Message, MessageType, is_reserved_field};
use ironmetric_core::units::{Prefix, Unit, get_unit_prefix_factor};

use crate::env::Params;
use crate::error::ProcessErrorKind;
use crate::expr::Program;
use crate::rule::{KeyValue, RuleSet};

/// 이름 변경 시 이전 이름을 기록하는 메타 키
pub const OLDNAME_META_KEY: &str = "oldname";

/// 단위 문자열이 들어 있는 태그/메타 키
pub const UNIT_KEY: &str = "unit";

/// 메시지 내 데이터 위치
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Tags,
    Meta,
    Fields,
}

impl Location {
    /// 값을 문자열로 읽습니다. 필드 값은 기본 형식으로 문자열화합니다.
    fn get(self, msg: &Message, key: &str) -> Option<String> {
        match self {
            Self::Tags => msg.get_tag(key).map(str::to_owned),
            Self::Meta => msg.get_meta(key).map(str::to_owned),
            Self::Fields => msg.get_field(key).map(ToString::to_string),
        }
    }

    fn remove(self, msg: &mut Message, key: &str) {
        match self {
            Self::Tags => {
                msg.remove_tag(key);
            }
            Self::Meta => {
                msg.remove_meta(key);
            }
            Self::Fields => {
                msg.remove_field(key);
            }
        }
    }

    fn insert(self, msg: &mut Message, key: &str, value: String) {
        match self {
            Self::Tags => msg.add_tag(key, value),
            Self::Meta => msg.add_meta(key, value),
            Self::Fields => msg.add_field(key, FieldValue::String(value)),
        }
    }
}

fn evaluate(program: &Program, params: &Params<'_>) -> Result<bool, ProcessErrorKind> {
    program
        .matches(params)
        .map_err(|e| ProcessErrorKind::Evaluation(e.to_string()))
}

/// 참이 되는 첫 조건식을 반환합니다.
pub fn first_match<'r, A>(
    rules: &'r RuleSet<A>,
    params: &Params<'_>,
) -> Result<Option<&'r str>, ProcessErrorKind> {
    for rule in rules {
        if evaluate(&rule.program, params)? {
            return Ok(Some(rule.source()));
        }
    }
    Ok(None)
}

/// 이름을 바꾸고 이전 이름을 `oldname` 메타에 기록합니다.
pub fn rename(out: &mut Message, new_name: &str) {
    let old = out.name().to_owned();
    out.set_name(new_name);
    out.add_meta(OLDNAME_META_KEY, old);
}

/// 등록 순서대로 평가하며 참인 규칙마다 이름을 바꿉니다. 마지막 일치가 최종 이름이 됩니다.
pub fn rename_if(
    out: &mut Message,
    rules: &RuleSet<String>,
    params: &Params<'_>,
) -> Result<(), ProcessErrorKind> {
    for rule in rules {
        if evaluate(&rule.program, params)? {
            tracing::debug!(condition = rule.source(), name = %rule.action, "rename matched");
            rename(out, &rule.action);
        }
    }
    Ok(())
}

/// 참인 규칙마다 키/값을 추가합니다. 필드 값은 문자열로 추가됩니다.
pub fn add_if(
    out: &mut Message,
    rules: &RuleSet<KeyValue>,
    params: &Params<'_>,
    location: Location,
) -> Result<(), ProcessErrorKind> {
    for rule in rules {
        if evaluate(&rule.program, params)? {
            location.insert(out, &rule.action.key, rule.action.value.clone());
        }
    }
    Ok(())
}

/// 참인 규칙마다 키를 삭제합니다.
///
/// 예약 필드 삭제는 건너뛰고 나머지 규칙을 계속 적용한 뒤 첫 번째 거부를 에러로 돌려줍니다.
pub fn delete_if(
    out: &mut Message,
    rules: &RuleSet<KeyValue>,
    params: &Params<'_>,
    location: Location,
) -> Result<(), ProcessErrorKind> {
    let mut rejected = None;
    for rule in rules {
        if !evaluate(&rule.program, params)? {
            continue;
        }
        let key = rule.action.key.as_str();
        if location == Location::Fields && is_reserved_field(key) {
            rejected.get_or_insert_with(|| ProcessErrorKind::ProtectedField(key.to_owned()));
            continue;
        }
        location.remove(out, key);
    }
    rejected.map_or(Ok(()), Err)
}

/// 참인 규칙마다 `key`의 값을 `from`에서 꺼내 `to`의 `value` 키로 옮깁니다.
///
/// `value`가 비어 있으면 같은 키를 씁니다. 예약 필드는 옮기지 않습니다.
pub fn move_if(
    out: &mut Message,
    rules: &RuleSet<KeyValue>,
    params: &Params<'_>,
    from: Location,
    to: Location,
) -> Result<(), ProcessErrorKind> {
    let mut rejected = None;
    for rule in rules {
        if !evaluate(&rule.program, params)? {
            continue;
        }
        let KeyValue { key, value } = &rule.action;
        if from == Location::Fields && is_reserved_field(key) {
            rejected.get_or_insert_with(|| ProcessErrorKind::ProtectedField(key.clone()));
            continue;
        }
        let Some(moved) = from.get(out, key) else {
            continue;
        };
        from.remove(out, key);
        let target = if value.is_empty() { key } else { value };
        to.insert(out, target, moved);
    }
    rejected.map_or(Ok(()), Err)
}

/// 단위 문자열 위치 (메타 우선)
fn unit_location(out: &Message) -> Option<(Location, Unit)> {
    if let Some(raw) = out.get_meta(UNIT_KEY) {
        return Some((Location::Meta, Unit::parse(raw)));
    }
    out.get_tag(UNIT_KEY).map(|raw| (Location::Tags, Unit::parse(raw)))
}

/// 메트릭의 단위 문자열을 정규화된 짧은 표기로 바꿉니다. 값은 바꾸지 않습니다.
pub fn normalize_unit(out: &mut Message) {
    if out.message_type() != MessageType::Metric {
        return;
    }
    let Some((location, unit)) = unit_location(out) else {
        return;
    };
    if unit.is_valid() {
        location.insert(out, UNIT_KEY, unit.short());
    }
}

/// 참인 규칙마다 메트릭 값을 목표 접두어로 환산하고 단위 문자열을 바꿉니다.
///
/// 규칙은 등록 순서대로 누적 적용됩니다. 단위가 없거나 해석할 수 없거나
/// 값이 숫자가 아니면 해당 규칙은 아무것도 하지 않습니다.
pub fn change_unit_prefix(
    out: &mut Message,
    rules: &RuleSet<Prefix>,
    params: &Params<'_>,
) -> Result<(), ProcessErrorKind> {
    if out.message_type() != MessageType::Metric {
        return Ok(());
    }
    for rule in rules {
        if !evaluate(&rule.program, params)? {
            continue;
        }
        let Some((location, unit)) = unit_location(out) else {
            continue;
        };
        if !unit.is_valid() {
            continue;
        }
        let target = unit.with_prefix(rule.action);
        let Ok(conversion) = get_unit_prefix_factor(&unit, &target) else {
            continue;
        };
        let Some(value) = out.get_field("value").and_then(FieldValue::as_f64) else {
            continue;
        };
        out.add_field("value", conversion.apply(value));
        location.insert(out, UNIT_KEY, target.short());
        tracing::debug!(
            condition = rule.source(),
            from = %unit.short(),
            to = %target.short(),
            "unit prefix changed"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;

    use super::*;
    use crate::env::{BaseEnv, SnapshotPool};

    fn sample_metric() -> Message {
        Message::new_metric(
            "net_bytes_in",
            HashMap::from([("type".to_owned(), "node".to_owned())]),
            HashMap::from([("unit".to_owned(), "Byte".to_owned())]),
            1024.0,
            Utc::now(),
        )
    }

    fn rules<A>(entries: Vec<(&str, A)>) -> RuleSet<A> {
        let env = BaseEnv::new();
        let mut set = RuleSet::new();
        for (source, action) in entries {
            set.upsert(Program::compile(source, &env).unwrap(), action);
        }
        set
    }

    #[test]
    fn rename_records_old_name() {
        let mut msg = sample_metric();
        rename(&mut msg, "net_bytes_out");
        assert_eq!(msg.name(), "net_bytes_out");
        assert_eq!(msg.get_meta(OLDNAME_META_KEY), Some("net_bytes_in"));
    }

    #[test]
    fn rename_if_last_match_wins() {
        let input = sample_metric();
        let pool = SnapshotPool::default();
        let params = Params::new(&input, &pool);
        let mut out = input.clone();
        let set = rules(vec![
            ("name == 'net_bytes_in'", "first".to_owned()),
            ("tags.type == 'socket'", "never".to_owned()),
            ("*", "second".to_owned()),
        ]);
        rename_if(&mut out, &set, &params).unwrap();
        assert_eq!(out.name(), "second");
        assert_eq!(out.get_meta(OLDNAME_META_KEY), Some("first"));
    }

    #[test]
    fn add_field_stores_string() {
        let input = sample_metric();
        let pool = SnapshotPool::default();
        let params = Params::new(&input, &pool);
        let mut out = input.clone();
        let set = rules(vec![("*", KeyValue::new("extra", "42"))]);
        add_if(&mut out, &set, &params, Location::Fields).unwrap();
        assert_eq!(out.get_field("extra"), Some(&FieldValue::String("42".to_owned())));
    }

    #[test]
    fn protected_field_delete_keeps_field_and_runs_other_rules() {
        let mut input = sample_metric();
        input.add_field("extra", 1);
        let pool = SnapshotPool::default();
        let params = Params::new(&input, &pool);
        let mut out = input.clone();
        let set = rules(vec![
            ("*", KeyValue::new("value", "")),
            ("name != ''", KeyValue::new("extra", "")),
        ]);
        let err = delete_if(&mut out, &set, &params, Location::Fields).unwrap_err();
        assert_eq!(err, ProcessErrorKind::ProtectedField("value".to_owned()));
        assert!(out.has_field("value"));
        assert!(!out.has_field("extra"));
    }

    #[test]
    fn reserved_keys_are_not_protected_in_tags() {
        let mut input = sample_metric();
        input.add_tag("value", "x");
        let pool = SnapshotPool::default();
        let params = Params::new(&input, &pool);
        let mut out = input.clone();
        let set = rules(vec![("*", KeyValue::new("value", ""))]);
        delete_if(&mut out, &set, &params, Location::Tags).unwrap();
        assert!(!out.has_tag("value"));
    }

    #[test]
    fn move_field_to_tag_stringifies() {
        let mut input = sample_metric();
        input.add_field("cores", 8);
        let pool = SnapshotPool::default();
        let params = Params::new(&input, &pool);
        let mut out = input.clone();
        let set = rules(vec![("*", KeyValue::new("cores", "ncores"))]);
        move_if(&mut out, &set, &params, Location::Fields, Location::Tags).unwrap();
        assert!(!out.has_field("cores"));
        assert_eq!(out.get_tag("ncores"), Some("8"));
    }

    #[test]
    fn move_missing_key_is_noop() {
        let input = sample_metric();
        let pool = SnapshotPool::default();
        let params = Params::new(&input, &pool);
        let mut out = input.clone();
        let set = rules(vec![("*", KeyValue::new("absent", "other"))]);
        move_if(&mut out, &set, &params, Location::Tags, Location::Meta).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn move_reserved_field_is_rejected() {
        let input = sample_metric();
        let pool = SnapshotPool::default();
        let params = Params::new(&input, &pool);
        let mut out = input.clone();
        let set = rules(vec![("*", KeyValue::new("value", "v"))]);
        let err = move_if(&mut out, &set, &params, Location::Fields, Location::Meta).unwrap_err();
        assert!(matches!(err, ProcessErrorKind::ProtectedField(_)));
        assert!(out.has_field("value"));
    }

    #[test]
    fn normalize_prefers_meta_and_skips_non_metrics() {
        let mut msg = sample_metric();
        msg.add_tag("unit", "MBytes");
        normalize_unit(&mut msg);
        assert_eq!(msg.get_meta("unit"), Some("B"));
        assert_eq!(msg.get_tag("unit"), Some("MBytes"));

        let mut event = Message::new_event(
            "ev",
            HashMap::new(),
            HashMap::from([("unit".to_owned(), "Byte".to_owned())]),
            "restart",
            Utc::now(),
        );
        normalize_unit(&mut event);
        assert_eq!(event.get_meta("unit"), Some("Byte"));
    }

    #[test]
    fn change_prefix_scales_value() {
        let input = sample_metric();
        let pool = SnapshotPool::default();
        let params = Params::new(&input, &pool);
        let mut out = input.clone();
        let set = rules(vec![("name == 'net_bytes_in'", Prefix::Mega)]);
        change_unit_prefix(&mut out, &set, &params).unwrap();
        assert_eq!(out.get_field("value"), Some(&FieldValue::Float(0.001024)));
        assert_eq!(out.get_meta("unit"), Some("MB"));
    }

    #[test]
    fn change_prefix_ignores_unknown_unit() {
        let mut input = sample_metric();
        input.add_meta("unit", "bananas");
        let pool = SnapshotPool::default();
        let params = Params::new(&input, &pool);
        let mut out = input.clone();
        let set = rules(vec![("*", Prefix::Kilo)]);
        change_unit_prefix(&mut out, &set, &params).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn evaluation_error_aborts_stage() {
        let input = sample_metric();
        let pool = SnapshotPool::default();
        let params = Params::new(&input, &pool);
        let mut out = input.clone();
        let set = rules(vec![("tags.missing.inner == 'x'", KeyValue::new("k", "v"))]);
        let err = add_if(&mut out, &set, &params, Location::Tags).unwrap_err();
        assert!(matches!(err, ProcessErrorKind::Evaluation(_)));
        assert!(err.to_string().starts_with("failed to evaluate"));
    }
}
