//! 메시지 처리기 -- 스테이지 순서대로 규칙을 적용하는 규칙 엔진
//!
//! [`MessageProcessor`]는 설정 변경과 메시지 처리를 동시에 받을 수 있습니다.
//! 설정 변경은 쓰기 잠금, 처리는 스테이지 순회 전체 동안 읽기 잠금을 잡으므로
//! 처리 도중에 규칙이 바뀌지 않습니다.
//!
//! # 처리 결과
//! - `Ok(Some(msg))`: 다음 단계로 전달
//! - `Ok(None)`: 규칙에 의해 폐기 (에러 아님)
//! - `Err(ProcessError)`: 처리 실패, 부분 처리된 메시지 포함
//!
//! # 사용 예시
//! ```
//! use std::collections::HashMap;
//! use chrono::Utc;
//! use ironmetric_core::message::Message;
//! use ironmetric_processor::MessageProcessor;
//!
//! let processor = MessageProcessor::new();
//! processor
//!     .from_config_json(r#"{"rename_messages": {"net_bytes_in": "net_bytes_out"}}"#)
//!     .unwrap();
//!
//! let msg = Message::new_metric("net_bytes_in", HashMap::new(), HashMap::new(), 1024.0, Utc::now());
//! let out = processor.process_message(&msg).unwrap().unwrap();
//! assert_eq!(out.name(), "net_bytes_out");
//! assert_eq!(out.get_meta("oldname"), Some("net_bytes_in"));
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use ironmetric_core::message::{Message, MessageType};
use ironmetric_core::metrics as m;
use ironmetric_core::pipeline::{MessageHandler, ProcessOutcome};
use ironmetric_core::units::Prefix;

use crate::actions::{self, Location};
use crate::config::{ConditionalKeyValue, ProcessorConfig};
use crate::env::{BaseEnv, Params, SnapshotPool, sanitize_key};
use crate::error::{ProcessError, ProcessErrorKind, ProcessorError};
use crate::expr::Program;
use crate::loader::ConfigLoader;
use crate::rule::{KeyValue, RuleSet};
use crate::stage::Stage;

/// [`MessageHandler`]로 등록될 때의 이름
pub const PROCESSOR_NAME: &str = "message_processor";

/// 키/값 규칙 스테이지의 동작
#[derive(Debug, Clone, Copy)]
enum KeyValueAction {
    Add(Location),
    Delete(Location),
    Move(Location, Location),
}

impl KeyValueAction {
    fn for_stage(stage: Stage) -> Option<Self> {
        use Location::{Fields, Meta, Tags};

        let action = match stage {
            Stage::AddTag => Self::Add(Tags),
            Stage::DeleteTag => Self::Delete(Tags),
            Stage::AddMeta => Self::Add(Meta),
            Stage::DeleteMeta => Self::Delete(Meta),
            Stage::AddField => Self::Add(Fields),
            Stage::DeleteField => Self::Delete(Fields),
            Stage::MoveTagToMeta => Self::Move(Tags, Meta),
            Stage::MoveTagToFields => Self::Move(Tags, Fields),
            Stage::MoveMetaToTags => Self::Move(Meta, Tags),
            Stage::MoveMetaToFields => Self::Move(Meta, Fields),
            Stage::MoveFieldToTags => Self::Move(Fields, Tags),
            Stage::MoveFieldToMeta => Self::Move(Fields, Meta),
            Stage::DropByName
            | Stage::DropByType
            | Stage::DropIf
            | Stage::RenameByName
            | Stage::RenameIf
            | Stage::ChangeUnitPrefix
            | Stage::NormalizeUnit => return None,
        };
        Some(action)
    }
}

/// 스테이지 실행 후 흐름
enum Flow {
    Continue,
    /// 폐기 (사유 레이블)
    Drop(&'static str),
}

/// 잠금으로 보호되는 처리기 상태
#[derive(Debug, Clone, Default)]
struct State {
    /// `None`이면 기본 순서
    stages: Option<Vec<Stage>>,
    drop_by_name: HashSet<String>,
    drop_by_type: HashSet<MessageType>,
    drop_if: RuleSet<()>,
    rename_by_name: HashMap<String, String>,
    rename_if: RuleSet<String>,
    key_value: HashMap<Stage, RuleSet<KeyValue>>,
    change_unit_prefix: RuleSet<Prefix>,
    normalize_units: bool,
    env: BaseEnv,
}

impl State {
    fn compile(&self, condition: &str) -> Result<Program, ProcessorError> {
        Program::compile(&sanitize_key(condition), &self.env).map_err(|e| {
            ProcessorError::Compile {
                condition: condition.to_owned(),
                reason: e.to_string(),
            }
        })
    }

    fn set_stages<S: AsRef<str>>(&mut self, stages: &[S]) -> Result<(), ProcessorError> {
        let parsed = stages
            .iter()
            .enumerate()
            .map(|(index, name)| {
                name.as_ref()
                    .parse::<Stage>()
                    .map_err(|name| ProcessorError::InvalidStage { index, name })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.stages = Some(parsed);
        Ok(())
    }

    fn add_drop_by_type(&mut self, name: &str) -> Result<(), ProcessorError> {
        let message_type = MessageType::from_name(name)
            .ok_or_else(|| ProcessorError::InvalidMessageType(name.to_owned()))?;
        self.drop_by_type.insert(message_type);
        Ok(())
    }

    fn add_drop_if(&mut self, condition: &str) -> Result<(), ProcessorError> {
        let program = self.compile(condition)?;
        self.drop_if.upsert(program, ());
        Ok(())
    }

    fn add_rename_if(&mut self, condition: &str, name: &str) -> Result<(), ProcessorError> {
        let program = self.compile(condition)?;
        self.rename_if.upsert(program, name.to_owned());
        Ok(())
    }

    fn add_key_value(
        &mut self,
        stage: Stage,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        let program = self.compile(condition)?;
        self.key_value
            .entry(stage)
            .or_default()
            .upsert(program, KeyValue::new(key, value));
        Ok(())
    }

    fn remove_key_value(&mut self, stage: Stage, condition: &str) -> bool {
        self.key_value
            .get_mut(&stage)
            .is_some_and(|rules| rules.remove(&sanitize_key(condition)))
    }

    fn add_change_unit_prefix(
        &mut self,
        condition: &str,
        prefix: &str,
    ) -> Result<(), ProcessorError> {
        let parsed = Prefix::from_symbol(prefix)
            .ok_or_else(|| ProcessorError::InvalidPrefix(prefix.to_owned()))?;
        let program = self.compile(condition)?;
        self.change_unit_prefix.upsert(program, parsed);
        Ok(())
    }

    fn rule_count(&self, stage: Stage) -> usize {
        match stage {
            Stage::DropByName => self.drop_by_name.len(),
            Stage::DropByType => self.drop_by_type.len(),
            Stage::DropIf => self.drop_if.len(),
            Stage::RenameByName => self.rename_by_name.len(),
            Stage::RenameIf => self.rename_if.len(),
            Stage::ChangeUnitPrefix => self.change_unit_prefix.len(),
            Stage::NormalizeUnit => usize::from(self.normalize_units),
            Stage::AddTag
            | Stage::DeleteTag
            | Stage::MoveTagToMeta
            | Stage::MoveTagToFields
            | Stage::AddMeta
            | Stage::DeleteMeta
            | Stage::MoveMetaToTags
            | Stage::MoveMetaToFields
            | Stage::AddField
            | Stage::DeleteField
            | Stage::MoveFieldToTags
            | Stage::MoveFieldToMeta => self.key_value.get(&stage).map_or(0, RuleSet::len),
        }
    }

    fn total_rules(&self) -> usize {
        Stage::ALL.iter().map(|stage| self.rule_count(*stage)).sum()
    }

    /// 설정 문서를 현재 상태에 적용합니다.
    fn apply(&mut self, config: &ProcessorConfig) -> Result<(), ProcessorError> {
        // 상수는 조건식 컴파일 전에 들어가야 한다
        self.env.add(&config.add_base_env);

        if !config.stage_order.is_empty() {
            self.set_stages(&config.stage_order)
                .map_err(|e| e.in_option("stage_order"))?;
        }

        self.drop_by_name
            .extend(config.drop_messages.iter().cloned());

        for name in &config.drop_by_message_type {
            self.add_drop_by_type(name)
                .map_err(|e| e.in_option("drop_by_message_type"))?;
        }

        for condition in &config.drop_messages_if {
            self.add_drop_if(condition)
                .map_err(|e| e.in_option("drop_messages_if"))?;
        }

        for (condition, name) in &config.rename_messages_if {
            self.add_rename_if(condition, name)
                .map_err(|e| e.in_option("rename_messages_if"))?;
        }

        self.rename_by_name
            .extend(config.rename_messages.iter().cloned());

        for (condition, prefix) in &config.change_unit_prefix {
            self.add_change_unit_prefix(condition, prefix)
                .map_err(|e| e.in_option("change_unit_prefix"))?;
        }

        let key_value_options: [(&str, Stage, &[ConditionalKeyValue]); 12] = [
            ("add_tags_if", Stage::AddTag, &config.add_tags_if),
            ("add_meta_if", Stage::AddMeta, &config.add_meta_if),
            ("add_fields_if", Stage::AddField, &config.add_fields_if),
            ("delete_tags_if", Stage::DeleteTag, &config.delete_tags_if),
            ("delete_meta_if", Stage::DeleteMeta, &config.delete_meta_if),
            ("delete_fields_if", Stage::DeleteField, &config.delete_fields_if),
            ("move_tag_to_meta_if", Stage::MoveTagToMeta, &config.move_tag_to_meta_if),
            ("move_tag_to_field_if", Stage::MoveTagToFields, &config.move_tag_to_field_if),
            ("move_meta_to_tag_if", Stage::MoveMetaToTags, &config.move_meta_to_tag_if),
            ("move_meta_to_field_if", Stage::MoveMetaToFields, &config.move_meta_to_field_if),
            ("move_field_to_tag_if", Stage::MoveFieldToTags, &config.move_field_to_tag_if),
            ("move_field_to_meta_if", Stage::MoveFieldToMeta, &config.move_field_to_meta_if),
        ];
        for (option, stage, entries) in key_value_options {
            for entry in entries {
                self.add_key_value(stage, &entry.condition, &entry.key, &entry.value)
                    .map_err(|e| e.in_option(option))?;
            }
        }

        self.normalize_units = config.normalize_units;
        Ok(())
    }

    fn run_stage(
        &self,
        stage: Stage,
        params: &Params<'_>,
        out: &mut Message,
    ) -> Result<Flow, ProcessErrorKind> {
        match stage {
            Stage::DropByName => {
                if self.drop_by_name.contains(out.name()) {
                    return Ok(Flow::Drop("name"));
                }
            }
            Stage::DropByType => {
                if self.drop_by_type.contains(&out.message_type()) {
                    return Ok(Flow::Drop("type"));
                }
            }
            Stage::DropIf => {
                if let Some(condition) = actions::first_match(&self.drop_if, params)? {
                    tracing::debug!(condition, name = %out.name(), "drop condition matched");
                    return Ok(Flow::Drop("condition"));
                }
            }
            Stage::RenameByName => {
                if let Some(new_name) = self.rename_by_name.get(out.name()) {
                    actions::rename(out, new_name);
                }
            }
            Stage::RenameIf => actions::rename_if(out, &self.rename_if, params)?,
            Stage::ChangeUnitPrefix => {
                actions::change_unit_prefix(out, &self.change_unit_prefix, params)?;
            }
            Stage::NormalizeUnit => {
                if self.normalize_units {
                    actions::normalize_unit(out);
                }
            }
            Stage::AddTag
            | Stage::DeleteTag
            | Stage::MoveTagToMeta
            | Stage::MoveTagToFields
            | Stage::AddMeta
            | Stage::DeleteMeta
            | Stage::MoveMetaToTags
            | Stage::MoveMetaToFields
            | Stage::AddField
            | Stage::DeleteField
            | Stage::MoveFieldToTags
            | Stage::MoveFieldToMeta => {
                let (Some(action), Some(rules)) =
                    (KeyValueAction::for_stage(stage), self.key_value.get(&stage))
                else {
                    return Ok(Flow::Continue);
                };
                match action {
                    KeyValueAction::Add(location) => {
                        actions::add_if(out, rules, params, location)?;
                    }
                    KeyValueAction::Delete(location) => {
                        actions::delete_if(out, rules, params, location)?;
                    }
                    KeyValueAction::Move(from, to) => {
                        actions::move_if(out, rules, params, from, to)?;
                    }
                }
            }
        }
        Ok(Flow::Continue)
    }
}

/// 텔레메트리 메시지 처리기
///
/// 조건식은 등록 시점에 한 번 컴파일되어 인스턴스에 보관됩니다.
/// 같은 조건식을 다시 등록하면 기존 규칙의 동작을 교체합니다.
#[derive(Debug, Default)]
pub struct MessageProcessor {
    state: RwLock<State>,
    pool: SnapshotPool,
}

impl MessageProcessor {
    /// 규칙이 없는 처리기를 생성합니다. 스테이지는 기본 순서입니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 설정 문서로 처리기를 생성합니다.
    pub fn with_config(config: &ProcessorConfig) -> Result<Self, ProcessorError> {
        let processor = Self::new();
        processor.apply_config(config)?;
        Ok(processor)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 쓰기 잠금 아래에서 상태를 바꾸고 규칙 수 게이지를 갱신합니다.
    fn mutate<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.write();
        let result = f(&mut state);
        metrics::gauge!(m::PROCESSOR_RULES_LOADED).set(state.total_rules() as f64);
        result
    }

    // ─── 스테이지 ──────────────────────────────────────────────────

    /// 스테이지 실행 순서를 지정합니다. 빈 목록이면 모든 메시지를 그대로 통과시킵니다.
    ///
    /// # Errors
    /// 알 수 없는 스테이지 이름이 있으면 [`ProcessorError::InvalidStage`]. 이 경우 순서는 바뀌지 않습니다.
    pub fn set_stages<S: AsRef<str>>(&self, stages: &[S]) -> Result<(), ProcessorError> {
        self.mutate(|state| state.set_stages(stages))
    }

    /// 현재 스테이지 실행 순서
    pub fn stages(&self) -> Vec<Stage> {
        self.read()
            .stages
            .clone()
            .unwrap_or_else(|| Stage::ALL.to_vec())
    }

    /// 기본 스테이지 이름 목록
    pub fn default_stages() -> Vec<&'static str> {
        Stage::ALL.iter().map(|stage| stage.as_str()).collect()
    }

    // ─── 드롭 ────────────────────────────────────────────────────

    pub fn add_drop_messages_by_name(&self, name: &str) {
        self.mutate(|state| {
            state.drop_by_name.insert(name.to_owned());
        });
    }

    pub fn remove_drop_messages_by_name(&self, name: &str) -> bool {
        self.mutate(|state| state.drop_by_name.remove(name))
    }

    pub fn add_drop_messages_by_condition(&self, condition: &str) -> Result<(), ProcessorError> {
        self.mutate(|state| state.add_drop_if(condition))
    }

    pub fn remove_drop_messages_by_condition(&self, condition: &str) -> bool {
        self.mutate(|state| state.drop_if.remove(&sanitize_key(condition)))
    }

    /// 메시지 종류(`metric`, `event`, `control`, `log`)로 드롭합니다.
    pub fn add_drop_messages_by_type(&self, message_type: &str) -> Result<(), ProcessorError> {
        self.mutate(|state| state.add_drop_by_type(message_type))
    }

    pub fn remove_drop_messages_by_type(&self, message_type: &str) -> bool {
        let Some(parsed) = MessageType::from_name(message_type) else {
            return false;
        };
        self.mutate(|state| state.drop_by_type.remove(&parsed))
    }

    // ─── 이름 변경 ──────────────────────────────────────────────────

    pub fn add_rename_metric_by_name(&self, from: &str, to: &str) {
        self.mutate(|state| {
            state.rename_by_name.insert(from.to_owned(), to.to_owned());
        });
    }

    pub fn remove_rename_metric_by_name(&self, from: &str) -> bool {
        self.mutate(|state| state.rename_by_name.remove(from).is_some())
    }

    pub fn add_rename_metric_by_condition(
        &self,
        condition: &str,
        name: &str,
    ) -> Result<(), ProcessorError> {
        self.mutate(|state| state.add_rename_if(condition, name))
    }

    pub fn remove_rename_metric_by_condition(&self, condition: &str) -> bool {
        self.mutate(|state| state.rename_if.remove(&sanitize_key(condition)))
    }

    // ─── 태그/메타/필드 ──────────────────────────────────────────────

    pub fn add_add_tags_by_condition(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::AddTag, condition, key, value)
    }

    pub fn remove_add_tags_by_condition(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::AddTag, condition)
    }

    pub fn add_delete_tags_by_condition(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::DeleteTag, condition, key, value)
    }

    pub fn remove_delete_tags_by_condition(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::DeleteTag, condition)
    }

    pub fn add_add_meta_by_condition(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::AddMeta, condition, key, value)
    }

    pub fn remove_add_meta_by_condition(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::AddMeta, condition)
    }

    pub fn add_delete_meta_by_condition(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::DeleteMeta, condition, key, value)
    }

    pub fn remove_delete_meta_by_condition(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::DeleteMeta, condition)
    }

    /// 필드를 문자열 값으로 추가합니다.
    pub fn add_add_field_by_condition(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::AddField, condition, key, value)
    }

    pub fn remove_add_field_by_condition(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::AddField, condition)
    }

    /// 필드를 삭제합니다. 예약 필드(`value`, `event`, `control`, `log`)는 처리 시점에 거부됩니다.
    pub fn add_delete_field_by_condition(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::DeleteField, condition, key, value)
    }

    pub fn remove_delete_field_by_condition(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::DeleteField, condition)
    }

    // ─── 이동 ────────────────────────────────────────────────────

    pub fn add_move_tag_to_meta(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::MoveTagToMeta, condition, key, value)
    }

    pub fn remove_move_tag_to_meta(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::MoveTagToMeta, condition)
    }

    pub fn add_move_tag_to_fields(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::MoveTagToFields, condition, key, value)
    }

    pub fn remove_move_tag_to_fields(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::MoveTagToFields, condition)
    }

    pub fn add_move_meta_to_tags(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::MoveMetaToTags, condition, key, value)
    }

    pub fn remove_move_meta_to_tags(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::MoveMetaToTags, condition)
    }

    pub fn add_move_meta_to_fields(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::MoveMetaToFields, condition, key, value)
    }

    pub fn remove_move_meta_to_fields(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::MoveMetaToFields, condition)
    }

    /// 조건이 참인 메시지의 필드 `key`를 태그의 `value` 키로 옮깁니다.
    ///
    /// 예약 필드(`value`, `event`, `control`, `log`)는 옮기지 않습니다. 그런 규칙이
    /// 참이 되면 필드는 그대로 남고 [`process_message`](Self::process_message)가
    /// [`ProcessErrorKind::ProtectedField`](crate::ProcessErrorKind::ProtectedField) 에러를 반환합니다.
    pub fn add_move_field_to_tags(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::MoveFieldToTags, condition, key, value)
    }

    pub fn remove_move_field_to_tags(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::MoveFieldToTags, condition)
    }

    /// 조건이 참인 메시지의 필드 `key`를 메타의 `value` 키로 옮깁니다.
    ///
    /// 예약 필드(`value`, `event`, `control`, `log`)는 옮기지 않습니다. 그런 규칙이
    /// 참이 되면 필드는 그대로 남고 [`process_message`](Self::process_message)가
    /// [`ProcessErrorKind::ProtectedField`](crate::ProcessErrorKind::ProtectedField) 에러를 반환합니다.
    pub fn add_move_field_to_meta(
        &self,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.add_key_value(Stage::MoveFieldToMeta, condition, key, value)
    }

    pub fn remove_move_field_to_meta(&self, condition: &str) -> bool {
        self.remove_key_value(Stage::MoveFieldToMeta, condition)
    }

    fn add_key_value(
        &self,
        stage: Stage,
        condition: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProcessorError> {
        self.mutate(|state| state.add_key_value(stage, condition, key, value))
    }

    fn remove_key_value(&self, stage: Stage, condition: &str) -> bool {
        self.mutate(|state| state.remove_key_value(stage, condition))
    }

    // ─── 단위 ────────────────────────────────────────────────────

    /// 조건이 참인 메트릭의 값을 `prefix` 접두어 단위로 환산합니다.
    ///
    /// # Errors
    /// 알 수 없는 접두어면 [`ProcessorError::InvalidPrefix`], 조건식이 잘못되면 [`ProcessorError::Compile`].
    pub fn add_change_unit_prefix(
        &self,
        condition: &str,
        prefix: &str,
    ) -> Result<(), ProcessorError> {
        self.mutate(|state| state.add_change_unit_prefix(condition, prefix))
    }

    pub fn remove_change_unit_prefix(&self, condition: &str) -> bool {
        self.mutate(|state| state.change_unit_prefix.remove(&sanitize_key(condition)))
    }

    pub fn set_normalize_units(&self, enabled: bool) {
        self.mutate(|state| state.normalize_units = enabled);
    }

    // ─── 환경/설정 ──────────────────────────────────────────────────

    /// 조건식에서 쓸 상수를 추가하고 반영된 개수를 반환합니다.
    ///
    /// 상수는 컴파일 시점에 인라인되므로 이후에 등록하는 규칙에만 적용됩니다.
    pub fn add_base_env(&self, vars: &HashMap<String, serde_json::Value>) -> usize {
        self.mutate(|state| state.env.add(vars))
    }

    /// 설정 문서를 적용합니다.
    ///
    /// 적용은 원자적입니다. 항목 하나라도 실패하면 기존 규칙은 그대로 남습니다.
    pub fn apply_config(&self, config: &ProcessorConfig) -> Result<(), ProcessorError> {
        self.mutate(|state| {
            let mut next = state.clone();
            next.apply(config)?;
            *state = next;
            Ok(())
        })
    }

    /// JSON 설정 문서를 해석해 적용합니다.
    pub fn from_config_json(&self, raw: &str) -> Result<(), ProcessorError> {
        self.apply_config(&ProcessorConfig::from_json(raw)?)
    }

    /// YAML 설정 문서를 해석해 적용합니다.
    pub fn from_config_yaml(&self, raw: &str) -> Result<(), ProcessorError> {
        self.apply_config(&ProcessorConfig::from_yaml(raw)?)
    }

    /// 규칙 파일(`.json`, `.yaml`, `.yml`)을 읽어 적용합니다.
    pub async fn load_config_file(&self, path: impl AsRef<Path>) -> Result<(), ProcessorError> {
        let config = ConfigLoader::load_file(path).await?;
        self.apply_config(&config)
    }

    /// 등록된 규칙 총수 (정규화 플래그 포함)
    pub fn rule_count(&self) -> usize {
        self.read().total_rules()
    }

    /// 스테이지별 규칙 수 (기본 순서)
    pub fn rule_counts(&self) -> Vec<(Stage, usize)> {
        let state = self.read();
        Stage::ALL
            .iter()
            .map(|stage| (*stage, state.rule_count(*stage)))
            .collect()
    }

    // ─── 처리 ────────────────────────────────────────────────────

    /// 메시지 1건을 처리합니다. 입력 메시지는 변경하지 않습니다.
    ///
    /// # Errors
    /// 조건식 평가 실패나 예약 필드 삭제 시도 시 [`ProcessError`]를 반환합니다.
    /// 에러에는 실패 직전까지 변경된 메시지가 담깁니다.
    pub fn process_message(&self, message: &Message) -> Result<Option<Message>, ProcessError> {
        let started = Instant::now();
        let state = self.read();
        let params = Params::new(message, &self.pool);
        let mut out = message.clone();

        let stages = state.stages.as_deref().unwrap_or(&Stage::ALL);
        for &stage in stages {
            match state.run_stage(stage, &params, &mut out) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Drop(reason)) => {
                    tracing::debug!(
                        name = %message.name(),
                        stage = %stage,
                        reason,
                        "message dropped"
                    );
                    metrics::counter!(
                        m::PROCESSOR_MESSAGES_DROPPED_TOTAL,
                        m::LABEL_REASON => reason
                    )
                    .increment(1);
                    metrics::histogram!(m::PROCESSOR_PROCESSING_DURATION_SECONDS)
                        .record(started.elapsed().as_secs_f64());
                    return Ok(None);
                }
                Err(kind) => {
                    metrics::counter!(
                        m::PROCESSOR_EVALUATION_ERRORS_TOTAL,
                        m::LABEL_STAGE => stage.as_str()
                    )
                    .increment(1);
                    return Err(ProcessError::new(stage, kind, out));
                }
            }
        }

        metrics::counter!(m::PROCESSOR_MESSAGES_PROCESSED_TOTAL).increment(1);
        metrics::histogram!(m::PROCESSOR_PROCESSING_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(Some(out))
    }
}

impl MessageHandler for MessageProcessor {
    fn name(&self) -> &str {
        PROCESSOR_NAME
    }

    fn handle(&self, message: &Message) -> ProcessOutcome {
        match self.process_message(message) {
            Ok(Some(out)) => ProcessOutcome::Forward(out),
            Ok(None) => ProcessOutcome::Drop,
            Err(err) => {
                let reason = err.to_string();
                ProcessOutcome::Failed {
                    partial: err.into_partial(),
                    reason,
                }
            }
        }
    }
}
