//! 조건식 환경 -- 이름 해석(컴파일 시점)과 메시지 스냅샷(평가 시점)
//!
//! - [`BaseEnv`]: 조건식에서 쓸 수 있는 이름 목록. 내장 이름과 사용자 상수로 구성되며
//!   처리기 인스턴스마다 따로 가집니다.
//! - [`Params`]: 메시지 1건을 평가하기 위한 읽기 전용 스냅샷.
//!   태그/메타 키는 조건식에서 쓸 수 있도록 정규화한 사본을 [`SnapshotPool`]에서
//!   빌려 채우고, 스냅샷이 drop될 때 비워서 반환합니다.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::ops::{Deref, DerefMut};

use crossbeam::queue::ArrayQueue;

use ironmetric_core::message::{Message, MessageType};

use crate::expr::{Binding, Bindings, Scope, Value, Var};

/// 조건식 식별자로 쓸 수 없는 키 조각과 그 대체 문자열
const SANITIZE_FROM: &str = "type-id";
const SANITIZE_TO: &str = "typeid";

/// 기본 풀 크기
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// 조건식과 태그/메타 키를 식별자로 쓸 수 있게 정규화합니다. (`type-id` -> `typeid`)
pub fn sanitize_key(key: &str) -> Cow<'_, str> {
    if key.contains(SANITIZE_FROM) {
        Cow::Owned(key.replace(SANITIZE_FROM, SANITIZE_TO))
    } else {
        Cow::Borrowed(key)
    }
}

/// 내장 이름 -> 변수
fn builtin(name: &str) -> Option<Var> {
    let var = match name {
        "name" => Var::Name,
        "messagetype" | "msgtype" => Var::MessageType,
        "timestamp" | "time" => Var::Timestamp,
        "value" | "metric" => Var::Field("value"),
        "event" => Var::Field("event"),
        "control" => Var::Field("control"),
        "log" => Var::Field("log"),
        "fields" | "field" => Var::Fields,
        "tags" | "tag" => Var::Tags,
        "meta" => Var::Meta,
        "message" | "msg" => Var::Message,
        _ => return None,
    };
    Some(var)
}

/// 조건식 이름 환경
///
/// 사용자 상수는 [`BaseEnv::add`]로 추가하며 컴파일 시점에 조건식에 인라인됩니다.
#[derive(Debug, Clone, Default)]
pub struct BaseEnv {
    constants: BTreeMap<String, Value>,
}

impl BaseEnv {
    /// 내장 이름만 가진 환경을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 사용자 상수를 추가하고 반영된 개수를 반환합니다.
    ///
    /// - 스칼라(문자열, 숫자, bool)는 같은 이름의 기존 상수를 덮어씁니다.
    /// - 맵은 같은 이름이 없을 때만 추가되며, 하위의 스칼라/맵만 유지됩니다.
    /// - 내장 이름, 배열, null은 건너뜁니다.
    pub fn add(&mut self, vars: &HashMap<String, serde_json::Value>) -> usize {
        let mut added = 0;
        for (name, value) in vars {
            if builtin(name).is_some() {
                tracing::warn!(name = %name, "cannot override built-in environment name, skipping");
                continue;
            }
            match value {
                serde_json::Value::Bool(_)
                | serde_json::Value::Number(_)
                | serde_json::Value::String(_) => {
                    self.constants.insert(name.clone(), Value::from(value));
                    added += 1;
                }
                serde_json::Value::Object(entries) => {
                    if self.constants.contains_key(name) {
                        continue;
                    }
                    self.constants
                        .insert(name.clone(), Value::Map(scalars_and_maps(entries)));
                    added += 1;
                }
                serde_json::Value::Array(_) | serde_json::Value::Null => {
                    tracing::warn!(name = %name, "unsupported environment value type, skipping");
                }
            }
        }
        added
    }

    /// 사용자 상수 조회
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    /// 사용자 상수 개수
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

fn scalars_and_maps(entries: &serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, Value> {
    entries
        .iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::Object(inner) => {
                Some((key.clone(), Value::Map(scalars_and_maps(inner))))
            }
            serde_json::Value::Bool(_)
            | serde_json::Value::Number(_)
            | serde_json::Value::String(_) => Some((key.clone(), Value::from(value))),
            serde_json::Value::Array(_) | serde_json::Value::Null => None,
        })
        .collect()
}

impl Bindings for BaseEnv {
    fn resolve(&self, name: &str) -> Option<Binding> {
        builtin(name)
            .map(Binding::Var)
            .or_else(|| self.constants.get(name).cloned().map(Binding::Const))
    }
}

// ─── 스냅샷 풀 ─────────────────────────────────────────────────────

/// 정규화된 태그/메타 사본
#[derive(Debug, Default)]
pub struct SnapshotMaps {
    tags: HashMap<String, String>,
    meta: HashMap<String, String>,
}

impl SnapshotMaps {
    fn clear(&mut self) {
        self.tags.clear();
        self.meta.clear();
    }

    fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.meta.is_empty()
    }
}

/// 스냅샷 맵의 lock-free 풀
///
/// 풀이 비어 있으면 새로 할당하고, 가득 차 있으면 반환된 맵을 버립니다.
#[derive(Debug)]
pub struct SnapshotPool {
    queue: ArrayQueue<SnapshotMaps>,
}

impl SnapshotPool {
    /// 최대 `capacity`개의 유휴 맵을 보관하는 풀을 생성합니다.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// 비어 있는 맵을 빌립니다.
    pub fn acquire(&self) -> PooledMaps<'_> {
        PooledMaps {
            maps: self.queue.pop().unwrap_or_default(),
            pool: self,
        }
    }

    /// 현재 유휴 상태인 맵 수
    pub fn idle(&self) -> usize {
        self.queue.len()
    }
}

impl Default for SnapshotPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

/// 풀에서 빌린 맵. drop 시 비워서 풀로 반환됩니다.
pub struct PooledMaps<'p> {
    maps: SnapshotMaps,
    pool: &'p SnapshotPool,
}

impl Deref for PooledMaps<'_> {
    type Target = SnapshotMaps;

    fn deref(&self) -> &Self::Target {
        &self.maps
    }
}

impl DerefMut for PooledMaps<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.maps
    }
}

impl Drop for PooledMaps<'_> {
    fn drop(&mut self) {
        let mut maps = std::mem::take(&mut self.maps);
        maps.clear();
        // 풀이 가득 찼으면 그냥 버린다
        let _ = self.pool.queue.push(maps);
    }
}

// ─── 평가 스냅샷 ───────────────────────────────────────────────────

/// 메시지 1건의 평가용 스냅샷
///
/// 입력 메시지를 빌려 읽기만 하므로 처리 도중 출력 메시지가 바뀌어도
/// 모든 조건은 처리 시작 시점의 값으로 평가됩니다.
pub struct Params<'a> {
    message: &'a Message,
    message_type: MessageType,
    maps: PooledMaps<'a>,
}

impl<'a> Params<'a> {
    /// 메시지로 스냅샷을 구성합니다.
    pub fn new(message: &'a Message, pool: &'a SnapshotPool) -> Self {
        let mut maps = pool.acquire();
        maps.tags.extend(
            message
                .tags()
                .iter()
                .map(|(k, v)| (sanitize_key(k).into_owned(), v.clone())),
        );
        maps.meta.extend(
            message
                .meta()
                .iter()
                .map(|(k, v)| (sanitize_key(k).into_owned(), v.clone())),
        );
        Self {
            message,
            message_type: message.message_type(),
            maps,
        }
    }

    /// 스냅샷의 메시지 종류
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    fn string_map(map: &HashMap<String, String>) -> Value {
        Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    fn fields_map(&self) -> Value {
        Value::Map(
            self.message
                .fields()
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v)))
                .collect(),
        )
    }

    fn message_map(&self) -> Value {
        Value::Map(BTreeMap::from([
            ("name".to_owned(), self.var(Var::Name)),
            ("type".to_owned(), self.var(Var::MessageType)),
            ("timestamp".to_owned(), self.var(Var::Timestamp)),
            ("tags".to_owned(), self.var(Var::Tags)),
            ("meta".to_owned(), self.var(Var::Meta)),
            ("fields".to_owned(), self.var(Var::Fields)),
        ]))
    }

    fn message_member(&self, key: &str) -> Value {
        match key {
            "name" => self.var(Var::Name),
            "type" | "messagetype" => self.var(Var::MessageType),
            "timestamp" | "time" => self.var(Var::Timestamp),
            "tags" | "tag" => self.var(Var::Tags),
            "meta" => self.var(Var::Meta),
            "fields" | "field" => self.var(Var::Fields),
            _ => Value::Nil,
        }
    }
}

impl Scope for Params<'_> {
    fn var(&self, var: Var) -> Value {
        match var {
            Var::Name => Value::String(self.message.name().to_owned()),
            Var::MessageType => Value::String(self.message_type.as_str().to_owned()),
            Var::Timestamp => Value::Int(self.message.time().timestamp()),
            Var::Field(key) => self
                .message
                .get_field(key)
                .map(Value::from)
                .unwrap_or(Value::Nil),
            Var::Fields => self.fields_map(),
            Var::Tags => Self::string_map(&self.maps.tags),
            Var::Meta => Self::string_map(&self.maps.meta),
            Var::Message => self.message_map(),
        }
    }

    fn member(&self, var: Var, key: &str) -> Option<Value> {
        let value = match var {
            Var::Tags => self.maps.tags.get(key).cloned().map(Value::String),
            Var::Meta => self.maps.meta.get(key).cloned().map(Value::String),
            Var::Fields => self.message.get_field(key).map(Value::from),
            Var::Message => Some(self.message_member(key)),
            _ => return None,
        };
        Some(value.unwrap_or(Value::Nil))
    }

    fn contains_key(&self, var: Var, key: &str) -> Option<bool> {
        match var {
            Var::Tags => Some(self.maps.tags.contains_key(key)),
            Var::Meta => Some(self.maps.meta.contains_key(key)),
            Var::Fields => Some(self.message.has_field(key)),
            _ => None,
        }
    }
}
