//! 텔레메트리 메시지 데이터 모델
//!
//! [`Message`]는 하나의 관측값(metric, event, log, control)을 표현합니다.
//! 이름, 식별용 태그, 설명용 메타, 페이로드 필드, 타임스탬프로 구성되며
//! 메시지 종류는 예약된 필드 키(`value`, `event`, `control`, `log`)로 결정됩니다.
//!
//! # 사용 예시
//! ```
//! use std::collections::HashMap;
//! use chrono::Utc;
//! use ironmetric_core::message::{Message, MessageType};
//!
//! let tags = HashMap::from([("type".to_owned(), "node".to_owned())]);
//! let meta = HashMap::from([("unit".to_owned(), "Byte".to_owned())]);
//! let msg = Message::new_metric("net_bytes_in", tags, meta, 1024.0, Utc::now());
//!
//! assert_eq!(msg.message_type(), MessageType::Metric);
//! assert_eq!(msg.get_meta("unit"), Some("Byte"));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 메시지 종류를 결정하는 예약 필드 키 (분류 우선순위 순)
pub const RESERVED_FIELDS: [&str; 4] = ["value", "event", "control", "log"];

/// 예약 필드 키인지 확인합니다.
pub fn is_reserved_field(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// 필드 값
///
/// JSON 입력의 정수는 `Int`, `i64` 범위를 넘는 양수는 `UInt`,
/// 소수는 `Float`로 정규화됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl FieldValue {
    /// NaN/무한대 부동소수가 아니면 `true`. 숫자가 아닌 값도 `true`입니다.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(x) => x.is_finite(),
            _ => true,
        }
    }

    /// 숫자 값이면 `f64`로 반환합니다.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bool(_) | Self::String(_) => None,
        }
    }

    /// 문자열 값이면 참조를 반환합니다.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// 숫자 값인지 여부
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

/// 예약 필드로 분류한 메시지 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Metric,
    Event,
    Control,
    Log,
    Unknown,
}

impl MessageType {
    /// 소문자 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Event => "event",
            Self::Control => "control",
            Self::Log => "log",
            Self::Unknown => "unknown",
        }
    }

    /// 분류 가능한 종류 이름을 해석합니다. `unknown`은 허용하지 않습니다.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "metric" => Some(Self::Metric),
            "event" => Some(Self::Event),
            "control" => Some(Self::Control),
            "log" => Some(Self::Log),
            _ => None,
        }
    }

    /// 이 종류를 결정하는 예약 필드 키
    pub fn reserved_field(self) -> Option<&'static str> {
        match self {
            Self::Metric => Some("value"),
            Self::Event => Some("event"),
            Self::Control => Some("control"),
            Self::Log => Some("log"),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 텔레메트리 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    name: String,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    meta: HashMap<String, String>,
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
}

impl Message {
    /// 모든 구성요소를 지정해 메시지를 생성합니다.
    pub fn new(
        name: impl Into<String>,
        tags: HashMap<String, String>,
        meta: HashMap<String, String>,
        fields: HashMap<String, FieldValue>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            tags,
            meta,
            fields,
            timestamp,
        }
    }

    /// `value` 필드를 가진 metric 메시지를 생성합니다.
    pub fn new_metric(
        name: impl Into<String>,
        tags: HashMap<String, String>,
        meta: HashMap<String, String>,
        value: impl Into<FieldValue>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let fields = HashMap::from([("value".to_owned(), value.into())]);
        Self::new(name, tags, meta, fields, timestamp)
    }

    /// `event` 필드를 가진 event 메시지를 생성합니다.
    pub fn new_event(
        name: impl Into<String>,
        tags: HashMap<String, String>,
        meta: HashMap<String, String>,
        event: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let fields = HashMap::from([("event".to_owned(), FieldValue::String(event.into()))]);
        Self::new(name, tags, meta, fields, timestamp)
    }

    /// `log` 필드를 가진 log 메시지를 생성합니다.
    pub fn new_log(
        name: impl Into<String>,
        tags: HashMap<String, String>,
        meta: HashMap<String, String>,
        log: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let fields = HashMap::from([("log".to_owned(), FieldValue::String(log.into()))]);
        Self::new(name, tags, meta, fields, timestamp)
    }

    /// `control` 필드를 가진 control 메시지를 생성합니다.
    pub fn new_control(
        name: impl Into<String>,
        tags: HashMap<String, String>,
        meta: HashMap<String, String>,
        control: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let fields = HashMap::from([(
            "control".to_owned(),
            FieldValue::String(control.into()),
        )]);
        Self::new(name, tags, meta, fields, timestamp)
    }

    /// 비어 있는 메시지 (조건식 환경의 자리표시자)
    pub fn empty() -> Self {
        Self::new(
            "",
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn set_time(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }

    pub fn meta(&self) -> &HashMap<String, String> {
        &self.meta
    }

    pub fn fields(&self) -> &HashMap<String, FieldValue> {
        &self.fields
    }

    // --- tags ---

    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn remove_tag(&mut self, key: &str) -> Option<String> {
        self.tags.remove(key)
    }

    // --- meta ---

    pub fn add_meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.meta.insert(key.into(), value.into());
    }

    pub fn get_meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    pub fn has_meta(&self, key: &str) -> bool {
        self.meta.contains_key(key)
    }

    pub fn remove_meta(&mut self, key: &str) -> Option<String> {
        self.meta.remove(key)
    }

    // --- fields ---

    pub fn add_field(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get_field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn remove_field(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    /// 예약 필드로 메시지 종류를 분류합니다.
    ///
    /// `value`, `event`, `control`, `log` 순으로 검사하며
    /// 어느 것도 없으면 [`MessageType::Unknown`]입니다.
    pub fn message_type(&self) -> MessageType {
        if self.fields.contains_key("value") {
            MessageType::Metric
        } else if self.fields.contains_key("event") {
            MessageType::Event
        } else if self.fields.contains_key("control") {
            MessageType::Control
        } else if self.fields.contains_key("log") {
            MessageType::Log
        } else {
            MessageType::Unknown
        }
    }

    /// InfluxDB line protocol 한 줄로 직렬화합니다.
    ///
    /// `meta_as_tags`에 나열된 메타 키는 태그로 함께 출력됩니다.
    /// 태그와 필드는 키 순서로 정렬되며 타임스탬프는 나노초 단위입니다.
    /// NaN과 무한대 값은 건너뛰며, 쓸 수 있는 필드가 하나도 없으면 `None`.
    pub fn to_line_protocol<S: AsRef<str>>(&self, meta_as_tags: &[S]) -> Option<String> {
        let mut tags: BTreeMap<&str, &str> = self
            .tags
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        for key in meta_as_tags {
            if let Some((k, v)) = self.meta.get_key_value(key.as_ref()) {
                tags.insert(k.as_str(), v.as_str());
            }
        }

        let mut line = escape(&self.name, &[',', ' ']);
        for (k, v) in &tags {
            line.push(',');
            line.push_str(&escape(k, &[',', '=', ' ']));
            line.push('=');
            line.push_str(&escape(v, &[',', '=', ' ']));
        }

        let fields: BTreeMap<&String, &FieldValue> = self
            .fields
            .iter()
            .filter(|(_, v)| v.is_finite())
            .collect();
        if fields.is_empty() {
            return None;
        }
        for (idx, (k, v)) in fields.into_iter().enumerate() {
            line.push(if idx == 0 { ' ' } else { ',' });
            line.push_str(&escape(k, &[',', '=', ' ']));
            line.push('=');
            match v {
                FieldValue::Int(i) => line.push_str(&format!("{i}i")),
                FieldValue::UInt(u) => line.push_str(&format!("{u}u")),
                FieldValue::Float(x) => line.push_str(&format!("{x}")),
                FieldValue::Bool(b) => line.push_str(if *b { "true" } else { "false" }),
                FieldValue::String(s) => {
                    line.push('"');
                    line.push_str(&escape(s, &['"']));
                    line.push('"');
                }
            }
        }

        line.push(' ');
        line.push_str(&self.timestamp.timestamp_nanos_opt().unwrap_or_default().to_string());
        Some(line)
    }

    /// NaN이나 무한대 값을 가진 필드를 지우고 지운 키를 반환합니다.
    pub fn remove_non_finite_fields(&mut self) -> Vec<String> {
        let mut removed = Vec::new();
        self.fields.retain(|key, value| {
            let keep = value.is_finite();
            if !keep {
                removed.push(key.clone());
            }
            keep
        });
        removed.sort();
        removed
    }
}

fn escape(raw: &str, specials: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '\\' || specials.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: BTreeMap<_, _> = self.tags.iter().collect();
        let meta: BTreeMap<_, _> = self.meta.iter().collect();
        let fields: BTreeMap<_, _> = self.fields.iter().collect();
        write!(
            f,
            "Name: {}, Tags: {:?}, Meta: {:?}, Fields: {:?}, Timestamp: {}",
            self.name,
            tags,
            meta,
            fields,
            self.timestamp.timestamp_nanos_opt().unwrap_or_default()
        )
    }
}
