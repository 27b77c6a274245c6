//! 선언적 처리 규칙 설정
//!
//! JSON 또는 YAML 문서 하나로 처리기 전체를 구성합니다.
//! 알 수 없는 최상위 키는 무시하고, 해석에 실패하면 실패한 옵션 이름을 에러에 담습니다.
//!
//! ```json
//! {
//!   "stage_order": ["drop_by_name", "rename", "change_unit_prefix"],
//!   "drop_messages": ["load_five"],
//!   "rename_messages": {"net_bytes_in": "net_bytes_out"},
//!   "change_unit_prefix": {"name == 'net_bytes_in' && tags.type == 'node'": "M"},
//!   "add_tags_if": [{"if": "name == 'cpu_load'", "key": "cluster", "value": "alex"}]
//! }
//! ```
//!
//! 맵 형태 옵션(`rename_messages`, `rename_messages_if`, `change_unit_prefix`)은
//! 문서에 적힌 순서를 그대로 유지합니다.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ProcessorError;

/// 조건부 키/값 규칙 (`{"if": ..., "key": ..., "value": ...}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalKeyValue {
    /// 조건식
    #[serde(rename = "if")]
    pub condition: String,
    /// 대상 키
    pub key: String,
    /// 추가할 값 또는 이동 후 새 키. 삭제 규칙에서는 쓰지 않습니다.
    #[serde(default)]
    pub value: String,
}

impl ConditionalKeyValue {
    pub fn new(
        condition: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            condition: condition.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// 처리기 설정 문서
///
/// 빠진 옵션과 `null` 값은 기본값으로 채웁니다.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// 스테이지 실행 순서. 비어 있으면 기존 순서를 유지합니다.
    #[serde(deserialize_with = "nullable")]
    pub stage_order: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub drop_messages: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub drop_messages_if: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub drop_by_message_type: Vec<String>,
    /// 이름 -> 새 이름
    #[serde(deserialize_with = "ordered_pairs")]
    pub rename_messages: Vec<(String, String)>,
    /// 조건식 -> 새 이름
    #[serde(deserialize_with = "ordered_pairs")]
    pub rename_messages_if: Vec<(String, String)>,
    /// 조건식 -> 접두어 기호
    #[serde(deserialize_with = "ordered_pairs")]
    pub change_unit_prefix: Vec<(String, String)>,
    #[serde(deserialize_with = "nullable")]
    pub normalize_units: bool,
    #[serde(deserialize_with = "nullable")]
    pub add_tags_if: Vec<ConditionalKeyValue>,
    #[serde(deserialize_with = "nullable")]
    pub delete_tags_if: Vec<ConditionalKeyValue>,
    #[serde(deserialize_with = "nullable")]
    pub add_meta_if: Vec<ConditionalKeyValue>,
    #[serde(deserialize_with = "nullable")]
    pub delete_meta_if: Vec<ConditionalKeyValue>,
    #[serde(alias = "add_field_if", deserialize_with = "nullable")]
    pub add_fields_if: Vec<ConditionalKeyValue>,
    #[serde(alias = "delete_field_if", deserialize_with = "nullable")]
    pub delete_fields_if: Vec<ConditionalKeyValue>,
    #[serde(deserialize_with = "nullable")]
    pub move_tag_to_meta_if: Vec<ConditionalKeyValue>,
    #[serde(deserialize_with = "nullable")]
    pub move_tag_to_field_if: Vec<ConditionalKeyValue>,
    #[serde(deserialize_with = "nullable")]
    pub move_meta_to_tag_if: Vec<ConditionalKeyValue>,
    #[serde(deserialize_with = "nullable")]
    pub move_meta_to_field_if: Vec<ConditionalKeyValue>,
    #[serde(deserialize_with = "nullable")]
    pub move_field_to_tag_if: Vec<ConditionalKeyValue>,
    #[serde(deserialize_with = "nullable")]
    pub move_field_to_meta_if: Vec<ConditionalKeyValue>,
    /// 조건식에서 쓸 사용자 상수
    #[serde(deserialize_with = "nullable")]
    pub add_base_env: HashMap<String, serde_json::Value>,
}

impl ProcessorConfig {
    /// JSON 문서를 해석합니다.
    pub fn from_json(raw: &str) -> Result<Self, ProcessorError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| ProcessorError::ConfigParse {
                option: "<document>".to_owned(),
                reason: e.to_string(),
            })?;
        Self::from_value(value)
    }

    /// YAML 문서를 해석합니다.
    pub fn from_yaml(raw: &str) -> Result<Self, ProcessorError> {
        let value: serde_json::Value =
            serde_yaml::from_str(raw).map_err(|e| ProcessorError::ConfigParse {
                option: "<document>".to_owned(),
                reason: e.to_string(),
            })?;
        Self::from_value(value)
    }

    /// 이미 파싱된 문서를 해석합니다. 실패하면 원인이 된 옵션 이름을 찾아 에러에 담습니다.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProcessorError> {
        let serde_json::Value::Object(obj) = &value else {
            return Err(ProcessorError::ConfigParse {
                option: "<document>".to_owned(),
                reason: "expected an object at the top level".to_owned(),
            });
        };

        Self::deserialize(&value).map_err(|e| ProcessorError::ConfigParse {
            option: Self::failing_option(obj).unwrap_or_else(|| "<document>".to_owned()),
            reason: e.to_string(),
        })
    }

    /// 옵션을 하나씩 따로 해석해 처음 실패하는 키를 돌려줍니다.
    fn failing_option(obj: &serde_json::Map<String, serde_json::Value>) -> Option<String> {
        obj.iter().find_map(|(key, value)| {
            let single: serde_json::Map<_, _> =
                std::iter::once((key.clone(), value.clone())).collect();
            Self::deserialize(&serde_json::Value::Object(single))
                .is_err()
                .then(|| key.clone())
        })
    }

    /// 설정된 항목 수 (정규화 플래그 포함)
    pub fn entry_count(&self) -> usize {
        let kv_lists = [
            &self.add_tags_if,
            &self.delete_tags_if,
            &self.add_meta_if,
            &self.delete_meta_if,
            &self.add_fields_if,
            &self.delete_fields_if,
            &self.move_tag_to_meta_if,
            &self.move_tag_to_field_if,
            &self.move_meta_to_tag_if,
            &self.move_meta_to_field_if,
            &self.move_field_to_tag_if,
            &self.move_field_to_meta_if,
        ];
        self.drop_messages.len()
            + self.drop_messages_if.len()
            + self.drop_by_message_type.len()
            + self.rename_messages.len()
            + self.rename_messages_if.len()
            + self.change_unit_prefix.len()
            + usize::from(self.normalize_units)
            + kv_lists.iter().map(|list| list.len()).sum::<usize>()
    }
}

/// `null`을 기본값으로 읽습니다.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// 문자열 -> 문자열 맵을 문서 순서대로 읽습니다.
fn ordered_pairs<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PairsVisitor;

    impl<'de> Visitor<'de> for PairsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of strings")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, String>()? {
                pairs.push(entry);
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_any(PairsVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_options() {
        let raw = r#"{
            "stage_order": ["drop_by_name", "rename"],
            "drop_messages": ["load_five"],
            "drop_messages_if": ["name == 'x'"],
            "drop_by_message_type": ["log"],
            "rename_messages": {"b": "2", "a": "1"},
            "rename_messages_if": {"*": "renamed"},
            "change_unit_prefix": {"*": "M"},
            "normalize_units": true,
            "add_tags_if": [{"if": "*", "key": "cluster", "value": "alex"}],
            "delete_fields_if": [{"if": "*", "key": "extra"}],
            "move_meta_to_tag_if": [{"if": "*", "key": "unit", "value": "unit"}],
            "add_base_env": {"threshold": 10},
            "unknown_option": 42
        }"#;
        let config = ProcessorConfig::from_json(raw).unwrap();
        assert_eq!(config.stage_order, vec!["drop_by_name", "rename"]);
        assert_eq!(config.drop_messages, vec!["load_five"]);
        assert_eq!(config.drop_by_message_type, vec!["log"]);
        assert_eq!(
            config.rename_messages,
            vec![("b".to_owned(), "2".to_owned()), ("a".to_owned(), "1".to_owned())]
        );
        assert!(config.normalize_units);
        assert_eq!(
            config.add_tags_if,
            vec![ConditionalKeyValue::new("*", "cluster", "alex")]
        );
        assert_eq!(config.delete_fields_if[0].value, "");
        assert_eq!(config.add_base_env["threshold"], serde_json::json!(10));
        assert_eq!(config.entry_count(), 11);
    }

    #[test]
    fn singular_field_aliases_are_accepted() {
        let config = ProcessorConfig::from_json(
            r#"{"add_field_if": [{"if": "*", "key": "k", "value": "v"}],
                "delete_field_if": [{"if": "*", "key": "k"}]}"#,
        )
        .unwrap();
        assert_eq!(config.add_fields_if.len(), 1);
        assert_eq!(config.delete_fields_if.len(), 1);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(ProcessorConfig::from_json("{}").unwrap(), ProcessorConfig::default());
        let config = ProcessorConfig::from_json(r#"{"drop_messages": null}"#).unwrap();
        assert!(config.drop_messages.is_empty());
    }

    #[test]
    fn error_names_failing_option() {
        let err = ProcessorConfig::from_json(r#"{"drop_messages": "not-a-list"}"#).unwrap_err();
        assert!(matches!(err, ProcessorError::ConfigParse { ref option, .. } if option == "drop_messages"));

        let err = ProcessorConfig::from_json(r#"{"rename_messages": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, ProcessorError::ConfigParse { ref option, .. } if option == "rename_messages"));

        let err = ProcessorConfig::from_json(r#"{"add_tags_if": [{"key": "k"}]}"#).unwrap_err();
        assert!(err.to_string().contains("add_tags_if"));

        let err = ProcessorConfig::from_json(
            r#"{"drop_messages": ["ok"], "change_unit_prefix": ["M"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProcessorError::ConfigParse { ref option, .. } if option == "change_unit_prefix"));
    }

    #[test]
    fn null_options_fall_back_to_defaults() {
        let config = ProcessorConfig::from_json(
            r#"{"rename_messages": null, "normalize_units": null, "add_base_env": null}"#,
        )
        .unwrap();
        assert_eq!(config, ProcessorConfig::default());
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(ProcessorConfig::from_json("{").is_err());
        assert!(ProcessorConfig::from_json("[1, 2]").is_err());
        assert!(ProcessorConfig::from_yaml("- a\n- b\n").is_err());
    }

    #[test]
    fn parses_yaml() {
        let raw = "\
drop_messages:
  - load_five
change_unit_prefix:
  \"name == 'net_bytes_in'\": M
move_tag_to_meta_if:
  - if: \"*\"
    key: type-id
    value: typeid
";
        let config = ProcessorConfig::from_yaml(raw).unwrap();
        assert_eq!(config.drop_messages, vec!["load_five"]);
        assert_eq!(
            config.change_unit_prefix,
            vec![("name == 'net_bytes_in'".to_owned(), "M".to_owned())]
        );
        assert_eq!(
            config.move_tag_to_meta_if,
            vec![ConditionalKeyValue::new("*", "type-id", "typeid")]
        );
    }
}
