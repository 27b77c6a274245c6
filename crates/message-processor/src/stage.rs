//! 처리 스테이지 어휘
//!
//! 스테이지 이름은 설정 파일의 `stage_order`에서 그대로 사용됩니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 메시지 처리 스테이지
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DropByName,
    DropByType,
    DropIf,
    AddTag,
    DeleteTag,
    MoveTagToMeta,
    #[serde(rename = "move_tag_to_fields")]
    MoveTagToFields,
    AddMeta,
    DeleteMeta,
    #[serde(rename = "move_meta_to_tags")]
    MoveMetaToTags,
    #[serde(rename = "move_meta_to_fields")]
    MoveMetaToFields,
    AddField,
    DeleteField,
    #[serde(rename = "move_field_to_tags")]
    MoveFieldToTags,
    MoveFieldToMeta,
    #[serde(rename = "rename")]
    RenameByName,
    RenameIf,
    ChangeUnitPrefix,
    NormalizeUnit,
}

impl Stage {
    /// 기본 실행 순서
    pub const ALL: [Stage; 19] = [
        Stage::DropByName,
        Stage::DropByType,
        Stage::DropIf,
        Stage::AddTag,
        Stage::DeleteTag,
        Stage::MoveTagToMeta,
        Stage::MoveTagToFields,
        Stage::AddMeta,
        Stage::DeleteMeta,
        Stage::MoveMetaToTags,
        Stage::MoveMetaToFields,
        Stage::AddField,
        Stage::DeleteField,
        Stage::MoveFieldToTags,
        Stage::MoveFieldToMeta,
        Stage::RenameByName,
        Stage::RenameIf,
        Stage::ChangeUnitPrefix,
        Stage::NormalizeUnit,
    ];

    /// 설정 파일에서 쓰는 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DropByName => "drop_by_name",
            Self::DropByType => "drop_by_type",
            Self::DropIf => "drop_if",
            Self::AddTag => "add_tag",
            Self::DeleteTag => "delete_tag",
            Self::MoveTagToMeta => "move_tag_to_meta",
            Self::MoveTagToFields => "move_tag_to_fields",
            Self::AddMeta => "add_meta",
            Self::DeleteMeta => "delete_meta",
            Self::MoveMetaToTags => "move_meta_to_tags",
            Self::MoveMetaToFields => "move_meta_to_fields",
            Self::AddField => "add_field",
            Self::DeleteField => "delete_field",
            Self::MoveFieldToTags => "move_field_to_tags",
            Self::MoveFieldToMeta => "move_field_to_meta",
            Self::RenameByName => "rename",
            Self::RenameIf => "rename_if",
            Self::ChangeUnitPrefix => "change_unit_prefix",
            Self::NormalizeUnit => "normalize_unit",
        }
    }

    /// 조건식 규칙 집합을 사용하는 스테이지인지 여부
    pub fn is_conditional(self) -> bool {
        !matches!(
            self,
            Self::DropByName | Self::DropByType | Self::RenameByName | Self::NormalizeUnit
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>(), Ok(stage));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!("explode".parse::<Stage>(), Err("explode".to_owned()));
        assert!("Drop_By_Name".parse::<Stage>().is_err());
    }

    #[test]
    fn serde_names_match_config_names() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }

    #[test]
    fn canonical_order_starts_with_drops_and_ends_with_units() {
        assert_eq!(Stage::ALL[0], Stage::DropByName);
        assert_eq!(Stage::ALL[2], Stage::DropIf);
        assert_eq!(Stage::ALL[18], Stage::NormalizeUnit);
    }

    #[test]
    fn conditional_stages() {
        assert!(Stage::DropIf.is_conditional());
        assert!(Stage::MoveFieldToMeta.is_conditional());
        assert!(!Stage::RenameByName.is_conditional());
        assert!(!Stage::NormalizeUnit.is_conditional());
    }
}
