//! 설정 관리 -- ironmetric.toml 파싱 및 런타임 설정
//!
//! [`IronmetricConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//! 메시지 처리 규칙 자체는 별도의 JSON/YAML 규칙 파일에 두고,
//! 여기서는 그 파일의 경로와 처리 결과를 다루는 방식을 정합니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`IRONMETRIC_PROCESSOR_RULES_PATH=/etc/rules.json` 형식)
//! 3. 설정 파일 (`ironmetric.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ironmetric_core::error::IronmetricError> {
//! use ironmetric_core::config::IronmetricConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = IronmetricConfig::load("ironmetric.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = IronmetricConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, IronmetricError};

/// Ironmetric 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IronmetricConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 메시지 처리기 설정
    #[serde(default)]
    pub processor: ProcessorSettings,
}

impl IronmetricConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IronmetricError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IronmetricError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IronmetricError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                IronmetricError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, IronmetricError> {
        toml::from_str(toml_str).map_err(|e| {
            IronmetricError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `IRONMETRIC_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "IRONMETRIC_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "IRONMETRIC_GENERAL_LOG_FORMAT");

        // Processor
        override_string(
            &mut self.processor.rules_path,
            "IRONMETRIC_PROCESSOR_RULES_PATH",
        );
        override_csv(
            &mut self.processor.meta_as_tags,
            "IRONMETRIC_PROCESSOR_META_AS_TAGS",
        );
        override_string(&mut self.processor.on_error, "IRONMETRIC_PROCESSOR_ON_ERROR");
        override_parsed(
            &mut self.processor.normalize_units,
            "IRONMETRIC_PROCESSOR_NORMALIZE_UNITS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IronmetricError> {
        one_of(
            "general.log_level",
            &self.general.log_level,
            &["trace", "debug", "info", "warn", "error"],
        )?;
        one_of("general.log_format", &self.general.log_format, &["json", "pretty"])?;
        one_of("processor.on_error", &self.processor.on_error, &["forward", "drop"])?;

        if let Some(key) = self.processor.meta_as_tags.iter().find(|k| k.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "processor.meta_as_tags".to_owned(),
                reason: format!("meta key must not be empty (got {key:?})"),
            }
            .into());
        }

        Ok(())
    }
}

/// 허용 목록에 없는 값이면 어느 필드인지 담아 거부합니다.
fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: format!("must be one of: {} (got {value:?})", allowed.join(", ")),
    })
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 메시지 처리기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorSettings {
    /// 처리 규칙 파일 경로 (`.json`, `.yaml`, `.yml`). 비어 있으면 규칙 없음
    pub rules_path: String,
    /// line protocol 출력 시 태그로 승격할 메타 키
    pub meta_as_tags: Vec<String>,
    /// 평가 에러가 난 메시지 처리 방식 (forward, drop)
    pub on_error: String,
    /// 규칙 파일과 별개로 단위 정규화를 강제
    pub normalize_units: bool,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            rules_path: String::new(),
            meta_as_tags: Vec::new(),
            on_error: "forward".to_owned(),
            normalize_units: false,
        }
    }
}

impl ProcessorSettings {
    /// 평가 에러가 난 메시지를 부분 처리된 상태로 전달할지 여부
    pub fn forward_on_error(&self) -> bool {
        self.on_error == "forward"
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

/// 해석에 실패한 값은 경고만 남기고 기존 값을 유지합니다.
fn override_parsed<T: FromStr>(target: &mut T, env_key: &str) {
    let Ok(val) = std::env::var(env_key) else {
        return;
    };
    match val.trim().parse::<T>() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!(
            env_key,
            value = val.as_str(),
            expected = std::any::type_name::<T>(),
            "ignoring unparsable env override"
        ),
    }
}

/// 쉼표 구분 목록. 빈 항목은 버립니다.
fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect();
    }
}
