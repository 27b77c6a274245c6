//! 규칙 파일 로더 -- JSON/YAML 처리 규칙 파일을 디스크에서 로드합니다.
//!
//! 확장자로 형식을 고릅니다. `.json`은 JSON, `.yaml`/`.yml`은 YAML.

use std::path::Path;

use crate::config::ProcessorConfig;
use crate::error::ProcessorError;

/// 규칙 파일 최대 크기
const MAX_RULE_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// 규칙 파일 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Json,
    Yaml,
}

impl RuleFormat {
    /// 파일 확장자로 형식을 추정합니다.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// 문서를 해석합니다.
    pub fn parse(self, raw: &str) -> Result<ProcessorConfig, ProcessorError> {
        match self {
            Self::Json => ProcessorConfig::from_json(raw),
            Self::Yaml => ProcessorConfig::from_yaml(raw),
        }
    }
}

/// 처리 규칙 파일 로더
pub struct ConfigLoader;

impl ConfigLoader {
    /// 단일 규칙 파일을 로드합니다.
    ///
    /// # Errors
    /// - 파일을 읽을 수 없거나 크기 제한을 넘는 경우
    /// - 확장자를 알 수 없는 경우
    /// - 문서 해석에 실패한 경우 (실패한 옵션 이름 포함)
    pub async fn load_file(path: impl AsRef<Path>) -> Result<ProcessorConfig, ProcessorError> {
        let path = path.as_ref();

        let format = RuleFormat::from_path(path).ok_or_else(|| ProcessorError::Load {
            path: path.display().to_string(),
            reason: "unsupported file extension, expected .json, .yaml or .yml".to_owned(),
        })?;

        // 파일 크기 검증
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ProcessorError::Load {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(ProcessorError::Load {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProcessorError::Load {
                path: path.display().to_string(),
                reason: format!("failed to read file: {e}"),
            })?;

        let config = format.parse(&content).map_err(|e| ProcessorError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!(
            path = %path.display(),
            entries = config.entry_count(),
            "loaded processor rules"
        );

        Ok(config)
    }
}
