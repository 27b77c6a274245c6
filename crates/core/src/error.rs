//! 에러 타입 -- 도메인별 에러 정의

/// Ironmetric 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum IronmetricError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 단위 변환 에러
    #[error("unit error: {0}")]
    Unit(#[from] UnitError),

    /// 메시지 처리기 설정/처리 에러
    #[error("processor error: {0}")]
    Processor(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 단위 변환 에러
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    /// 입력/출력 단위의 측정량이 호환되지 않음
    #[error("invalid measures in in and out unit: '{input}' -> '{output}'")]
    InvalidMeasures { input: String, output: String },

    /// 해석할 수 없는 단위 문자열
    #[error("invalid unit '{0}'")]
    InvalidUnit(String),

    /// 해석할 수 없는 접두어
    #[error("invalid unit prefix '{0}'")]
    InvalidPrefix(String),
}
