//! 물리 단위 파싱 및 변환
//!
//! 자유 형식 단위 문자열(`"MBytes/s"`, `"kb"`, `"°C"`)을
//! `{prefix, measure, divisor}` 삼중항인 [`Unit`]으로 정규화하고,
//! 단위 사이의 변환 배율을 계산합니다.
//!
//! # 파싱 규칙
//! 1. 접두어 정규식으로 접두어 토큰과 나머지를 분리
//! 2. 나머지를 `/`로 나눠 분자/분모 측정량을 해석
//! 3. 접두어 추정이 실패하면 전체 문자열을 접두어 없이 재해석
//!    (`packets`/`events`/`percent`의 첫 글자가 접두어처럼 보이는 경우)
//! 4. 측정량별 접두어 보정 표 적용 ([`PrefixPolicy`])
//!
//! # 사용 예시
//! ```
//! use ironmetric_core::units::{Unit, get_unit_prefix_factor};
//!
//! let input = Unit::parse("Byte");
//! let output = Unit::parse("MB");
//! let conversion = get_unit_prefix_factor(&input, &output).unwrap();
//! assert_eq!(conversion.apply(1024.0), 0.001024);
//! assert_eq!(output.short(), "MB");
//! ```

mod measure;
mod prefix;

pub use measure::Measure;
pub use prefix::{Prefix, get_prefix_factor};

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::UnitError;

static PREFIX_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^([kKmMgGtTpPeEun]?i?)(.*)").ok());

/// 측정량별 접두어 보정 규칙
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixPolicy {
    /// 접두어를 그대로 사용
    Keep,
    /// Milli는 실제로 쓰이지 않으므로 소문자로 입력된 Mega로 해석
    MilliMeansMega,
    /// 접두어를 버리고 Base로 고정
    NoPrefix,
}

const PREFIX_POLICIES: [(Measure, PrefixPolicy); 7] = [
    (Measure::Bytes, PrefixPolicy::MilliMeansMega),
    (Measure::Flops, PrefixPolicy::MilliMeansMega),
    (Measure::Packets, PrefixPolicy::MilliMeansMega),
    (Measure::Events, PrefixPolicy::MilliMeansMega),
    (Measure::Cycles, PrefixPolicy::MilliMeansMega),
    (Measure::Requests, PrefixPolicy::MilliMeansMega),
    (Measure::Percentage, PrefixPolicy::NoPrefix),
];

impl PrefixPolicy {
    /// 측정량에 적용되는 보정 규칙을 조회합니다.
    pub fn for_measure(measure: Measure) -> Self {
        PREFIX_POLICIES
            .iter()
            .find(|(m, _)| *m == measure)
            .map(|(_, policy)| *policy)
            .unwrap_or(Self::Keep)
    }

    /// 감지된 접두어를 보정합니다.
    pub fn apply(self, prefix: Prefix) -> Prefix {
        match (self, prefix) {
            (Self::MilliMeansMega, Prefix::Milli) => Prefix::Mega,
            (Self::NoPrefix, _) => Prefix::Base,
            (_, prefix) => prefix,
        }
    }
}

/// 파싱된 물리 단위
///
/// `measure`가 [`Measure::Invalid`]가 아닐 때만 유효합니다.
/// 변환 시에는 `measure`와 `divisor`가 같아야 하며 접두어는 달라도 됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Unit {
    pub prefix: Prefix,
    pub measure: Measure,
    /// 비율 단위의 분모 측정량 (`Bytes/s` 의 `s`)
    pub divisor: Option<Measure>,
}

impl Unit {
    /// 유효하지 않은 단위
    pub const INVALID: Unit = Unit {
        prefix: Prefix::Base,
        measure: Measure::Invalid,
        divisor: None,
    };

    /// 단위 문자열을 해석합니다. 해석할 수 없으면 유효하지 않은 단위를 반환합니다.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (token, rest) = split_prefix(raw);

        if let Some(prefix) = Prefix::from_symbol(token) {
            let unit = Self::resolve(prefix, rest);
            if unit.is_valid() || prefix == Prefix::Base {
                return unit;
            }
        }

        // 접두어 추정 실패: 첫 글자도 측정량 이름의 일부로 본다
        Self::resolve(Prefix::Base, raw)
    }

    fn resolve(prefix: Prefix, rest: &str) -> Self {
        let (numerator, denominator) = match rest.split_once('/') {
            Some((num, den)) => (num, Some(den)),
            None => (rest, None),
        };

        let measure = Measure::parse(numerator);
        if !measure.is_valid() {
            return Self::INVALID;
        }

        let divisor = match denominator {
            Some(den) => {
                let div = Measure::parse(den);
                if !div.is_valid() {
                    return Self::INVALID;
                }
                Some(div)
            }
            None => None,
        };

        Self {
            prefix: PrefixPolicy::for_measure(measure).apply(prefix),
            measure,
            divisor,
        }
    }

    /// 유효한 단위인지 여부
    pub fn is_valid(&self) -> bool {
        self.measure.is_valid()
    }

    /// 접두어만 바꾼 단위를 반환합니다. 측정량별 보정 규칙이 적용됩니다.
    pub fn with_prefix(&self, prefix: Prefix) -> Self {
        let prefix = match PrefixPolicy::for_measure(self.measure) {
            PrefixPolicy::NoPrefix => Prefix::Base,
            _ => prefix,
        };
        Self { prefix, ..*self }
    }

    /// 정규화된 짧은 표기 (`MB`, `KiB/s`, `degC`)
    pub fn short(&self) -> String {
        if !self.is_valid() {
            return String::new();
        }
        match self.divisor {
            Some(div) => format!(
                "{}{}/{}",
                self.prefix.symbol(),
                self.measure.short(),
                div.short()
            ),
            None => format!("{}{}", self.prefix.symbol(), self.measure.short()),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.divisor {
            Some(div) => write!(f, "{}{}/{}", self.prefix, self.measure, div),
            None => write!(f, "{}{}", self.prefix, self.measure),
        }
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = Self::parse(s);
        if unit.is_valid() {
            Ok(unit)
        } else {
            Err(UnitError::InvalidUnit(s.to_owned()))
        }
    }
}

fn split_prefix(raw: &str) -> (&str, &str) {
    let Some(re) = PREFIX_REGEX.as_ref() else {
        return ("", raw);
    };
    match re.captures(raw) {
        Some(caps) => {
            let token = caps.get(1).map_or("", |m| m.as_str());
            let rest = caps.get(2).map_or("", |m| m.as_str());
            (token, rest)
        }
        None => ("", raw),
    }
}

/// 단위 변환 함수
///
/// 대부분은 상수 배율이지만 온도(섭씨/화씨)는 아핀 변환입니다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// 상수 배율
    Scale(f64),
    /// `f = c * 1.8 + 32`
    CelsiusToFahrenheit,
    /// `c = (f - 32) / 1.8`
    FahrenheitToCelsius,
}

impl Conversion {
    /// 값을 변환합니다.
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Self::Scale(factor) => value * factor,
            Self::CelsiusToFahrenheit => value * 1.8 + 32.0,
            Self::FahrenheitToCelsius => (value - 32.0) / 1.8,
        }
    }
}

/// 입력 단위에서 출력 단위로의 변환을 계산합니다.
///
/// # Errors
/// 측정량이나 분모 측정량이 다르거나 단위가 유효하지 않으면
/// [`UnitError::InvalidMeasures`]를 반환합니다.
pub fn get_unit_prefix_factor(input: &Unit, output: &Unit) -> Result<Conversion, UnitError> {
    match (input.measure, output.measure) {
        (Measure::TemperatureC, Measure::TemperatureF) => Ok(Conversion::CelsiusToFahrenheit),
        (Measure::TemperatureF, Measure::TemperatureC) => Ok(Conversion::FahrenheitToCelsius),
        _ if !input.is_valid()
            || input.measure != output.measure
            || input.divisor != output.divisor =>
        {
            Err(UnitError::InvalidMeasures {
                input: input.to_string(),
                output: output.to_string(),
            })
        }
        _ => Ok(Conversion::Scale(get_prefix_factor(
            input.prefix,
            output.prefix,
        ))),
    }
}
