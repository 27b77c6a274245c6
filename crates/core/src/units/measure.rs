//! 측정량 (Bytes, Watt, Percentage ...) 과 문자열 인식 정규식

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// 단위가 표현하는 물리량 종류
///
/// [`Measure::Invalid`]는 어떤 정규식과도 일치하지 않은 경우입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    Invalid,
    Bytes,
    Flops,
    Percentage,
    TemperatureC,
    TemperatureF,
    Rotation,
    Hertz,
    Time,
    Watt,
    Joule,
    Cycles,
    Requests,
    Packets,
    Events,
}

/// 인식 순서대로 나열한 (측정량, 패턴) 표
///
/// 모든 패턴은 문자열 전체와 일치해야 합니다. `bits`처럼 앞부분만 같은 이름은 거부됩니다.
const MEASURE_PATTERNS: [(Measure, &str); 14] = [
    (Measure::Bytes, r"^([bB][yY]?[tT]?[eE]?[sS]?)$"),
    (Measure::Flops, r"^([fF][lL]?[oO]?[pP]?[sS]?)$"),
    (Measure::Percentage, r"^(%|[pP]ercent)$"),
    (Measure::TemperatureC, r"^(deg[Cc]|°[cC])$"),
    (Measure::TemperatureF, r"^(deg[fF]|°[fF])$"),
    (Measure::Rotation, r"^([rR][pP][mM])$"),
    (Measure::Hertz, r"^([hH][eE]?[rR]?[tT]?[zZ])$"),
    (Measure::Time, r"^([sS][eE]?[cC]?[oO]?[nN]?[dD]?[sS]?)$"),
    (Measure::Cycles, r"^([cC][yY][cC]?[lL]?[eE]?[sS]?)$"),
    (Measure::Watt, r"^([wW][aA]?[tT]?[tT]?[sS]?)$"),
    (Measure::Joule, r"^([jJ][oO]?[uU]?[lL]?[eE]?[sS]?)$"),
    (Measure::Requests, r"^([rR][eE][qQ][uU]?[eE]?[sS]?[tT]?[sS]?)$"),
    (Measure::Packets, r"^([pP][aA]?[cC]?[kK][eE]?[tT][sS]?)$"),
    (Measure::Events, r"^([eE][vV]?[eE]?[nN]?[tT][sS]?)$"),
];

static MEASURE_REGEXES: LazyLock<Vec<(Measure, Regex)>> = LazyLock::new(|| {
    MEASURE_PATTERNS
        .iter()
        .filter_map(|(measure, pattern)| Regex::new(pattern).ok().map(|re| (*measure, re)))
        .collect()
});

impl Measure {
    /// 문자열을 측정량으로 해석합니다. 일치하는 패턴이 없으면 [`Measure::Invalid`].
    pub fn parse(raw: &str) -> Self {
        MEASURE_REGEXES
            .iter()
            .find(|(_, re)| re.is_match(raw))
            .map(|(measure, _)| *measure)
            .unwrap_or(Self::Invalid)
    }

    /// 유효한 측정량인지 여부
    pub fn is_valid(self) -> bool {
        self != Self::Invalid
    }

    /// 정규화된 짧은 표기
    pub fn short(self) -> &'static str {
        match self {
            Self::Invalid => "",
            Self::Bytes => "B",
            Self::Flops => "F",
            Self::Percentage => "%",
            Self::TemperatureC => "degC",
            Self::TemperatureF => "degF",
            Self::Rotation => "RPM",
            Self::Hertz => "Hz",
            Self::Time => "s",
            Self::Watt => "W",
            Self::Joule => "J",
            Self::Cycles => "cyc",
            Self::Requests => "requests",
            Self::Packets => "packets",
            Self::Events => "events",
        }
    }

    /// 사람이 읽기 쉬운 긴 표기
    pub fn long(self) -> &'static str {
        match self {
            Self::Invalid => "Unknown",
            Self::Bytes => "Bytes",
            Self::Flops => "Flops",
            Self::Percentage => "Percent",
            Self::TemperatureC => "DegreeC",
            Self::TemperatureF => "DegreeF",
            Self::Rotation => "RPM",
            Self::Hertz => "Hertz",
            Self::Time => "Seconds",
            Self::Watt => "Watts",
            Self::Joule => "Joules",
            Self::Cycles => "Cycles",
            Self::Requests => "Requests",
            Self::Packets => "Packets",
            Self::Events => "Events",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long())
    }
}
