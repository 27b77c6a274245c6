//! 단위 접두어 (Kilo, Mebi, Milli ...)

use std::fmt;

/// 측정량에 곱해지는 배율 접두어
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    Base,
    Kilo,
    Mega,
    Giga,
    Tera,
    Peta,
    Exa,
    Milli,
    Micro,
    Nano,
    Kibi,
    Mebi,
    Gibi,
    Tebi,
}

impl Prefix {
    /// 모든 접두어 (표 기반 테스트용)
    pub const ALL: [Prefix; 14] = [
        Prefix::Base,
        Prefix::Kilo,
        Prefix::Mega,
        Prefix::Giga,
        Prefix::Tera,
        Prefix::Peta,
        Prefix::Exa,
        Prefix::Milli,
        Prefix::Micro,
        Prefix::Nano,
        Prefix::Kibi,
        Prefix::Mebi,
        Prefix::Gibi,
        Prefix::Tebi,
    ];

    /// 접두어 토큰을 해석합니다. 알 수 없는 토큰이면 `None`.
    ///
    /// 빈 문자열은 [`Prefix::Base`]입니다.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let prefix = match symbol {
            "" => Self::Base,
            "k" | "K" => Self::Kilo,
            "m" => Self::Milli,
            "M" => Self::Mega,
            "g" | "G" => Self::Giga,
            "t" | "T" => Self::Tera,
            "p" | "P" => Self::Peta,
            "e" | "E" => Self::Exa,
            "u" => Self::Micro,
            "n" => Self::Nano,
            "ki" | "Ki" => Self::Kibi,
            "Mi" => Self::Mebi,
            "gi" | "Gi" => Self::Gibi,
            "Ti" => Self::Tebi,
            _ => return None,
        };
        Some(prefix)
    }

    /// 수치 배율
    pub fn factor(self) -> f64 {
        match self {
            Self::Base => 1.0,
            Self::Kilo => 1e3,
            Self::Mega => 1e6,
            Self::Giga => 1e9,
            Self::Tera => 1e12,
            Self::Peta => 1e15,
            Self::Exa => 1e18,
            Self::Milli => 1e-3,
            Self::Micro => 1e-6,
            Self::Nano => 1e-9,
            Self::Kibi => 1024.0,
            Self::Mebi => 1024.0 * 1024.0,
            Self::Gibi => 1024.0 * 1024.0 * 1024.0,
            Self::Tebi => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        }
    }

    /// 짧은 표기 (`K`, `Mi`, `m` ...)
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Base => "",
            Self::Kilo => "K",
            Self::Mega => "M",
            Self::Giga => "G",
            Self::Tera => "T",
            Self::Peta => "P",
            Self::Exa => "E",
            Self::Milli => "m",
            Self::Micro => "u",
            Self::Nano => "n",
            Self::Kibi => "Ki",
            Self::Mebi => "Mi",
            Self::Gibi => "Gi",
            Self::Tebi => "Ti",
        }
    }

    /// 긴 표기 (`Kilo`, `Mebi` ...)
    pub fn name(self) -> &'static str {
        match self {
            Self::Base => "",
            Self::Kilo => "Kilo",
            Self::Mega => "Mega",
            Self::Giga => "Giga",
            Self::Tera => "Tera",
            Self::Peta => "Peta",
            Self::Exa => "Exa",
            Self::Milli => "Milli",
            Self::Micro => "Micro",
            Self::Nano => "Nano",
            Self::Kibi => "Kibi",
            Self::Mebi => "Mebi",
            Self::Gibi => "Gibi",
            Self::Tebi => "Tebi",
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 두 접두어 사이의 순수 배율 (`in / out`)
///
/// 측정량은 검사하지 않습니다.
pub fn get_prefix_factor(input: Prefix, output: Prefix) -> f64 {
    input.factor() / output.factor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_round_trips_through_from_symbol() {
        for prefix in Prefix::ALL {
            assert_eq!(Prefix::from_symbol(prefix.symbol()), Some(prefix));
        }
    }

    #[test]
    fn lowercase_aliases() {
        assert_eq!(Prefix::from_symbol("k"), Some(Prefix::Kilo));
        assert_eq!(Prefix::from_symbol("g"), Some(Prefix::Giga));
        assert_eq!(Prefix::from_symbol("ki"), Some(Prefix::Kibi));
        assert_eq!(Prefix::from_symbol("gi"), Some(Prefix::Gibi));
    }

    #[test]
    fn unknown_symbols_are_rejected() {
        assert_eq!(Prefix::from_symbol("x"), None);
        assert_eq!(Prefix::from_symbol("mi"), None);
        assert_eq!(Prefix::from_symbol("ti"), None);
    }

    #[test]
    fn prefix_factor_is_ratio() {
        assert_eq!(get_prefix_factor(Prefix::Kilo, Prefix::Base), 1e3);
        assert_eq!(get_prefix_factor(Prefix::Base, Prefix::Mega), 1e-6);
        assert_eq!(
            get_prefix_factor(Prefix::Kilo, Prefix::Kibi),
            1000.0 / 1024.0
        );
        assert_eq!(
            get_prefix_factor(Prefix::Mebi, Prefix::Mega),
            (1024.0 * 1024.0) / 1e6
        );
    }
}
