//! Closed option sets offered by the selection menus.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Currencies offered at the first menu stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    AUD,
    CAD,
    CHF,
    NZD,
}

impl Currency {
    /// All currencies in menu order.
    pub const ALL: [Currency; 8] = [
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::JPY,
        Currency::AUD,
        Currency::CAD,
        Currency::CHF,
        Currency::NZD,
    ];

    /// Three-letter code as printed on the calendar.
    pub fn code(self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::AUD => "AUD",
            Currency::CAD => "CAD",
            Currency::CHF => "CHF",
            Currency::NZD => "NZD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == s)
            .ok_or_else(|| AppError::input(format!("unknown currency '{s}'")))
    }
}

/// Impact levels a user can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    High,
    Medium,
}

impl ImpactLevel {
    /// All impact levels in menu order.
    pub const ALL: [ImpactLevel; 2] = [ImpactLevel::High, ImpactLevel::Medium];

    /// Token segment (`high` / `medium`).
    pub fn key(self) -> &'static str {
        match self {
            ImpactLevel::High => "high",
            ImpactLevel::Medium => "medium",
        }
    }

    /// Label the calendar carries in the impact icon's `title` attribute.
    pub fn label(self) -> &'static str {
        match self {
            ImpactLevel::High => "High Impact Expected",
            ImpactLevel::Medium => "Medium Impact Expected",
        }
    }

    /// Button text.
    pub fn display_name(self) -> &'static str {
        match self {
            ImpactLevel::High => "High Impact",
            ImpactLevel::Medium => "Medium Impact",
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ImpactLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(ImpactLevel::High),
            "medium" => Ok(ImpactLevel::Medium),
            _ => Err(AppError::input(format!("unknown impact level '{s}'"))),
        }
    }
}

/// Symbolic time window mapped onto the calendar's query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKey {
    Today,
    Tomorrow,
    ThisWeek,
    NextWeek,
    ThisMonth,
    NextMonth,
    Yesterday,
    LastWeek,
    LastMonth,
}

impl PeriodKey {
    /// All periods in menu order.
    pub const ALL: [PeriodKey; 9] = [
        PeriodKey::Today,
        PeriodKey::Tomorrow,
        PeriodKey::ThisWeek,
        PeriodKey::NextWeek,
        PeriodKey::ThisMonth,
        PeriodKey::NextMonth,
        PeriodKey::Yesterday,
        PeriodKey::LastWeek,
        PeriodKey::LastMonth,
    ];

    /// Token segment.
    pub fn key(self) -> &'static str {
        match self {
            PeriodKey::Today => "today",
            PeriodKey::Tomorrow => "tomorrow",
            PeriodKey::ThisWeek => "thisweek",
            PeriodKey::NextWeek => "nextweek",
            PeriodKey::ThisMonth => "thismonth",
            PeriodKey::NextMonth => "nextmonth",
            PeriodKey::Yesterday => "yesterday",
            PeriodKey::LastWeek => "lastweek",
            PeriodKey::LastMonth => "lastmonth",
        }
    }

    /// Query fragment appended to the calendar URL.
    pub fn query(self) -> &'static str {
        match self {
            PeriodKey::Today => "?day=today",
            PeriodKey::Tomorrow => "?day=tomorrow",
            PeriodKey::ThisWeek => "?week=this",
            PeriodKey::NextWeek => "?week=next",
            PeriodKey::ThisMonth => "?month=this",
            PeriodKey::NextMonth => "?month=next",
            PeriodKey::Yesterday => "?day=yesterday",
            PeriodKey::LastWeek => "?week=last",
            PeriodKey::LastMonth => "?month=last",
        }
    }

    /// Button text.
    pub fn display_name(self) -> &'static str {
        match self {
            PeriodKey::Today => "Today",
            PeriodKey::Tomorrow => "Tomorrow",
            PeriodKey::ThisWeek => "This Week",
            PeriodKey::NextWeek => "Next Week",
            PeriodKey::ThisMonth => "This Month",
            PeriodKey::NextMonth => "Next Month",
            PeriodKey::Yesterday => "Yesterday",
            PeriodKey::LastWeek => "Last Week",
            PeriodKey::LastMonth => "Last Month",
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PeriodKey {
    type Err = AppError;

    /// Unknown keys are a configuration error; there is no fallback period.
    fn from_str(s: &str) -> Result<Self> {
        PeriodKey::ALL
            .into_iter()
            .find(|p| p.key() == s)
            .ok_or_else(|| AppError::config(format!("no query mapping for period '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_queries() {
        let expected = [
            ("today", "?day=today"),
            ("tomorrow", "?day=tomorrow"),
            ("thisweek", "?week=this"),
            ("nextweek", "?week=next"),
            ("thismonth", "?month=this"),
            ("nextmonth", "?month=next"),
            ("yesterday", "?day=yesterday"),
            ("lastweek", "?week=last"),
            ("lastmonth", "?month=last"),
        ];
        for (key, query) in expected {
            let period: PeriodKey = key.parse().unwrap();
            assert_eq!(period.query(), query);
            assert_eq!(period.key(), key);
        }
    }

    #[test]
    fn test_unknown_period_is_config_error() {
        let err = "fortnight".parse::<PeriodKey>().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_currency_parse_is_case_sensitive() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::USD);
        assert!("usd".parse::<Currency>().is_err());
        assert!("BTC".parse::<Currency>().is_err());
    }

    #[test]
    fn test_impact_labels() {
        assert_eq!(ImpactLevel::High.label(), "High Impact Expected");
        assert_eq!(ImpactLevel::Medium.label(), "Medium Impact Expected");
        assert!("low".parse::<ImpactLevel>().is_err());
    }
}
