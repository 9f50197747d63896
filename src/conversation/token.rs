//! Conversation tokens.
//!
//! A token is the whole conversation state. Its grammar is
//!
//! ```text
//! currency_<CODE>
//! impact_<high|medium>_<CODE>
//! period_<period-key>_<high|medium>_<CODE>
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::models::{Currency, ImpactLevel, PeriodKey};

const CURRENCY_TAG: &str = "currency";
const IMPACT_TAG: &str = "impact";
const PERIOD_TAG: &str = "period";

/// Decoded conversation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationToken {
    Currency {
        currency: Currency,
    },
    Impact {
        impact: ImpactLevel,
        currency: Currency,
    },
    Period {
        period: PeriodKey,
        impact: ImpactLevel,
        currency: Currency,
    },
}

impl ConversationToken {
    /// Stage tag the token starts with.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Currency { .. } => CURRENCY_TAG,
            Self::Impact { .. } => IMPACT_TAG,
            Self::Period { .. } => PERIOD_TAG,
        }
    }
}

impl fmt::Display for ConversationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Currency { currency } => write!(f, "{CURRENCY_TAG}_{currency}"),
            Self::Impact { impact, currency } => write!(f, "{IMPACT_TAG}_{impact}_{currency}"),
            Self::Period {
                period,
                impact,
                currency,
            } => write!(f, "{PERIOD_TAG}_{period}_{impact}_{currency}"),
        }
    }
}

impl FromStr for ConversationToken {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<&str> = s.split('_').collect();
        let (tag, args) = segments
            .split_first()
            .ok_or_else(|| AppError::input("empty token"))?;

        let arity = match *tag {
            CURRENCY_TAG => 1,
            IMPACT_TAG => 2,
            PERIOD_TAG => 3,
            _ => return Err(AppError::input(format!("unknown stage '{tag}' in token '{s}'"))),
        };
        if args.len() != arity {
            return Err(AppError::input(format!(
                "token '{s}' has {} argument(s), stage '{tag}' takes {arity}",
                args.len()
            )));
        }

        let token = match args {
            [currency] => Self::Currency {
                currency: currency.parse()?,
            },
            [impact, currency] => Self::Impact {
                impact: impact.parse()?,
                currency: currency.parse()?,
            },
            [period, impact, currency] => Self::Period {
                // Period keys outside a token are a config error; here they are bad input.
                period: period
                    .parse()
                    .map_err(|_| AppError::input(format!("unknown period '{period}'")))?,
                impact: impact.parse()?,
                currency: currency.parse()?,
            },
            _ => unreachable!("arity checked above"),
        };
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for raw in ["currency_USD", "impact_medium_EUR", "period_lastmonth_high_NZD"] {
            let token: ConversationToken = raw.parse().unwrap();
            assert_eq!(token.to_string(), raw);
        }
    }

    #[test]
    fn test_unknown_tag() {
        let err = "technical_analysis".parse::<ConversationToken>().unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
    }

    #[test]
    fn test_arity_mismatch() {
        for raw in [
            "currency",
            "currency_USD_high",
            "impact_high",
            "period_today_high",
            "period_today_high_USD_extra",
            "",
        ] {
            assert!(
                matches!(raw.parse::<ConversationToken>(), Err(AppError::Input(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_argument_values() {
        assert!(matches!(
            "period_fortnight_high_USD".parse::<ConversationToken>(),
            Err(AppError::Input(_))
        ));
        assert!(matches!(
            "impact_low_USD".parse::<ConversationToken>(),
            Err(AppError::Input(_))
        ));
        assert!(matches!(
            "currency_usd".parse::<ConversationToken>(),
            Err(AppError::Input(_))
        ));
    }
}
