//! Selection state machine.
//!
//! `START → CURRENCY_CHOSEN → IMPACT_CHOSEN → COMPLETE`, strictly forward.
//! Nothing is stored between calls: the current stage and everything chosen
//! so far is read back from the token.

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Currency, FilterCriteria, ImpactLevel, PeriodKey};

use super::token::ConversationToken;

/// Conversation stage a prompt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    CurrencyChosen,
    ImpactChosen,
}

/// One selectable option: the button label and the token it sends back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuOption {
    pub label: String,
    pub token: String,
}

/// Menu shown to the user at a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuPrompt {
    pub stage: Stage,
    pub text: String,
    pub options: Vec<MenuOption>,
}

impl MenuPrompt {
    /// Token for an option whose label or token suffix equals `choice`.
    fn token_for(&self, choice: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.label == choice || option_key(&o.token) == Some(choice))
            .map(|o| o.token.as_str())
    }
}

/// Completed selection, ready for the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub criteria: FilterCriteria,
    pub period: PeriodKey,
}

/// Outcome of one conversation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Prompt(MenuPrompt),
    Complete(Selection),
}

/// Prompt offered before anything is chosen.
pub fn start() -> MenuPrompt {
    MenuPrompt {
        stage: Stage::Start,
        text: "Select a currency:".to_string(),
        options: Currency::ALL
            .into_iter()
            .map(|currency| MenuOption {
                label: currency.code().to_string(),
                token: ConversationToken::Currency { currency }.to_string(),
            })
            .collect(),
    }
}

/// Interpret an inbound token, as delivered by the transport when an option is pressed.
pub fn resume(token: &str) -> Result<Step> {
    let token: ConversationToken = token.parse()?;
    Ok(step_for(token))
}

/// Advance from `current` (None = START) by the user's `choice`.
///
/// `choice` is either an option label (`"High Impact"`) or the option's key
/// (`"high"`, `"USD"`, `"thisweek"`). Anything outside the current menu is
/// rejected and the conversation stays where it was.
pub fn advance(current: Option<&str>, choice: &str) -> Result<Step> {
    let prompt = match current {
        None => start(),
        Some(raw) => match resume(raw)? {
            Step::Prompt(prompt) => prompt,
            Step::Complete(_) => {
                return Err(AppError::input(format!(
                    "conversation '{raw}' is already complete; start over"
                )));
            }
        },
    };

    let next = prompt.token_for(choice).ok_or_else(|| {
        AppError::input(format!(
            "'{choice}' is not an option at stage {:?}",
            prompt.stage
        ))
    })?;
    resume(next)
}

fn step_for(token: ConversationToken) -> Step {
    match token {
        ConversationToken::Currency { currency } => Step::Prompt(impact_prompt(currency)),
        ConversationToken::Impact { impact, currency } => {
            Step::Prompt(period_prompt(impact, currency))
        }
        ConversationToken::Period {
            period,
            impact,
            currency,
        } => Step::Complete(Selection {
            criteria: FilterCriteria::from_selection(impact, currency),
            period,
        }),
    }
}

fn impact_prompt(currency: Currency) -> MenuPrompt {
    MenuPrompt {
        stage: Stage::CurrencyChosen,
        text: format!("Selected {currency}. Now choose impact level:"),
        options: ImpactLevel::ALL
            .into_iter()
            .map(|impact| MenuOption {
                label: impact.display_name().to_string(),
                token: ConversationToken::Impact { impact, currency }.to_string(),
            })
            .collect(),
    }
}

fn period_prompt(impact: ImpactLevel, currency: Currency) -> MenuPrompt {
    MenuPrompt {
        stage: Stage::ImpactChosen,
        text: format!(
            "Selected {} for {currency}. Now choose a time period:",
            impact.label()
        ),
        options: PeriodKey::ALL
            .into_iter()
            .map(|period| MenuOption {
                label: period.display_name().to_string(),
                token: ConversationToken::Period {
                    period,
                    impact,
                    currency,
                }
                .to_string(),
            })
            .collect(),
    }
}

/// The segment an option adds to the token; always the one after the tag.
fn option_key(token: &str) -> Option<&str> {
    token.split('_').nth(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_offers_all_currencies() {
        let prompt = start();
        assert_eq!(prompt.stage, Stage::Start);
        assert_eq!(prompt.options.len(), 8);
        assert_eq!(prompt.options[0].token, "currency_USD");
    }

    #[test]
    fn test_full_walk_by_keys() {
        let step = advance(None, "GBP").unwrap();
        let Step::Prompt(prompt) = step else {
            panic!("expected impact prompt");
        };
        assert_eq!(prompt.stage, Stage::CurrencyChosen);
        assert_eq!(prompt.options.len(), 2);
        assert_eq!(prompt.options[1].token, "impact_medium_GBP");

        let step = advance(Some("currency_GBP"), "medium").unwrap();
        let Step::Prompt(prompt) = step else {
            panic!("expected period prompt");
        };
        assert_eq!(prompt.stage, Stage::ImpactChosen);
        assert_eq!(prompt.options.len(), 9);

        let step = advance(Some("impact_medium_GBP"), "nextmonth").unwrap();
        assert_eq!(
            step,
            Step::Complete(Selection {
                criteria: FilterCriteria::new("Medium Impact Expected", "GBP"),
                period: PeriodKey::NextMonth,
            })
        );
    }

    #[test]
    fn test_advance_accepts_labels() {
        let step = advance(Some("currency_CAD"), "High Impact").unwrap();
        let Step::Prompt(prompt) = step else {
            panic!("expected period prompt");
        };
        assert!(prompt.options.iter().any(|o| o.token == "period_today_high_CAD"));

        let step = advance(Some("impact_high_CAD"), "Last Week").unwrap();
        assert!(matches!(
            step,
            Step::Complete(Selection {
                period: PeriodKey::LastWeek,
                ..
            })
        ));
    }

    #[test]
    fn test_choice_outside_menu_is_rejected() {
        assert!(matches!(advance(None, "BTC"), Err(AppError::Input(_))));
        assert!(matches!(
            advance(Some("currency_USD"), "low"),
            Err(AppError::Input(_))
        ));
        // A currency is not a valid answer at the impact stage.
        assert!(matches!(
            advance(Some("currency_USD"), "EUR"),
            Err(AppError::Input(_))
        ));
        assert!(matches!(
            advance(Some("impact_high_USD"), "someday"),
            Err(AppError::Input(_))
        ));
    }

    #[test]
    fn test_complete_token_is_terminal() {
        assert!(matches!(
            advance(Some("period_today_high_USD"), "today"),
            Err(AppError::Input(_))
        ));
    }

    #[test]
    fn test_resume_matches_advance() {
        let via_resume = resume("impact_high_JPY").unwrap();
        let via_advance = advance(Some("currency_JPY"), "high").unwrap();
        assert_eq!(via_resume, via_advance);
    }
}
