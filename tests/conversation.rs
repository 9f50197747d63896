//! Selection flow across interleaved conversations.

use fxcal::conversation::{Step, advance, resume, start};
use fxcal::error::AppError;
use fxcal::models::{Currency, FilterCriteria, ImpactLevel, PeriodKey};

/// Follow the menus by pressing options, returning the token sent at each step.
fn press(current: Option<&str>, choice: &str) -> String {
    let prompt = match current {
        None => start(),
        Some(token) => match resume(token).unwrap() {
            Step::Prompt(prompt) => prompt,
            Step::Complete(_) => panic!("{token} is already complete"),
        },
    };
    prompt
        .options
        .iter()
        .find(|o| o.label == choice)
        .map(|o| o.token.clone())
        .unwrap_or_else(|| panic!("no option '{choice}'"))
}

#[test]
fn test_every_selection_expands_to_its_criteria() {
    for currency in Currency::ALL {
        for impact in ImpactLevel::ALL {
            for period in PeriodKey::ALL {
                let t1 = press(None, currency.code());
                let t2 = press(Some(&t1), impact.display_name());
                let t3 = press(Some(&t2), period.display_name());

                let Step::Complete(selection) = resume(&t3).unwrap() else {
                    panic!("{t3} should be complete");
                };
                assert_eq!(
                    selection.criteria,
                    FilterCriteria::new(impact.label(), currency.code())
                );
                assert_eq!(selection.period, period);
            }
        }
    }
}

#[test]
fn test_interleaved_conversations_do_not_interfere() {
    let a1 = press(None, "USD");
    let b1 = press(None, "EUR");
    let a2 = press(Some(&a1), "High Impact");
    let c1 = press(None, "JPY");
    let b2 = press(Some(&b1), "Medium Impact");
    let c2 = press(Some(&c1), "Medium Impact");
    let b3 = press(Some(&b2), "Next Week");
    let a3 = press(Some(&a2), "Today");
    let c3 = press(Some(&c2), "Last Month");

    let expect = |token: &str, impact: &str, currency: &str, period: PeriodKey| {
        let Step::Complete(selection) = resume(token).unwrap() else {
            panic!("{token} should be complete");
        };
        assert_eq!(selection.criteria, FilterCriteria::new(impact, currency));
        assert_eq!(selection.period, period);
    };

    expect(&a3, "High Impact Expected", "USD", PeriodKey::Today);
    expect(&b3, "Medium Impact Expected", "EUR", PeriodKey::NextWeek);
    expect(&c3, "Medium Impact Expected", "JPY", PeriodKey::LastMonth);
}

#[test]
fn test_malformed_tokens_do_not_advance() {
    for token in [
        "currency",
        "impact_high",
        "period_today_USD",
        "stage_USD",
        "currency_USD_high",
        "",
    ] {
        assert!(
            matches!(resume(token), Err(AppError::Input(_))),
            "{token:?} should be rejected by resume"
        );
        assert!(
            matches!(advance(Some(token), "today"), Err(AppError::Input(_))),
            "{token:?} should be rejected by advance"
        );
    }
}

#[test]
fn test_rejected_choice_leaves_token_usable() {
    let token = press(None, "CHF");
    assert!(advance(Some(&token), "Low Impact").is_err());

    // The same token still advances with a valid choice.
    let step = advance(Some(&token), "high").unwrap();
    assert!(matches!(step, Step::Prompt(_)));
}
