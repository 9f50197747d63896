//! Calendar event data structures.

use serde::{Deserialize, Serialize};

use super::selection::{Currency, ImpactLevel};

/// Sentinel for a value cell the page did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// Impact label used when a row carries no impact marker.
pub const NO_IMPACT: &str = "No Impact";

/// One economic-calendar row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Date as printed by the source (only set on the first row of a day)
    pub date: String,

    /// Time as printed by the source; may be empty or "All Day"
    pub time: String,

    /// Three-letter currency code
    pub currency: String,

    /// Free-text impact classification, e.g. "High Impact Expected"
    pub impact_label: String,

    /// Event title
    pub event_name: String,

    pub actual: String,
    pub forecast: String,
    pub previous: String,
}

impl CalendarEvent {
    /// Format the event using a template.
    ///
    /// Supported placeholders:
    /// - `{date}`, `{time}`, `{currency}`, `{impact}`, `{event}`
    /// - `{actual}`, `{forecast}`, `{previous}`
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{date}", &self.date)
            .replace("{time}", &self.time)
            .replace("{currency}", &self.currency)
            .replace("{impact}", &self.impact_label)
            .replace("{event}", &self.event_name)
            .replace("{actual}", &self.actual)
            .replace("{forecast}", &self.forecast)
            .replace("{previous}", &self.previous)
    }
}

/// Raw rows read from one rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Label of the displayed period, e.g. "This Week: Oct 19 - Oct 25"
    pub week_label: String,

    /// Unfiltered rows in document order
    pub events: Vec<CalendarEvent>,
}

/// Exact-match filter on impact label and currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    pub impact_label: String,
    pub currency: String,
}

impl FilterCriteria {
    pub fn new(impact_label: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            impact_label: impact_label.into(),
            currency: currency.into(),
        }
    }

    /// Build criteria from the closed menu options.
    pub fn from_selection(impact: ImpactLevel, currency: Currency) -> Self {
        Self::new(impact.label(), currency.code())
    }

    /// Whether an event satisfies both equality predicates.
    pub fn matches(&self, event: &CalendarEvent) -> bool {
        event.impact_label == self.impact_label && event.currency == self.currency
    }
}

/// Payload handed back to the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    pub source: String,
    pub week_label: String,
    pub count: usize,
    pub events: Vec<CalendarEvent>,
}

impl FetchResult {
    pub fn new(source: impl Into<String>, week_label: String, events: Vec<CalendarEvent>) -> Self {
        Self {
            source: source.into(),
            week_label,
            count: events.len(),
            events,
        }
    }

    /// Render the result as a chat message.
    ///
    /// `event_template` uses the placeholders of [`CalendarEvent::format`].
    pub fn to_message(&self, criteria: &FilterCriteria, event_template: &str) -> String {
        let mut message = format!("📅 {}\n", self.week_label);
        message.push_str(&format!(
            "{} events with {}: {}\n\n",
            criteria.currency, criteria.impact_label, self.count
        ));

        if self.events.is_empty() {
            message.push_str("No events found for the selected criteria.");
            return message;
        }

        for event in &self.events {
            message.push_str(&event.format(event_template));
            message.push_str("\n\n");
        }
        message.trim_end().to_string()
    }
}

/// Default per-event block used by [`FetchResult::to_message`].
pub const DEFAULT_EVENT_TEMPLATE: &str =
    "⏰ {time} ({currency}) {event}\n🔢 Actual: {actual} | Forecast: {forecast} | Previous: {previous}";
