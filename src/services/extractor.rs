//! Calendar row extraction.
//!
//! Parses a rendered calendar document into raw events using the configured
//! CSS selectors. Tolerant of missing cells; only a page without any event
//! rows is treated as a failure.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{
    CalendarEvent, ExtractionResult, NO_IMPACT, NOT_AVAILABLE, SelectorConfig,
};

/// Extracts calendar rows from rendered HTML.
#[derive(Debug, Clone)]
pub struct RowExtractor {
    row: Selector,
    event_id_attr: String,
    date: Selector,
    time: Selector,
    currency: Selector,
    impact: Selector,
    impact_attr: String,
    event: Selector,
    actual: Selector,
    forecast: Selector,
    previous: Selector,
    week_label: Selector,
}

impl RowExtractor {
    /// Compile the configured selectors.
    pub fn new(selectors: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            row: Self::parse_selector(&selectors.row)?,
            event_id_attr: selectors.event_id_attr.clone(),
            date: Self::parse_selector(&selectors.date)?,
            time: Self::parse_selector(&selectors.time)?,
            currency: Self::parse_selector(&selectors.currency)?,
            impact: Self::parse_selector(&selectors.impact)?,
            impact_attr: selectors.impact_attr.clone(),
            event: Self::parse_selector(&selectors.event)?,
            actual: Self::parse_selector(&selectors.actual)?,
            forecast: Self::parse_selector(&selectors.forecast)?,
            previous: Self::parse_selector(&selectors.previous)?,
            week_label: Self::parse_selector(&selectors.week_label)?,
        })
    }

    /// Extract every event row and the week label, in document order.
    pub fn extract(&self, html: &str) -> Result<ExtractionResult> {
        let document = Html::parse_document(html);

        let events: Vec<CalendarEvent> = document
            .select(&self.row)
            .filter(|row| row.value().attr(&self.event_id_attr).is_some())
            .map(|row| self.parse_row(&row))
            .collect();

        if events.is_empty() {
            return Err(AppError::render(
                "extract",
                "no calendar rows found; page structure may have changed",
            ));
        }

        let week_label = document
            .select(&self.week_label)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();

        log::debug!("Extracted {} rows for '{}'", events.len(), week_label);
        Ok(ExtractionResult { week_label, events })
    }

    fn parse_row(&self, row: &ElementRef) -> CalendarEvent {
        let impact_label = row
            .select(&self.impact)
            .next()
            .and_then(|el| el.value().attr(&self.impact_attr))
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .unwrap_or(NO_IMPACT)
            .to_string();

        CalendarEvent {
            date: cell_text(row, &self.date),
            time: cell_text(row, &self.time),
            currency: cell_text(row, &self.currency),
            impact_label,
            event_name: cell_text(row, &self.event),
            actual: value_text(row, &self.actual),
            forecast: value_text(row, &self.forecast),
            previous: value_text(row, &self.previous),
        }
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first match, or empty.
fn cell_text(row: &ElementRef, selector: &Selector) -> String {
    row.select(selector)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default()
}

/// Like [`cell_text`] but blank values become `N/A`.
fn value_text(row: &ElementRef, selector: &Selector) -> String {
    let text = cell_text(row, selector);
    if text.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        text
    }
}
