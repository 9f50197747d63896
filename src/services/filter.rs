//! Event filtering by impact and currency.

use crate::models::{CalendarEvent, FilterCriteria};

/// Keep events matching both criteria, preserving document order.
pub fn filter_events(events: &[CalendarEvent], criteria: &FilterCriteria) -> Vec<CalendarEvent> {
    events
        .iter()
        .filter(|event| criteria.matches(event))
        .cloned()
        .collect()
}
