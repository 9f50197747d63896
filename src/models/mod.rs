// src/models/mod.rs

//! Domain models for the calendar pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod event;
mod selection;

// Re-export all public types
pub use config::{
    BrowserConfig, CalendarConfig, CollaboratorConfig, Config, DelayRange, EgressConfig,
    FingerprintConfig, LoggingConfig, PacingConfig, PagerConfig, SelectorConfig,
    parse_proxy_list,
};
pub use event::{
    CalendarEvent, DEFAULT_EVENT_TEMPLATE, ExtractionResult, FetchResult, FilterCriteria,
    NO_IMPACT, NOT_AVAILABLE,
};
pub use selection::{Currency, ImpactLevel, PeriodKey};
