//! Service layer for the calendar pipeline.
//!
//! This module contains the business logic for:
//! - Client identity sampling (`FingerprintProvider`)
//! - Proxy selection and forwarding (`ProxyPool`)
//! - Scroll pagination (`Pager`)
//! - Row extraction (`RowExtractor`) and filtering (`filter_events`)
//! - Fetch orchestration (`CalendarFetcher`)

mod egress;
mod extractor;
mod fetcher;
mod filter;
mod fingerprint;
mod pager;

pub use egress::{EgressHandle, EgressProvider, ProxyPool};
pub use extractor::RowExtractor;
pub use fetcher::CalendarFetcher;
pub use filter::filter_events;
pub use fingerprint::{Fingerprint, FingerprintProvider, STEALTH_SCRIPT};
pub use pager::{Pager, PagerReport};
