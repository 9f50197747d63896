//! Render session abstraction.
//!
//! Defines the `RenderBackend` and `RenderSession` traits that abstract over
//! the headless browser (Chromium via chromiumoxide when the `browser`
//! feature is enabled). Every fetch opens its own session; sessions are never
//! shared or pooled.

#[cfg(feature = "browser")]
pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::services::{EgressHandle, Fingerprint};

#[cfg(feature = "browser")]
pub use chromium::ChromiumBackend;

/// Launches render sessions.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Open a fresh session that presents `fingerprint` and routes through `egress` if given.
    async fn open(
        &self,
        fingerprint: &Fingerprint,
        egress: Option<&EgressHandle>,
    ) -> Result<Box<dyn RenderSession>>;
}

/// One headless browsing context.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigate and wait for the page to settle.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Wait until `selector` matches at least one element.
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Serialized DOM of the current page.
    async fn content(&mut self) -> Result<String>;

    /// Tear the session down. Called exactly once per opened session.
    async fn close(self: Box<Self>) -> Result<()>;
}
