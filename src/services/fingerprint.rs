//! Randomized client identity.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::models::FingerprintConfig;

/// Installed before any page script runs so `navigator.webdriver` reads false.
pub const STEALTH_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => false });";

/// Used only if the configured pool is empty.
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Identity a render session presents to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub touch_enabled: bool,
    pub landscape: bool,
}

/// Draws a fresh fingerprint per fetch attempt.
#[derive(Debug, Clone)]
pub struct FingerprintProvider {
    config: FingerprintConfig,
}

impl FingerprintProvider {
    pub fn new(config: FingerprintConfig) -> Self {
        Self { config }
    }

    /// Sample a fingerprint from the thread-local RNG.
    pub fn sample(&self) -> Fingerprint {
        self.sample_with(&mut rand::thread_rng())
    }

    /// Sample a fingerprint from `rng`; every field is drawn independently.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Fingerprint {
        let user_agent = self
            .config
            .user_agents
            .choose(rng)
            .filter(|ua| !ua.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| FALLBACK_USER_AGENT.to_string());

        Fingerprint {
            user_agent,
            viewport_width: self.config.base_width + self.jitter(rng),
            viewport_height: self.config.base_height + self.jitter(rng),
            touch_enabled: rng.gen_bool(0.5),
            landscape: rng.gen_bool(0.5),
        }
    }

    fn jitter<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        if self.config.viewport_jitter == 0 {
            return 0;
        }
        rng.gen_range(0..self.config.viewport_jitter)
    }
}
