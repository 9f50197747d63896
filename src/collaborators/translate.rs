//! Label translation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{CollaboratorConfig, FetchResult, NOT_AVAILABLE};

/// Translates short display strings.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, locale: &str) -> Result<String>;
}

/// Translate `text`, falling back to the input on any failure.
///
/// Empty text and `N/A` are returned untouched without a request.
pub async fn translate_or_original(translator: &dyn Translator, text: &str, locale: &str) -> String {
    if text.trim().is_empty() || text == NOT_AVAILABLE {
        return text.to_string();
    }
    match translator.translate(text, locale).await {
        Ok(translated) if !translated.trim().is_empty() => translated,
        Ok(_) => text.to_string(),
        Err(e) => {
            log::warn!("Translation to '{}' failed, keeping original: {}", locale, e);
            text.to_string()
        }
    }
}

/// Translate the week label and every event name of a fetch result in place.
pub async fn translate_result(translator: &dyn Translator, result: &mut FetchResult, locale: &str) {
    result.week_label = translate_or_original(translator, &result.week_label, locale).await;
    for event in &mut result.events {
        event.event_name = translate_or_original(translator, &event.event_name, locale).await;
    }
}

/// Public Google translate endpoint.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(config: &CollaboratorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.translate_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.translate_endpoint.clone(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, locale: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", locale),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        parse_segments(&body)
            .ok_or_else(|| AppError::collaborator("translator", "unexpected response shape"))
    }
}

/// Join the translated segments of a `translate_a/single` response.
fn parse_segments(body: &serde_json::Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let joined: String = segments
        .iter()
        .filter_map(|segment| segment.get(0)?.as_str())
        .collect();
    (!joined.is_empty()).then_some(joined)
}

/// Returns every input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate(&self, text: &str, _locale: &str) -> Result<String> {
        Ok(text.to_string())
    }
}
