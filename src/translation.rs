use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// The external translation operation.
///
/// Takes the raw text and a target hint (e.g. "en") and produces exactly one
/// translated string, or fails. Implementations must not retry on behalf of
/// the engine.
pub trait Translator: Send + Sync {
    fn translate_once<'a>(&'a self, text: &'a str, hint: &'a str) -> BoxFuture<'a, Result<String>>;
}

impl<T: Translator + ?Sized> Translator for Arc<T> {
    fn translate_once<'a>(&'a self, text: &'a str, hint: &'a str) -> BoxFuture<'a, Result<String>> {
        (**self).translate_once(text, hint)
    }
}

/// Request body understood by the translation service
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    data: &'a str,
    #[serde(rename = "lanId")]
    lan_id: &'a str,
}

/// Response body returned by the translation service
#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: Option<String>,
}

/// Translation service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpTranslator {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key,
        }
    }

    async fn post(&self, text: &str, hint: &str) -> Result<String> {
        let request = TranslateRequest {
            data: text,
            lan_id: hint,
        };

        let mut builder = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .context("Failed to send request to translation service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!("Translation service error ({}): {}", status, body);
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .context("Failed to parse translation service response")?;

        let translated = parsed
            .data
            .context("Translation service response contained no data")?;

        debug!(
            "Translated {} chars to {} chars (hint: {})",
            text.chars().count(),
            translated.chars().count(),
            hint
        );

        Ok(translated)
    }
}

impl Translator for HttpTranslator {
    fn translate_once<'a>(&'a self, text: &'a str, hint: &'a str) -> BoxFuture<'a, Result<String>> {
        self.post(text, hint).boxed()
    }
}
