//! English/Japanese machine translation through the DeepL HTTP API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::TranslateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Japanese,
}

impl Language {
    /// DeepL language code
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "EN",
            Self::Japanese => "JA",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Pick `(source, target)` for `text`: plain ASCII (emoji aside) is English
/// going to Japanese, anything else is Japanese going to English.
pub fn detect_direction(text: &str) -> (Language, Language) {
    if text.chars().filter(|c| !is_emoji(*c)).all(|c| c.is_ascii()) {
        (Language::English, Language::Japanese)
    } else {
        (Language::Japanese, Language::English)
    }
}

fn is_emoji(c: char) -> bool {
    unic_emoji_char::is_emoji(c)
        || unic_emoji_char::is_emoji_component(c)
        // pictographs added after the property table's Unicode version
        || matches!(c as u32, 0x1F000..=0x1FAFF)
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslateError>;
}

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// Client for DeepL's `/v2/translate` endpoint
#[derive(Debug, Clone)]
pub struct DeepL {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl DeepL {
    pub const FREE_ENDPOINT: &'static str = "https://api-free.deepl.com/v2/translate";

    const TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, TranslateError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TranslateError::MissingApiKey);
        }
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(|cause| TranslateError::Request { cause })?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Pull the first translation out of a DeepL response body.
fn parse_response(body: &str) -> Result<String, TranslateError> {
    serde_json::from_str::<DeepLResponse>(body)
        .ok()
        .and_then(|response| response.translations.into_iter().next())
        .map(|translation| translation.text)
        .ok_or_else(|| TranslateError::UnexpectedResponse {
            body: body.to_string(),
        })
}

#[async_trait]
impl Translator for DeepL {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslateError> {
        let params = [
            ("text", text),
            ("source_lang", source.code()),
            ("target_lang", target.code()),
            ("preserve_formatting", "0"),
        ];

        let body = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&params)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|cause| TranslateError::Request { cause })?
            .text()
            .await
            .map_err(|cause| TranslateError::Request { cause })?;

        let translated = parse_response(&body)?;
        debug!("Translated {} -> {}: {}", source, target, translated);
        Ok(translated)
    }
}
