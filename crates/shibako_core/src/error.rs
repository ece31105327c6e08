use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::dispatch::ChannelId;

/// Failures while reading or validating the trigger document
#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Trigger configuration not found at {path}")]
    #[diagnostic(
        code(shibako_core::config::not_found),
        help("Check that {path} exists and is readable, or pass --config")
    )]
    NotFound {
        path: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("Trigger configuration is malformed: {reason}")]
    #[diagnostic(
        code(shibako_core::config::malformed),
        help(
            "Expected {{ \"phrases\": [{{ \"name\", \"triggers\", \"response\", \"allow_rude_response\" }}], \"rude_response\": {{ \"chance\", \"prefix\", \"message\" }} }}"
        )
    )]
    Malformed {
        reason: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("{reason}")]
        span: Option<SourceSpan>,
    },
}

impl ConfigError {
    /// Build a `Malformed` error from a serde_json failure, pointing at the
    /// offending line and column.
    pub fn from_json(name: &str, source: &str, err: &serde_json::Error) -> Self {
        let span = offset_of(source, err.line(), err.column()).map(|offset| {
            let len = source[offset..]
                .chars()
                .next()
                .map_or(0, char::len_utf8);
            SourceSpan::from((offset, len))
        });

        Self::Malformed {
            reason: err.to_string(),
            src: NamedSource::new(name, source.to_string()),
            span,
        }
    }

    pub fn invalid(name: &str, source: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
            src: NamedSource::new(name, source.to_string()),
            span: None,
        }
    }
}

/// serde_json reports 1-based lines and columns; line 0 means "no position".
fn offset_of(source: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let mut offset = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let within = column.saturating_sub(1).min(text.len());
            let mut at = offset + within;
            while !source.is_char_boundary(at) {
                at -= 1;
            }
            return Some(at.min(source.len()));
        }
        offset += text.len();
    }
    Some(source.len())
}

/// A reply step could not be delivered by the gateway
#[derive(Error, Diagnostic, Debug)]
#[error("Failed to send reply to channel {channel}")]
#[diagnostic(
    code(shibako_core::send_failed),
    help("Check that the bot can send messages in this channel")
)]
pub struct SendFailure {
    pub channel: ChannelId,
    #[source]
    pub cause: Box<dyn std::error::Error + Send + Sync>,
}

#[derive(Error, Diagnostic, Debug)]
pub enum TranslateError {
    #[error("No translation API key configured")]
    #[diagnostic(
        code(shibako_core::translate::no_api_key),
        help("Set DEEPL_API_KEY in the environment or .env file")
    )]
    MissingApiKey,

    #[error("Translation API request failed")]
    #[diagnostic(code(shibako_core::translate::request_failed))]
    Request {
        #[source]
        cause: reqwest::Error,
    },

    #[error("Translation API returned an unexpected response: {body}")]
    #[diagnostic(code(shibako_core::translate::unexpected_response))]
    UnexpectedResponse { body: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum TransliterateError {
    #[error("Transliteration produced no output for '{input}'")]
    #[diagnostic(code(shibako_core::transliterate::empty_result))]
    EmptyResult { input: String },
}
