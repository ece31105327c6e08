//! User-facing error messages for the text commands.
//!
//! Operators may override any of these from the `error_messages` table of the
//! trigger document; anything not overridden falls back to the built-in text.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    PhrasesListEmpty,
    PhrasesListTooLong,
    RomajiNoInput,
    RomajiConversionFailed,
    RomajiConverterUnavailable,
    FuriganaNoInput,
    FuriganaConversionFailed,
    FuriganaConverterUnavailable,
    TranslateNoInput,
    TranslateNoApiKey,
    TranslateApiError,
    TranslateFormatError,
    FullNoInput,
    FullConversionFailed,
    FullConverterUnavailable,
    FullNoApiKey,
    FullApiError,
    FullApiFormatError,
    ReloadFailed,
    ReloadNotAllowed,
    FetchFailed,
}

impl MessageKey {
    pub const ALL: [MessageKey; 21] = [
        Self::PhrasesListEmpty,
        Self::PhrasesListTooLong,
        Self::RomajiNoInput,
        Self::RomajiConversionFailed,
        Self::RomajiConverterUnavailable,
        Self::FuriganaNoInput,
        Self::FuriganaConversionFailed,
        Self::FuriganaConverterUnavailable,
        Self::TranslateNoInput,
        Self::TranslateNoApiKey,
        Self::TranslateApiError,
        Self::TranslateFormatError,
        Self::FullNoInput,
        Self::FullConversionFailed,
        Self::FullConverterUnavailable,
        Self::FullNoApiKey,
        Self::FullApiError,
        Self::FullApiFormatError,
        Self::ReloadFailed,
        Self::ReloadNotAllowed,
        Self::FetchFailed,
    ];

    /// Key as it appears in the `error_messages` table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PhrasesListEmpty => "phrases_list_empty",
            Self::PhrasesListTooLong => "phrases_list_too_long",
            Self::RomajiNoInput => "romaji_no_input",
            Self::RomajiConversionFailed => "romaji_conversion_failed",
            Self::RomajiConverterUnavailable => "romaji_converter_unavailable",
            Self::FuriganaNoInput => "furigana_no_input",
            Self::FuriganaConversionFailed => "furigana_conversion_failed",
            Self::FuriganaConverterUnavailable => "furigana_converter_unavailable",
            Self::TranslateNoInput => "translate_no_input",
            Self::TranslateNoApiKey => "translate_no_api_key",
            Self::TranslateApiError => "translate_api_error",
            Self::TranslateFormatError => "translate_format_error",
            Self::FullNoInput => "full_no_input",
            Self::FullConversionFailed => "full_conversion_failed",
            Self::FullConverterUnavailable => "full_converter_unavailable",
            Self::FullNoApiKey => "full_no_api_key",
            Self::FullApiError => "full_api_error",
            Self::FullApiFormatError => "full_api_format_error",
            Self::ReloadFailed => "reload_failed",
            Self::ReloadNotAllowed => "reload_not_allowed",
            Self::FetchFailed => "fetch_failed",
        }
    }

    pub fn default_text(self) -> &'static str {
        match self {
            Self::PhrasesListEmpty => "なにも　フレーズが　みつかりません。",
            Self::PhrasesListTooLong => "たくさん　ありすぎて　ぜんぶは　みせられない！",
            Self::RomajiNoInput => "テキストをいれてください。",
            Self::RomajiConversionFailed => "へんかんできませんでした。",
            Self::RomajiConverterUnavailable => "ローマジへんかんきはつかえません。",
            Self::FuriganaNoInput => "Please provide Japanese text to convert to Furigana.",
            Self::FuriganaConversionFailed => "Furigana conversion failed.",
            Self::FuriganaConverterUnavailable => "Furigana conversion is unavailable.",
            Self::TranslateNoInput => "翻訳するテキストを入力してください。",
            Self::TranslateNoApiKey => "翻訳APIキーが設定されていません。",
            Self::TranslateApiError => "翻訳APIでエラーが発生しました。",
            Self::TranslateFormatError => "翻訳結果の形式が予期せぬものでした。",
            Self::FullNoInput => {
                "Please provide text or reply to a message for full processing."
            }
            Self::FullConversionFailed => "Furigana/Romaji conversion failed.",
            Self::FullConverterUnavailable => "Japanese converter unavailable.",
            Self::FullNoApiKey => "Translation API key not set.",
            Self::FullApiError => "Translation API error.",
            Self::FullApiFormatError => "Translation API format error.",
            Self::ReloadFailed => "せっていを　よみこめませんでした。",
            Self::ReloadNotAllowed => "それは　できません！",
            Self::FetchFailed => "Failed to fetch replied message.",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessageKey(pub String);

impl FromStr for MessageKey {
    type Err = UnknownMessageKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownMessageKey(s.to_string()))
    }
}

/// Resolved message table: configured overrides on top of the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Messages {
    overrides: HashMap<MessageKey, String>,
}

impl Messages {
    /// Build from the raw `error_messages` table. Unknown keys are returned so
    /// the caller can report them.
    pub fn from_table(table: HashMap<String, String>) -> (Self, Vec<String>) {
        let mut overrides = HashMap::new();
        let mut unknown = Vec::new();
        for (key, text) in table {
            match key.parse::<MessageKey>() {
                Ok(key) => {
                    overrides.insert(key, text);
                }
                Err(UnknownMessageKey(key)) => unknown.push(key),
            }
        }
        unknown.sort();
        (Self { overrides }, unknown)
    }

    pub fn get(&self, key: MessageKey) -> &str {
        self.overrides
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_text())
    }
}
