//! Japanese reading and romanization.
//!
//! The converter is a capability decided once at startup: commands receive an
//! `Option<Arc<dyn Transliterator>>` and report "unavailable" when it is absent.

use std::sync::Arc;

use crate::error::TransliterateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transliteration {
    /// Hiragana reading of the input
    pub reading: String,
    /// Hepburn romanization of the input
    pub romaji: String,
}

impl Transliteration {
    /// Input annotated with its reading, `日本「にほん」`. Text that reads as
    /// itself is left alone.
    pub fn furigana(&self, original: &str) -> String {
        if self.reading.is_empty() || self.reading == original {
            original.to_string()
        } else {
            format!("{}「{}」", original, self.reading)
        }
    }
}

pub trait Transliterator: Send + Sync {
    fn transliterate(&self, text: &str) -> Result<Transliteration, TransliterateError>;
}

/// Converter backed by the `kakasi` dictionary.
#[cfg(feature = "kakasi")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Kakasi;

#[cfg(feature = "kakasi")]
impl Transliterator for Kakasi {
    fn transliterate(&self, text: &str) -> Result<Transliteration, TransliterateError> {
        let result = kakasi::convert(text);
        if result.romaji.trim().is_empty() && !text.trim().is_empty() {
            return Err(TransliterateError::EmptyResult {
                input: text.to_string(),
            });
        }
        Ok(Transliteration {
            reading: result.hiragana,
            romaji: result.romaji,
        })
    }
}

/// The converter compiled into this build, if any.
pub fn default_transliterator() -> Option<Arc<dyn Transliterator>> {
    #[cfg(feature = "kakasi")]
    {
        Some(Arc::new(Kakasi))
    }
    #[cfg(not(feature = "kakasi"))]
    {
        None
    }
}
