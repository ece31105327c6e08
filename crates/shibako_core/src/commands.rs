//! Prefix commands
//!
//! Messages starting with the command prefix never reach trigger matching;
//! they are parsed here and answered with a [`CommandReply`]. The gateway
//! adapter is responsible for resolving the text a command works on (its
//! arguments, or the message it replies to) and for posting the answer.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{ConfigHandle, TriggerConfig};
use crate::dispatch::UserId;
use crate::error::TranslateError;
use crate::messages::MessageKey;
use crate::translate::{Translator, detect_direction};
use crate::transliterate::Transliterator;

/// Longest reply we build before giving up or truncating.
pub const MESSAGE_BUDGET: usize = 1900;

const TRUNCATION_NOTE: &str = "\n... (Output truncated due to length)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Phrases,
    Romaji,
    Furigana,
    Translate,
    Full,
    Reload,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "help" | "tasukete" => Some(Self::Help),
            "phrases" => Some(Self::Phrases),
            "romaji" => Some(Self::Romaji),
            "furigana" | "furi" => Some(Self::Furigana),
            "translate" | "tl" => Some(Self::Translate),
            "full" => Some(Self::Full),
            "reload" => Some(Self::Reload),
            _ => None,
        }
    }

    /// Whether the command works on text and may fall back to a replied message.
    pub fn takes_text(self) -> bool {
        matches!(
            self,
            Self::Romaji | Self::Furigana | Self::Translate | Self::Full
        )
    }
}

/// A recognized command and its raw argument text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub command: Command,
    pub args: &'a str,
}

/// Split `content` into a command and its arguments. Returns `None` for
/// messages without the prefix and for unknown command names.
pub fn parse<'a>(prefix: &str, content: &'a str) -> Option<ParsedCommand<'a>> {
    let rest = content.strip_prefix(prefix)?;
    let (name, args) = match rest.find(char::is_whitespace) {
        Some(at) => (&rest[..at], rest[at..].trim()),
        None => (rest, ""),
    };
    let command = Command::from_name(&name.to_lowercase())?;
    Some(ParsedCommand { command, args })
}

/// Text a command operates on: its arguments, or else the replied-to message.
pub fn resolve_text(args: &str, replied: Option<&str>) -> String {
    let args = args.trim();
    if !args.is_empty() {
        return args.to_string();
    }
    replied.map(str::trim).unwrap_or_default().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub text: String,
    /// Post as a reply to the invoking message rather than a plain message
    pub as_reply: bool,
}

impl CommandReply {
    fn say(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            as_reply: false,
        }
    }

    fn reply(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            as_reply: true,
        }
    }
}

/// Everything the command subsystem needs, built once at startup
#[derive(Clone)]
pub struct CommandContext {
    pub prefix: String,
    pub config: ConfigHandle,
    pub config_path: PathBuf,
    pub admins: Vec<UserId>,
    pub transliterator: Option<Arc<dyn Transliterator>>,
    pub translator: Option<Arc<dyn Translator>>,
}

impl CommandContext {
    /// Answer `command` invoked by `author` on `text`.
    pub async fn execute(&self, command: Command, author: UserId, text: &str) -> CommandReply {
        let config = self.config.current();
        match command {
            Command::Help => CommandReply::say(help_text(&self.prefix, &config)),
            Command::Phrases => CommandReply::say(phrases_text(&config)),
            Command::Romaji => CommandReply::say(self.romaji(&config, text)),
            Command::Furigana => CommandReply::say(self.furigana(&config, text)),
            Command::Translate => self.translate(&config, text).await,
            Command::Full => CommandReply::say(self.full(&config, text).await),
            Command::Reload => CommandReply::say(self.reload(&config, author).await),
        }
    }

    fn romaji(&self, config: &TriggerConfig, text: &str) -> String {
        let emoji = config.emoji();
        let messages = config.messages();
        if text.is_empty() {
            return format!("{} {}", emoji, messages.get(MessageKey::RomajiNoInput));
        }
        let Some(converter) = &self.transliterator else {
            return format!(
                "{} {}",
                emoji,
                messages.get(MessageKey::RomajiConverterUnavailable)
            );
        };
        match converter.transliterate(text) {
            Ok(result) => format!("{} \"{}\"", emoji, result.romaji),
            Err(e) => {
                warn!("Romaji conversion failed for '{}': {}", text, e);
                format!(
                    "{} {}",
                    emoji,
                    messages.get(MessageKey::RomajiConversionFailed)
                )
            }
        }
    }

    fn furigana(&self, config: &TriggerConfig, text: &str) -> String {
        let emoji = config.emoji();
        let messages = config.messages();
        if text.is_empty() {
            return format!("{} {}", emoji, messages.get(MessageKey::FuriganaNoInput));
        }
        let Some(converter) = &self.transliterator else {
            return format!(
                "{} {}",
                emoji,
                messages.get(MessageKey::FuriganaConverterUnavailable)
            );
        };
        match converter.transliterate(text) {
            Ok(result) => format!("input: {}\nmessage: {}", text, result.furigana(text)),
            Err(e) => {
                warn!("Furigana conversion failed for '{}': {}", text, e);
                format!(
                    "{} {}",
                    emoji,
                    messages.get(MessageKey::FuriganaConversionFailed)
                )
            }
        }
    }

    async fn translate(&self, config: &TriggerConfig, text: &str) -> CommandReply {
        let emoji = config.emoji();
        let messages = config.messages();
        if text.is_empty() {
            return CommandReply::say(format!(
                "{} {}",
                emoji,
                messages.get(MessageKey::TranslateNoInput)
            ));
        }

        match self.run_translation(text).await {
            Ok(translated) => CommandReply::reply(translated),
            Err(e) => {
                let key = match &e {
                    TranslateError::MissingApiKey => MessageKey::TranslateNoApiKey,
                    TranslateError::Request { .. } => MessageKey::TranslateApiError,
                    TranslateError::UnexpectedResponse { .. } => MessageKey::TranslateFormatError,
                };
                warn!("Translation failed: {}", e);
                CommandReply::say(format!("{} {}", emoji, messages.get(key)))
            }
        }
    }

    async fn run_translation(&self, text: &str) -> Result<String, TranslateError> {
        let translator = self
            .translator
            .as_ref()
            .ok_or(TranslateError::MissingApiKey)?;
        let (source, target) = detect_direction(text);
        translator.translate(text, source, target).await
    }

    async fn full(&self, config: &TriggerConfig, text: &str) -> String {
        let messages = config.messages();
        if text.is_empty() {
            return format!(
                "{} {}",
                config.emoji(),
                messages.get(MessageKey::FullNoInput)
            );
        }

        let (furigana, romaji) = match &self.transliterator {
            Some(converter) => match converter.transliterate(text) {
                Ok(result) => (result.furigana(text), result.romaji),
                Err(e) => {
                    warn!("Conversion for full breakdown failed: {}", e);
                    let failed = messages.get(MessageKey::FullConversionFailed).to_string();
                    (failed.clone(), failed)
                }
            },
            None => {
                let unavailable = messages.get(MessageKey::FullConverterUnavailable).to_string();
                (unavailable.clone(), unavailable)
            }
        };

        let translation = match self.run_translation(text).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation for full breakdown failed: {}", e);
                let key = match &e {
                    TranslateError::MissingApiKey => MessageKey::FullNoApiKey,
                    TranslateError::Request { .. } => MessageKey::FullApiError,
                    TranslateError::UnexpectedResponse { .. } => MessageKey::FullApiFormatError,
                };
                messages.get(key).to_string()
            }
        };

        let response = format!("```\n{text}\n{furigana}\n{romaji}\n\n{translation}\n```");
        truncate(response)
    }

    async fn reload(&self, config: &TriggerConfig, author: UserId) -> String {
        let emoji = config.emoji();
        if !self.admins.contains(&author) {
            info!("Rejected reload from non-admin {}", author);
            return format!(
                "{} {}",
                emoji,
                config.messages().get(MessageKey::ReloadNotAllowed)
            );
        }

        match self.config.reload(&self.config_path).await {
            Ok(fresh) => format!(
                "{} {} phrases loaded from {}",
                fresh.emoji(),
                fresh.phrase_count(),
                self.config_path.display()
            ),
            Err(e) => {
                error!("Reload of {} failed: {}", self.config_path.display(), e);
                format!("{} {}", emoji, config.messages().get(MessageKey::ReloadFailed))
            }
        }
    }
}

/// `{emoji} {message}` for a configurable notice.
pub fn notice(config: &TriggerConfig, key: MessageKey) -> String {
    format!("{} {}", config.emoji(), config.messages().get(key))
}

/// Cut `text` to the message budget, noting that it was cut.
fn truncate(text: String) -> String {
    if text.chars().count() <= MESSAGE_BUDGET {
        return text;
    }
    let mut cut: String = text.chars().take(MESSAGE_BUDGET).collect();
    cut.push_str(TRUNCATION_NOTE);
    cut
}

pub fn help_text(prefix: &str, config: &TriggerConfig) -> String {
    let mut help = format!(
        "{emoji} こんにちは！ しばこです。 (Hello! I'm Shibako.)\n\
         \n\
         わたしができること： (Things I can do:)\n\
         `{p}help` - Shows this help message.\n\
         `{p}phrases` - Shows all the phrases I might react to.\n\
         `{p}romaji <japanese text>` - Converts Japanese text to Romaji. (e.g., `{p}romaji こんにちは`)\n\
         `{p}furigana <japanese text>` - Shows the hiragana reading of the whole text, not per word. (e.g., `{p}furi 日本語` → `日本語「にほんご」`)\n\
         `{p}translate <text>` - Translates between English and Japanese.\n\
         `{p}full <text>` - Reading, Romaji and translation all at once.\n\
         (Reply to a message with a command to use its text.)",
        emoji = config.emoji(),
        p = prefix,
    );

    let examples: Vec<&str> = config.phrases().into_iter().take(6).collect();
    if !examples.is_empty() {
        help.push_str("\n\nいろいろな　フレーズの　れい： (Examples of various phrases I might react to:)\n");
        let lines: Vec<String> = examples.iter().map(|p| format!("`{p}`")).collect();
        help.push_str(&lines.join("\n"));
        help.push_str("\n\n(ためしてみてね！ - Try them out!)");
    }
    help
}

pub fn phrases_text(config: &TriggerConfig) -> String {
    let emoji = config.emoji();
    let messages = config.messages();
    if config.is_empty() {
        return format!("{} {}", emoji, messages.get(MessageKey::PhrasesListEmpty));
    }

    let message = format!(
        "{} わたしが　はんのうする　かもしれない　フレーズ： (Phrases I might react to:)\n```\n{}\n```",
        emoji,
        config.phrases().join("\n")
    );
    if message.chars().count() > MESSAGE_BUDGET {
        return format!("{} {}", emoji, messages.get(MessageKey::PhrasesListTooLong));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransliterateError;
    use crate::translate::Language;
    use crate::transliterate::Transliteration;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct FakeConverter;

    impl Transliterator for FakeConverter {
        fn transliterate(&self, text: &str) -> Result<Transliteration, TransliterateError> {
            match text {
                "日本" => Ok(Transliteration {
                    reading: "にほん".to_string(),
                    romaji: "nihon".to_string(),
                }),
                _ => Err(TransliterateError::EmptyResult {
                    input: text.to_string(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct FakeTranslator {
        calls: Mutex<Vec<(String, Language, Language)>>,
        unexpected: bool,
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn translate(
            &self,
            text: &str,
            source: Language,
            target: Language,
        ) -> Result<String, TranslateError> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), source, target));
            if self.unexpected {
                return Err(TranslateError::UnexpectedResponse {
                    body: "{}".to_string(),
                });
            }
            Ok(format!("<{}>", text))
        }
    }

    const CONFIG: &str = r#"{
        "shiba_emoji_string": "🐕",
        "phrases": [
            { "triggers": ["good bot"], "response": "😊" },
            { "triggers": ["hi shibako", "!y"], "response": "hi" }
        ]
    }"#;

    fn context(
        transliterator: Option<Arc<dyn Transliterator>>,
        translator: Option<Arc<dyn Translator>>,
    ) -> CommandContext {
        CommandContext {
            prefix: "!".to_string(),
            config: ConfigHandle::new(TriggerConfig::from_json_str("test", CONFIG).unwrap()),
            config_path: PathBuf::from("missing.json"),
            admins: vec![UserId(1)],
            transliterator,
            translator,
        }
    }

    #[test]
    fn parses_names_aliases_and_arguments() {
        assert_eq!(
            parse("!", "!romaji  こんにちは "),
            Some(ParsedCommand {
                command: Command::Romaji,
                args: "こんにちは",
            })
        );
        assert_eq!(parse("!", "!TL hello").unwrap().command, Command::Translate);
        assert_eq!(parse("!", "!furi").unwrap().args, "");
        assert_eq!(parse("!", "!tasukete").unwrap().command, Command::Help);
        assert_eq!(parse("!", "!y"), None);
        assert_eq!(parse("!", "romaji x"), None);
        assert_eq!(parse("$", "$full\nsome text").unwrap().args, "some text");
    }

    #[test]
    fn text_falls_back_to_the_replied_message() {
        assert_eq!(resolve_text(" abc ", Some("other")), "abc");
        assert_eq!(resolve_text("  ", Some(" other ")), "other");
        assert_eq!(resolve_text("", None), "");
    }

    #[test]
    fn phrases_are_listed_sorted() {
        let config = TriggerConfig::from_json_str("test", CONFIG).unwrap();
        let text = phrases_text(&config);
        assert!(text.starts_with("🐕 "));
        assert!(text.ends_with("```\n!y\ngood bot\nhi shibako\n```"));
    }

    #[test]
    fn empty_and_oversized_phrase_lists_use_messages() {
        let empty = TriggerConfig::empty();
        assert!(phrases_text(&empty).ends_with(MessageKey::PhrasesListEmpty.default_text()));

        let triggers: Vec<String> = (0..200).map(|i| format!("\"phrase number {i}\"")).collect();
        let source = format!(
            r#"{{ "phrases": [ {{ "triggers": [{}], "response": "x" }} ] }}"#,
            triggers.join(",")
        );
        let big = TriggerConfig::from_json_str("big", &source).unwrap();
        assert!(phrases_text(&big).ends_with(MessageKey::PhrasesListTooLong.default_text()));
    }

    #[test]
    fn help_lists_commands_and_examples() {
        let config = TriggerConfig::from_json_str("test", CONFIG).unwrap();
        let help = help_text("!", &config);
        assert!(help.contains("`!romaji <japanese text>`"));
        assert!(help.contains("hiragana reading of the whole text"));
        assert!(help.contains("`good bot`"));

        let bare = help_text("?", &TriggerConfig::empty());
        assert!(bare.contains("`?phrases`"));
        assert!(!bare.contains("Try them out"));
    }

    #[tokio::test]
    async fn romaji_and_furigana_use_the_converter() {
        let ctx = context(Some(Arc::new(FakeConverter)), None);

        let reply = ctx.execute(Command::Romaji, UserId(2), "日本").await;
        assert_eq!(reply, CommandReply::say("🐕 \"nihon\""));

        let reply = ctx.execute(Command::Furigana, UserId(2), "日本").await;
        assert_eq!(reply.text, "input: 日本\nmessage: 日本「にほん」");

        let reply = ctx.execute(Command::Romaji, UserId(2), "???").await;
        assert_eq!(
            reply.text,
            format!("🐕 {}", MessageKey::RomajiConversionFailed.default_text())
        );

        let reply = ctx.execute(Command::Furigana, UserId(2), "").await;
        assert_eq!(
            reply.text,
            format!("🐕 {}", MessageKey::FuriganaNoInput.default_text())
        );
    }

    #[tokio::test]
    async fn missing_converter_is_reported() {
        let ctx = context(None, None);
        let reply = ctx.execute(Command::Romaji, UserId(2), "日本").await;
        assert_eq!(
            reply.text,
            format!("🐕 {}", MessageKey::RomajiConverterUnavailable.default_text())
        );
    }

    #[tokio::test]
    async fn translate_detects_direction_and_replies() {
        let translator = Arc::new(FakeTranslator::default());
        let ctx = context(None, Some(translator.clone()));

        let reply = ctx.execute(Command::Translate, UserId(2), "おはよう").await;
        assert_eq!(reply, CommandReply::reply("<おはよう>"));

        ctx.execute(Command::Translate, UserId(2), "good morning").await;
        let calls = translator.calls.lock().unwrap();
        assert_eq!(calls[0].1, Language::Japanese);
        assert_eq!(calls[1].1, Language::English);
        assert_eq!(calls[1].2, Language::Japanese);
    }

    #[tokio::test]
    async fn translate_failures_map_to_messages() {
        let ctx = context(None, None);
        let reply = ctx.execute(Command::Translate, UserId(2), "hello").await;
        assert_eq!(
            reply,
            CommandReply::say(format!("🐕 {}", MessageKey::TranslateNoApiKey.default_text()))
        );

        let broken = Arc::new(FakeTranslator {
            unexpected: true,
            ..Default::default()
        });
        let ctx = context(None, Some(broken));
        let reply = ctx.execute(Command::Translate, UserId(2), "hello").await;
        assert_eq!(
            reply.text,
            format!("🐕 {}", MessageKey::TranslateFormatError.default_text())
        );
    }

    #[tokio::test]
    async fn full_degrades_each_part_independently() {
        let ctx = context(
            Some(Arc::new(FakeConverter)),
            Some(Arc::new(FakeTranslator::default())),
        );
        let reply = ctx.execute(Command::Full, UserId(2), "日本").await;
        assert_eq!(reply.text, "```\n日本\n日本「にほん」\nnihon\n\n<日本>\n```");

        let ctx = context(None, None);
        let reply = ctx.execute(Command::Full, UserId(2), "日本").await;
        let unavailable = MessageKey::FullConverterUnavailable.default_text();
        assert_eq!(
            reply.text,
            format!(
                "```\n日本\n{unavailable}\n{unavailable}\n\n{}\n```",
                MessageKey::FullNoApiKey.default_text()
            )
        );
    }

    #[tokio::test]
    async fn full_output_is_truncated() {
        let ctx = context(None, Some(Arc::new(FakeTranslator::default())));
        let long = "a".repeat(3000);
        let reply = ctx.execute(Command::Full, UserId(2), &long).await;
        assert!(reply.text.ends_with(TRUNCATION_NOTE));
        assert_eq!(
            reply.text.chars().count(),
            MESSAGE_BUDGET + TRUNCATION_NOTE.chars().count()
        );
    }

    #[tokio::test]
    async fn reload_is_admin_only_and_keeps_config_on_failure() {
        let ctx = context(None, None);

        let reply = ctx.execute(Command::Reload, UserId(2), "").await;
        assert_eq!(
            reply.text,
            format!("🐕 {}", MessageKey::ReloadNotAllowed.default_text())
        );

        let reply = ctx.execute(Command::Reload, UserId(1), "").await;
        assert_eq!(
            reply.text,
            format!("🐕 {}", MessageKey::ReloadFailed.default_text())
        );
        assert_eq!(ctx.config.current().phrase_count(), 3);
    }

    #[tokio::test]
    async fn reload_swaps_in_the_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "phrases": [ { "triggers": ["new"], "response": "x" } ] }"#)
            .unwrap();

        let mut ctx = context(None, None);
        ctx.config_path = path;
        let reply = ctx.execute(Command::Reload, UserId(1), "").await;
        assert!(reply.text.contains("1 phrases loaded"));
        assert!(ctx.config.current().rule_for("new").is_some());
    }
}
