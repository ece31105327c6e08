//! Trigger configuration
//!
//! The trigger document is a JSON file listing phrase rules and the rude
//! response policy. It is parsed once into an immutable [`TriggerConfig`];
//! reloading builds a fresh value and swaps it in through a [`ConfigHandle`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::matcher::normalize;
use crate::messages::Messages;

/// Placeholder replaced by the invoker's mention in the rude template.
pub const SENDER_PLACEHOLDER: &str = "{message_sender}";

pub const DEFAULT_EMOJI: &str = "<:shiba:1363005589902589982>";

/// A configured phrase rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRule {
    /// Used only in logs and diagnostics
    pub name: String,
    /// Lowercased phrases that activate this rule
    pub triggers: Vec<String>,
    pub response: String,
    pub allow_rude: bool,
}

/// Process-wide rude response policy
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RudePolicy {
    /// Probability in `[0, 1]` that an eligible activation turns rude
    pub chance: f64,
    /// Sent before the rude message when non-empty
    pub prefix: String,
    /// Must contain [`SENDER_PLACEHOLDER`] for the rude branch to fire
    pub message: String,
}

impl RudePolicy {
    /// Whether the policy can ever produce a rude reply.
    pub fn is_armed(&self) -> bool {
        self.chance > 0.0 && !self.message.is_empty() && self.message.contains(SENDER_PLACEHOLDER)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    phrases: Vec<PhraseDefinition>,
    #[serde(default)]
    rude_response: RudeDefinition,
    #[serde(default)]
    shiba_emoji_string: Option<String>,
    #[serde(default)]
    error_messages: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PhraseDefinition {
    #[serde(default)]
    name: String,
    triggers: Vec<String>,
    response: String,
    #[serde(default)]
    allow_rude_response: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RudeDefinition {
    #[serde(default)]
    chance: f64,
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    message: String,
}

/// Immutable, validated trigger configuration
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    rules: HashMap<String, Arc<TriggerRule>>,
    rude: RudePolicy,
    emoji: String,
    messages: Messages,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::empty()
    }
}

impl TriggerConfig {
    /// A configuration with no phrases and a disarmed rude policy.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
            rude: RudePolicy::default(),
            emoji: DEFAULT_EMOJI.to_string(),
            messages: Messages::default(),
        }
    }

    /// Parse a trigger document. `name` labels the source in diagnostics.
    pub fn from_json_str(name: &str, source: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument = serde_json::from_str(source)
            .map_err(|e| ConfigError::from_json(name, source, &e))?;

        let rude = &document.rude_response;
        if !rude.chance.is_finite() || !(0.0..=1.0).contains(&rude.chance) {
            return Err(ConfigError::invalid(
                name,
                source,
                format!(
                    "rude_response.chance must be between 0 and 1, got {}",
                    rude.chance
                ),
            ));
        }

        let mut rules = HashMap::new();
        for definition in document.phrases {
            let triggers: Vec<String> = definition.triggers.iter().map(|t| normalize(t)).collect();
            // Unnamed rules are logged under their first phrase
            let rule_name = match (definition.name.is_empty(), triggers.first()) {
                (true, Some(first)) => first.clone(),
                _ => definition.name,
            };
            let rule = Arc::new(TriggerRule {
                name: rule_name,
                triggers,
                response: definition.response,
                allow_rude: definition.allow_rude_response,
            });

            for trigger in &rule.triggers {
                if let Some(previous) = rules.insert(trigger.clone(), Arc::clone(&rule)) {
                    debug!(
                        "Trigger '{}' moved from rule '{}' to rule '{}'",
                        trigger, previous.name, rule.name
                    );
                }
            }
        }

        let (messages, unknown) = Messages::from_table(document.error_messages);
        for key in unknown {
            warn!("Ignoring unknown error message key '{}' in {}", key, name);
        }

        let RudeDefinition {
            chance,
            prefix,
            message,
        } = document.rude_response;
        let rude = RudePolicy {
            chance,
            prefix,
            message,
        };
        if rude.chance > 0.0 && !rude.message.contains(SENDER_PLACEHOLDER) {
            warn!(
                "rude_response.message lacks {}; rude replies are disabled",
                SENDER_PLACEHOLDER
            );
        }

        Ok(Self {
            rules,
            rude,
            emoji: document
                .shiba_emoji_string
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_EMOJI.to_string()),
            messages,
        })
    }

    /// Read and parse a trigger document from disk.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let source =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|cause| ConfigError::NotFound {
                    path: path.display().to_string(),
                    cause,
                })?;

        let config = Self::from_json_str(&path.display().to_string(), &source)?;
        info!(
            "Loaded {} trigger phrases from {}",
            config.rules.len(),
            path.display()
        );
        Ok(config)
    }

    /// Rule registered for an already-normalized phrase.
    pub fn rule_for(&self, normalized: &str) -> Option<&Arc<TriggerRule>> {
        self.rules.get(normalized)
    }

    pub fn rude_policy(&self) -> &RudePolicy {
        &self.rude
    }

    pub fn emoji(&self) -> &str {
        &self.emoji
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn phrase_count(&self) -> usize {
        self.rules.len()
    }

    /// Every trigger phrase, sorted.
    pub fn phrases(&self) -> Vec<&str> {
        let mut phrases: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        phrases.sort_unstable();
        phrases
    }

    /// `(phrase, rule)` pairs sorted by phrase.
    pub fn entries(&self) -> Vec<(&str, &TriggerRule)> {
        let mut entries: Vec<(&str, &TriggerRule)> = self
            .rules
            .iter()
            .map(|(phrase, rule)| (phrase.as_str(), rule.as_ref()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Phrases that start with the command prefix. Those messages go to the
    /// command parser, so these phrases can never fire.
    pub fn shadowed_by_prefix(&self, prefix: &str) -> Vec<&str> {
        if prefix.is_empty() {
            return Vec::new();
        }
        let prefix = normalize(prefix);
        self.phrases()
            .into_iter()
            .filter(|phrase| phrase.starts_with(prefix.as_str()))
            .collect()
    }
}

/// Shared, atomically swappable reference to the current configuration.
///
/// Readers take a snapshot with [`ConfigHandle::current`] and keep using it
/// for the whole message, so a concurrent reload never shows them a mix of
/// old and new rules.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<ArcSwap<TriggerConfig>>,
}

impl ConfigHandle {
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    pub fn current(&self) -> Arc<TriggerConfig> {
        self.inner.load_full()
    }

    pub fn replace(&self, config: TriggerConfig) {
        self.inner.store(Arc::new(config));
    }

    /// Load `path` and swap it in. On failure the current configuration stays
    /// in place.
    pub async fn reload(&self, path: &Path) -> Result<Arc<TriggerConfig>, ConfigError> {
        let config = Arc::new(TriggerConfig::load(path).await?);
        self.inner.store(Arc::clone(&config));
        info!("Reloaded trigger configuration from {}", path.display());
        Ok(config)
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(TriggerConfig::empty())
    }
}
