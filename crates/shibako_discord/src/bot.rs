use std::path::PathBuf;
use std::sync::Arc;

use serenity::Client;
use serenity::all::GatewayIntents;
use shibako_core::commands::CommandContext;
use shibako_core::translate::Translator;
use shibako_core::transliterate::Transliterator;
use shibako_core::{ConfigHandle, UserId};
use tracing::info;

use crate::error::{DiscordError, Result};
use crate::handler::ShibakoHandler;

/// The running Discord side of Shibako
pub struct DiscordBot {
    client: Client,
    token: String,
}

/// Configuration for the Discord bot
#[derive(Debug, Clone)]
pub struct DiscordBotConfig {
    pub token: String,
    pub prefix: String,
    pub intents: GatewayIntents,
    pub admin_users: Vec<UserId>,
    /// Trigger document reread by the reload command
    pub config_path: PathBuf,
}

impl DiscordBotConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            prefix: "!".to_string(),
            intents: default_intents(),
            admin_users: Vec::new(),
            config_path: PathBuf::from("config.json"),
        }
    }
}

/// Guild and DM messages, with their content.
pub fn default_intents() -> GatewayIntents {
    GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// Builder for creating a Discord bot
pub struct DiscordBotBuilder {
    config: DiscordBotConfig,
    triggers: ConfigHandle,
    transliterator: Option<Arc<dyn Transliterator>>,
    translator: Option<Arc<dyn Translator>>,
}

impl DiscordBotBuilder {
    pub fn new(token: impl Into<String>, triggers: ConfigHandle) -> Self {
        Self {
            config: DiscordBotConfig::new(token),
            triggers,
            transliterator: None,
            translator: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    pub fn with_intents(mut self, intents: GatewayIntents) -> Self {
        self.config.intents = intents;
        self
    }

    pub fn with_admin_users(mut self, users: Vec<UserId>) -> Self {
        self.config.admin_users = users;
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config_path = path.into();
        self
    }

    pub fn with_transliterator(mut self, converter: Option<Arc<dyn Transliterator>>) -> Self {
        self.transliterator = converter;
        self
    }

    pub fn with_translator(mut self, translator: Option<Arc<dyn Translator>>) -> Self {
        self.translator = translator;
        self
    }

    /// Command context the handler will run with.
    fn command_context(&self) -> CommandContext {
        CommandContext {
            prefix: self.config.prefix.clone(),
            config: self.triggers.clone(),
            config_path: self.config.config_path.clone(),
            admins: self.config.admin_users.clone(),
            transliterator: self.transliterator.clone(),
            translator: self.translator.clone(),
        }
    }

    pub async fn build(self) -> Result<DiscordBot> {
        let token = self.config.token.trim().to_string();
        if token.is_empty() {
            return Err(DiscordError::missing_token());
        }
        if self.config.prefix.is_empty() {
            return Err(DiscordError::InvalidBotConfiguration {
                issues: "the command prefix must not be empty".to_string(),
                missing_fields: vec!["prefix".to_string()],
            });
        }

        let handler = ShibakoHandler::new(self.command_context());
        let client = Client::builder(&token, self.config.intents)
            .event_handler(handler)
            .await
            .map_err(|cause| DiscordError::ClientBuildFailed { cause })?;

        Ok(DiscordBot { client, token })
    }
}

impl DiscordBot {
    /// Connect and process events until the gateway stops.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting Discord bot...");
        self.client
            .start()
            .await
            .map_err(|cause| DiscordError::from_gateway(cause, &self.token))
    }

    /// Run until the gateway stops or `shutdown` resolves, then close all shards.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let shard_manager = self.client.shard_manager.clone();
        tokio::select! {
            result = self.start() => result,
            _ = shutdown => {
                info!("Shutting down Discord connection");
                shard_manager.shutdown_all().await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let result = DiscordBotBuilder::new("   ", ConfigHandle::default()).build().await;
        assert!(matches!(
            result,
            Err(DiscordError::InvalidBotConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn empty_prefix_is_rejected() {
        let result = DiscordBotBuilder::new("token", ConfigHandle::default())
            .with_prefix("")
            .build()
            .await;
        match result {
            Err(DiscordError::InvalidBotConfiguration { missing_fields, .. }) => {
                assert_eq!(missing_fields, vec!["prefix".to_string()]);
            }
            _ => panic!("expected a configuration error"),
        }
    }

    #[test]
    fn builder_carries_settings_into_commands() {
        let builder = DiscordBotBuilder::new("token", ConfigHandle::default())
            .with_prefix("?")
            .with_admin_users(vec![UserId(5)])
            .with_config_path("triggers.json");
        let ctx = builder.command_context();
        assert_eq!(ctx.prefix, "?");
        assert_eq!(ctx.admins, vec![UserId(5)]);
        assert_eq!(ctx.config_path, PathBuf::from("triggers.json"));
        assert!(ctx.translator.is_none());
    }
}
