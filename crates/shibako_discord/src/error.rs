use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DiscordError {
    #[error("Discord authentication failed")]
    #[diagnostic(
        code(shibako::discord::auth_failed),
        help("Check that your Discord bot token is valid and has not been regenerated")
    )]
    AuthenticationFailed {
        #[source]
        cause: serenity::Error,
        token_preview: String, // First/last few chars of token for debugging
    },

    #[error("Invalid bot configuration")]
    #[diagnostic(
        code(shibako::discord::invalid_bot_config),
        help("Bot configuration error: {issues}")
    )]
    InvalidBotConfiguration {
        issues: String,
        missing_fields: Vec<String>,
    },

    #[error("Failed to build the Discord client")]
    #[diagnostic(code(shibako::discord::client_build_failed))]
    ClientBuildFailed {
        #[source]
        cause: serenity::Error,
    },

    #[error("Message send failed")]
    #[diagnostic(
        code(shibako::discord::message_send_failed),
        help("Failed to send message to {destination}")
    )]
    MessageSendFailed {
        destination: String,
        message_length: usize,
        #[source]
        cause: serenity::Error,
    },

    #[error("Could not fetch the replied message")]
    #[diagnostic(
        code(shibako::discord::reference_fetch_failed),
        help("Message {message_id} in channel {channel_id} may be deleted or out of reach")
    )]
    ReferenceFetchFailed {
        channel_id: u64,
        message_id: u64,
        #[source]
        cause: serenity::Error,
    },

    #[error("Gateway connection lost")]
    #[diagnostic(
        code(shibako::discord::gateway_connection_lost),
        help("The Discord gateway stopped; restart the bot")
    )]
    GatewayConnectionLost {
        #[source]
        cause: serenity::Error,
    },
}

pub type Result<T> = std::result::Result<T, DiscordError>;

impl DiscordError {
    pub fn auth_failed(cause: serenity::Error, token: &str) -> Self {
        // Show first 6 and last 4 characters of token for debugging
        let token_preview = if token.len() > 10 && token.is_ascii() {
            format!("{}...{}", &token[..6], &token[token.len() - 4..])
        } else {
            "***".to_string()
        };

        Self::AuthenticationFailed {
            cause,
            token_preview,
        }
    }

    pub fn missing_token() -> Self {
        Self::InvalidBotConfiguration {
            issues: "no Discord token was provided".to_string(),
            missing_fields: vec!["DISCORD_TOKEN".to_string()],
        }
    }

    pub fn send_failed(destination: impl Into<String>, content: &str, cause: serenity::Error) -> Self {
        Self::MessageSendFailed {
            destination: destination.into(),
            message_length: content.chars().count(),
            cause,
        }
    }

    /// Classify an error that ended the gateway session.
    pub fn from_gateway(cause: serenity::Error, token: &str) -> Self {
        match cause {
            serenity::Error::Gateway(serenity::gateway::GatewayError::InvalidAuthentication) => {
                Self::auth_failed(cause, token)
            }
            cause => Self::GatewayConnectionLost { cause },
        }
    }
}
