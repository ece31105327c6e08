//! Shibako Discord - gateway integration
//!
//! Connects the trigger engine and text commands from `shibako_core` to a
//! Discord bot account through serenity.

pub mod bot;
pub mod error;
pub mod handler;
pub mod sender;

pub use bot::{DiscordBot, DiscordBotBuilder, DiscordBotConfig, default_intents};
pub use error::{DiscordError, Result};
pub use handler::ShibakoHandler;
pub use sender::SerenitySender;

// Re-export serenity for convenience
pub use serenity;
