//! Shibako core
//!
//! Trigger phrase matching and reply planning for the Shibako chat bot, plus
//! the text commands (romanization, readings, translation) that sit beside it.
//! Nothing here talks to a chat platform directly: inbound messages arrive as
//! [`IncomingMessage`] values and replies leave through a [`MessageSender`].

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod messages;
pub mod selector;
pub mod translate;
pub mod transliterate;

pub use config::{ConfigHandle, RudePolicy, TriggerConfig, TriggerRule};
pub use dispatch::{
    ChannelId, DispatchOutcome, Dispatcher, IgnoreReason, IncomingMessage, MessageSender, Triage,
    UserId, triage,
};
pub use error::{ConfigError, SendFailure, TranslateError, TransliterateError};
pub use matcher::{match_trigger, normalize};
pub use selector::{Draw, PACING_DELAY, ReplyKind, ReplyPlan, ReplyStep, select};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        ChannelId, ConfigError, ConfigHandle, DispatchOutcome, Dispatcher, IncomingMessage,
        MessageSender, ReplyPlan, ReplyStep, SendFailure, TriggerConfig, UserId,
        commands::{Command, CommandContext, CommandReply},
    };
}
