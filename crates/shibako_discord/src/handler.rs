//! Gateway event handling
//!
//! Ordinary messages go to the trigger [`Dispatcher`]; prefixed ones are
//! parsed and answered by the command subsystem. Serenity runs each event in
//! its own task, so a paced reply never holds up other messages.

use std::sync::OnceLock;

use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use shibako_core::commands::{self, CommandContext, ParsedCommand};
use shibako_core::messages::MessageKey;
use shibako_core::{ChannelId, DispatchOutcome, Dispatcher, IncomingMessage, UserId};
use tracing::{debug, error, info, warn};

use crate::error::{DiscordError, Result};
use crate::sender::SerenitySender;

/// State that only exists once the gateway has told us who we are
struct Session {
    bot: UserId,
    dispatcher: Dispatcher<SerenitySender>,
}

pub struct ShibakoHandler {
    commands: CommandContext,
    session: OnceLock<Session>,
}

impl ShibakoHandler {
    pub fn new(commands: CommandContext) -> Self {
        Self {
            commands,
            session: OnceLock::new(),
        }
    }

    async fn run_command(&self, ctx: &Context, msg: &Message, parsed: ParsedCommand<'_>) {
        info!(
            "Command {:?} from {} in {}",
            parsed.command, msg.author.id, msg.channel_id
        );

        let replied = if parsed.command.takes_text() && parsed.args.trim().is_empty() {
            match replied_text(ctx, msg).await {
                Ok(replied) => replied,
                Err(e) => {
                    warn!("{}", e);
                    let config = self.commands.config.current();
                    self.post(ctx, msg, &commands::notice(&config, MessageKey::FetchFailed), false)
                        .await;
                    return;
                }
            }
        } else {
            None
        };

        let text = commands::resolve_text(parsed.args, replied.as_deref());
        let reply = self
            .commands
            .execute(parsed.command, UserId(msg.author.id.get()), &text)
            .await;
        self.post(ctx, msg, &reply.text, reply.as_reply).await;
    }

    async fn post(&self, ctx: &Context, msg: &Message, text: &str, as_reply: bool) {
        let sent = if as_reply {
            msg.reply(ctx, text).await
        } else {
            msg.channel_id.say(&ctx.http, text).await
        };
        if let Err(cause) = sent {
            let e = DiscordError::send_failed(format!("channel {}", msg.channel_id), text, cause);
            error!("{:?}", miette::Report::new(e));
        }
    }
}

/// Content of the message `msg` replies to, fetching it when the gateway
/// did not include it.
async fn replied_text(ctx: &Context, msg: &Message) -> Result<Option<String>> {
    if let Some(referenced) = &msg.referenced_message {
        return Ok(Some(referenced.content.clone()));
    }
    let Some(reference) = &msg.message_reference else {
        return Ok(None);
    };
    let Some(message_id) = reference.message_id else {
        return Ok(None);
    };

    reference
        .channel_id
        .message(ctx, message_id)
        .await
        .map(|fetched| Some(fetched.content))
        .map_err(|cause| DiscordError::ReferenceFetchFailed {
            channel_id: reference.channel_id.get(),
            message_id: message_id.get(),
            cause,
        })
}

#[async_trait]
impl EventHandler for ShibakoHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        let bot = UserId(ready.user.id.get());
        let session = self.session.get_or_init(|| Session {
            bot,
            dispatcher: Dispatcher::new(
                self.commands.config.clone(),
                SerenitySender::new(ctx.http.clone()),
            ),
        });
        if session.bot != bot {
            warn!(
                "Reconnected as {} but the session belongs to {}",
                bot, session.bot
            );
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let Some(session) = self.session.get() else {
            debug!("Message {} arrived before ready, skipping", msg.id);
            return;
        };

        let incoming = IncomingMessage::new(
            ChannelId(msg.channel_id.get()),
            UserId(msg.author.id.get()),
            msg.content.as_str(),
            Some(session.bot),
            &self.commands.prefix,
        );

        if incoming.has_command_prefix && !incoming.is_self {
            if let Some(parsed) = commands::parse(&self.commands.prefix, &msg.content) {
                self.run_command(&ctx, &msg, parsed).await;
            }
            return;
        }

        match session.dispatcher.on_incoming_message(incoming).await {
            DispatchOutcome::Ignored(_) | DispatchOutcome::NoMatch => {}
            outcome => debug!("Trigger handled for message {}: {:?}", msg.id, outcome),
        }
    }
}
