//! Inbound message handling for trigger phrases
//!
//! The gateway hands every message to [`Dispatcher::on_incoming_message`].
//! Self-authored and command-prefixed messages are dropped, everything else is
//! matched against the current [`TriggerConfig`] snapshot and the resulting
//! [`ReplyPlan`] is delivered step by step through a [`MessageSender`].

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ConfigHandle, TriggerConfig, TriggerRule};
use crate::error::SendFailure;
use crate::matcher::{match_trigger, normalize};
use crate::selector::{Draw, ReplyKind, ReplyPlan, select};

/// Chat channel reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat user reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message as seen by the trigger engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub channel: ChannelId,
    pub author: UserId,
    pub text: String,
    /// Written by the bot's own account
    pub is_self: bool,
    /// Starts with the command prefix and belongs to the command subsystem
    pub has_command_prefix: bool,
}

impl IncomingMessage {
    pub fn new(
        channel: ChannelId,
        author: UserId,
        text: impl Into<String>,
        bot: Option<UserId>,
        prefix: &str,
    ) -> Self {
        let text = text.into();
        Self {
            channel,
            author,
            is_self: bot == Some(author),
            has_command_prefix: !prefix.is_empty() && text.starts_with(prefix),
            text,
        }
    }
}

/// Outbound side of the chat gateway
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Format a user reference the way the platform renders mentions.
    fn mention(&self, user: UserId) -> String;

    async fn send(&self, channel: ChannelId, text: &str) -> Result<(), SendFailure>;
}

#[async_trait]
impl<S: MessageSender + ?Sized> MessageSender for Arc<S> {
    fn mention(&self, user: UserId) -> String {
        (**self).mention(user)
    }

    async fn send(&self, channel: ChannelId, text: &str) -> Result<(), SendFailure> {
        (**self).send(channel, text).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OwnMessage,
    Command,
}

/// What the engine decided for one message, before anything is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Triage {
    Ignored(IgnoreReason),
    NoMatch,
    Planned {
        rule: Arc<TriggerRule>,
        plan: ReplyPlan,
    },
}

/// Filter, match and plan a reply for `message` against `config`.
pub fn triage<D: Draw + ?Sized>(
    config: &TriggerConfig,
    message: &IncomingMessage,
    mention: &str,
    rng: &mut D,
) -> Triage {
    if message.is_self {
        return Triage::Ignored(IgnoreReason::OwnMessage);
    }
    if message.has_command_prefix {
        return Triage::Ignored(IgnoreReason::Command);
    }

    match match_trigger(config, &normalize(&message.text)) {
        Some(rule) => {
            let plan = select(&rule, config.rude_policy(), mention, rng);
            Triage::Planned { rule, plan }
        }
        None => Triage::NoMatch,
    }
}

/// Result of handling one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    NoMatch,
    Delivered {
        rule: String,
        kind: ReplyKind,
        steps: usize,
    },
    /// A send failed; later steps were dropped
    Abandoned {
        rule: String,
        sent: usize,
        remaining: usize,
    },
}

pub struct Dispatcher<S> {
    config: ConfigHandle,
    sender: S,
    rng: Mutex<StdRng>,
}

impl<S: MessageSender> Dispatcher<S> {
    pub fn new(config: ConfigHandle, sender: S) -> Self {
        Self::with_rng(config, sender, StdRng::from_os_rng())
    }

    /// Use a specific generator for the rude roll, mainly for reproducible runs.
    pub fn with_rng(config: ConfigHandle, sender: S, rng: StdRng) -> Self {
        Self {
            config,
            sender,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Handle one inbound message to completion, pauses included.
    ///
    /// Dropping the returned future stops delivery; unsent steps are lost.
    pub async fn on_incoming_message(&self, message: IncomingMessage) -> DispatchOutcome {
        let config = self.config.current();
        let mention = self.sender.mention(message.author);

        let decision = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            triage(&config, &message, &mention, &mut *rng)
        };

        let (rule, plan) = match decision {
            Triage::Ignored(reason) => return DispatchOutcome::Ignored(reason),
            Triage::NoMatch => return DispatchOutcome::NoMatch,
            Triage::Planned { rule, plan } => (rule, plan),
        };

        debug!(
            "Message from {} in {} matched rule '{}' ({:?}, {} steps)",
            message.author,
            message.channel,
            rule.name,
            plan.kind,
            plan.len()
        );

        self.deliver(message.channel, &rule, plan).await
    }

    async fn deliver(
        &self,
        channel: ChannelId,
        rule: &TriggerRule,
        plan: ReplyPlan,
    ) -> DispatchOutcome {
        let kind = plan.kind;
        let total = plan.len();

        for (index, step) in plan.steps.into_iter().enumerate() {
            tokio::time::sleep(step.delay).await;

            if let Err(failure) = self.sender.send(channel, &step.text).await {
                warn!(
                    "Dropping {} remaining step(s) of rule '{}': {} ({})",
                    total - index,
                    rule.name,
                    failure,
                    failure.cause
                );
                return DispatchOutcome::Abandoned {
                    rule: rule.name.clone(),
                    sent: index,
                    remaining: total - index,
                };
            }
        }

        DispatchOutcome::Delivered {
            rule: rule.name.clone(),
            kind,
            steps: total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriggerConfig;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Records every send with the time it happened.
    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(ChannelId, String, Instant)>>,
        fail_on: Option<usize>,
    }

    impl Recorder {
        fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, text, _)| text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl MessageSender for Recorder {
        fn mention(&self, user: UserId) -> String {
            format!("@U{}", user)
        }

        async fn send(&self, channel: ChannelId, text: &str) -> Result<(), SendFailure> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_on == Some(sent.len()) {
                return Err(SendFailure {
                    channel,
                    cause: "missing permissions".into(),
                });
            }
            sent.push((channel, text.to_string(), Instant::now()));
            Ok(())
        }
    }

    fn handle(rude: &str) -> ConfigHandle {
        let source = format!(
            r#"{{ "phrases": [ {{ "name": "praise", "triggers": ["good bot"], "response": "😊", "allow_rude_response": true }} ],
                 "rude_response": {rude} }}"#
        );
        ConfigHandle::new(TriggerConfig::from_json_str("test", &source).unwrap())
    }

    fn message(text: &str) -> IncomingMessage {
        IncomingMessage::new(ChannelId(10), UserId(123), text, Some(UserId(1)), "!")
    }

    #[test]
    fn classifies_self_and_command_messages() {
        let own = IncomingMessage::new(ChannelId(1), UserId(5), "good bot", Some(UserId(5)), "!");
        assert!(own.is_self);
        assert!(!own.has_command_prefix);

        let command = message("!romaji test");
        assert!(!command.is_self);
        assert!(command.has_command_prefix);

        let unknown_bot = IncomingMessage::new(ChannelId(1), UserId(5), "hi", None, "!");
        assert!(!unknown_bot.is_self);
    }

    #[tokio::test(start_paused = true)]
    async fn standard_reply_waits_before_sending() {
        let dispatcher = Dispatcher::new(handle(r#"{ "chance": 0.0 }"#), Recorder::default());
        let start = Instant::now();

        let outcome = dispatcher.on_incoming_message(message("Good Bot")).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Delivered {
                rule: "praise".to_string(),
                kind: ReplyKind::Standard,
                steps: 1,
            }
        );
        let sent = dispatcher.sender().sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChannelId(10));
        assert_eq!(sent[0].1, "😊");
        assert!(sent[0].2 - start >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn rude_reply_sends_prefix_then_mention() {
        let dispatcher = Dispatcher::new(
            handle(r#"{ "chance": 1.0, "prefix": "...", "message": "rude {message_sender}" }"#),
            Recorder::default(),
        );
        let start = Instant::now();

        dispatcher.on_incoming_message(message("good bot")).await;

        let sent = dispatcher.sender().sent.lock().unwrap();
        let texts: Vec<&str> = sent.iter().map(|(_, text, _)| text.as_str()).collect();
        assert_eq!(texts, vec!["...", "rude @U123"]);
        assert!(sent[0].2 - start >= Duration::from_secs(1));
        assert!(sent[1].2 - sent[0].2 >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_abandons_the_rest() {
        let recorder = Recorder {
            fail_on: Some(0),
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(
            handle(r#"{ "chance": 1.0, "prefix": "...", "message": "rude {message_sender}" }"#),
            recorder,
        );

        let outcome = dispatcher.on_incoming_message(message("good bot")).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Abandoned {
                rule: "praise".to_string(),
                sent: 0,
                remaining: 2,
            }
        );
        assert!(dispatcher.sender().texts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_midway_keeps_what_was_sent() {
        let recorder = Recorder {
            fail_on: Some(1),
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(
            handle(r#"{ "chance": 1.0, "prefix": "...", "message": "rude {message_sender}" }"#),
            recorder,
        );

        let outcome = dispatcher.on_incoming_message(message("good bot")).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Abandoned {
                rule: "praise".to_string(),
                sent: 1,
                remaining: 1,
            }
        );
        assert_eq!(dispatcher.sender().texts(), vec!["...".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_own_and_command_messages() {
        let dispatcher = Dispatcher::new(handle(r#"{ "chance": 0.0 }"#), Recorder::default());

        let own = IncomingMessage::new(ChannelId(10), UserId(1), "good bot", Some(UserId(1)), "!");
        assert_eq!(
            dispatcher.on_incoming_message(own).await,
            DispatchOutcome::Ignored(IgnoreReason::OwnMessage)
        );
        assert_eq!(
            dispatcher.on_incoming_message(message("!good bot")).await,
            DispatchOutcome::Ignored(IgnoreReason::Command)
        );
        assert_eq!(
            dispatcher.on_incoming_message(message("bad bot")).await,
            DispatchOutcome::NoMatch
        );
        assert!(dispatcher.sender().texts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reload_applies_to_the_next_message() {
        let dispatcher = Dispatcher::new(ConfigHandle::default(), Recorder::default());
        assert_eq!(
            dispatcher.on_incoming_message(message("good bot")).await,
            DispatchOutcome::NoMatch
        );

        dispatcher.config().replace(handle(r#"{ "chance": 0.0 }"#).current().as_ref().clone());
        dispatcher.on_incoming_message(message("good bot")).await;
        assert_eq!(dispatcher.sender().texts(), vec!["😊".to_string()]);
    }

    #[test]
    fn triage_plans_without_sending() {
        let config = handle(r#"{ "chance": 0.0 }"#).current();
        match triage(&config, &message("GOOD BOT"), "@U123", &mut rand::rng()) {
            Triage::Planned { rule, plan } => {
                assert_eq!(rule.name, "praise");
                assert_eq!(plan, ReplyPlan::standard(&rule));
            }
            other => panic!("unexpected triage: {other:?}"),
        }
    }
}
