use std::sync::Arc;

use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::id;
use serenity::model::mention::Mentionable;
use shibako_core::{ChannelId, MessageSender, SendFailure, UserId};

/// [`MessageSender`] that posts through the Discord REST API
#[derive(Clone)]
pub struct SerenitySender {
    http: Arc<Http>,
}

impl SerenitySender {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MessageSender for SerenitySender {
    fn mention(&self, user: UserId) -> String {
        mention(user)
    }

    async fn send(&self, channel: ChannelId, text: &str) -> Result<(), SendFailure> {
        id::ChannelId::new(channel.0)
            .say(&self.http, text)
            .await
            .map(|_| ())
            .map_err(|cause| SendFailure {
                channel,
                cause: Box::new(cause),
            })
    }
}

/// Discord mention markup for `user`, `<@id>`.
pub fn mention(user: UserId) -> String {
    id::UserId::new(user.0).mention().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mentions_use_discord_markup() {
        assert_eq!(mention(UserId(123)), "<@123>");
    }
}
