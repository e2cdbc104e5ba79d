//! Inbound normalization: one raw chat event -> zero or one canonical message.
//!
//! Every event upserts its sender. Only text, join and leave content reach the
//! runtime; system notices, unfurls and unrecognized kinds are dropped.

use crate::message::{CanonicalMessage, Content, RawEvent};
use crate::participants::ParticipantRegistry;
use crate::room;

/// Names the bot answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub name: String,
    pub alias: Option<String>,
}

impl BotIdentity {
    pub fn new(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.filter(|a| !a.is_empty()),
        }
    }

    /// True if `body` (after one optional leading `@`) starts with the bot's name or alias.
    pub fn is_named_in(&self, body: &str) -> bool {
        let rest = body.strip_prefix('@').unwrap_or(body);
        rest.starts_with(self.name.as_str())
            || self
                .alias
                .as_deref()
                .map_or(false, |alias| rest.starts_with(alias))
    }
}

/// Converts raw events into canonical messages for one bot identity.
#[derive(Debug, Clone)]
pub struct MessageNormalizer {
    identity: BotIdentity,
}

impl MessageNormalizer {
    pub fn new(identity: BotIdentity) -> Self {
        Self { identity }
    }

    pub fn normalize(
        &self,
        event: &RawEvent,
        users: &ParticipantRegistry,
    ) -> Option<CanonicalMessage> {
        let room = room::encode(&event.channel);
        let id = room::compose_message_id(&room, &event.id);
        let user = users.upsert(
            &event.sender.id,
            &event.sender.username,
            &room,
            event.channel.members_type.clone(),
        );

        match &event.content {
            Content::Join => Some(CanonicalMessage::Enter { user, room, id }),
            Content::Leave => Some(CanonicalMessage::Leave { user, room, id }),
            Content::Text { text } => {
                let body = self.address_direct_message(&event.channel, &text.body);
                Some(CanonicalMessage::Text { user, room, body, id })
            }
            Content::System | Content::Unfurl | Content::Unrecognized => {
                log::debug!("dropping {:?} event {} from {}", event.content, id, user.name);
                None
            }
        }
    }

    /// In a two-party conversation every message is meant for the bot, so prefix
    /// the bot's name unless the sender already used it.
    fn address_direct_message(&self, channel: &room::ChannelDescriptor, body: &str) -> String {
        if channel.is_two_party() && !self.identity.is_named_in(body) {
            format!("{} {}", self.identity.name, body)
        } else {
            body.to_string()
        }
    }
}
