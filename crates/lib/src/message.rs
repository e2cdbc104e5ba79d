//! Inbound wire events from the chat client and the canonical messages handed to the bot runtime.

use crate::participants::Participant;
use crate::room::{ChannelDescriptor, MessageId, RoomAddress};
use serde::{Deserialize, Deserializer, Serialize};

/// One raw chat event as delivered by the chat client's subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    /// Per-channel sequence token. Keybase sends a number; kept opaque.
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub channel: ChannelDescriptor,
    pub sender: Sender,
    pub content: Content,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    #[serde(alias = "uid")]
    pub id: String,
    pub username: String,
}

/// Recognized content kinds; anything else lands in `Unrecognized`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: TextBody },
    Join,
    Leave,
    /// Carries no reliable sender identity; never forwarded.
    System,
    /// Link preview notification.
    Unfurl,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub body: String,
}

fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Number(n) => n.to_string(),
        Id::Text(s) => s,
    })
}

/// Backend-agnostic message the bot runtime consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CanonicalMessage {
    Text {
        user: Participant,
        room: RoomAddress,
        body: String,
        id: MessageId,
    },
    Enter {
        user: Participant,
        room: RoomAddress,
        id: MessageId,
    },
    Leave {
        user: Participant,
        room: RoomAddress,
        id: MessageId,
    },
}

impl CanonicalMessage {
    pub fn user(&self) -> &Participant {
        match self {
            Self::Text { user, .. } | Self::Enter { user, .. } | Self::Leave { user, .. } => user,
        }
    }

    pub fn room(&self) -> &RoomAddress {
        match self {
            Self::Text { room, .. } | Self::Enter { room, .. } | Self::Leave { room, .. } => room,
        }
    }

    pub fn id(&self) -> &MessageId {
        match self {
            Self::Text { id, .. } | Self::Enter { id, .. } | Self::Leave { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::MembersType;

    #[test]
    fn text_event_with_numeric_id() {
        let json = r#"{
            "id": 42,
            "channel": {"name": "alice,bob", "members_type": "impteamnative", "topic_type": "chat"},
            "sender": {"uid": "u-1", "username": "alice", "device_id": "d"},
            "sent_at": 1700000000,
            "content": {"type": "text", "text": {"body": "hello", "payments": null}}
        }"#;
        let event: RawEvent = serde_json::from_str(json).expect("parse text event");
        assert_eq!(event.id, "42");
        assert_eq!(event.sender.id, "u-1");
        assert_eq!(event.channel.members_type, MembersType::MultiParty);
        match event.content {
            Content::Text { text } => assert_eq!(text.body, "hello"),
            other => panic!("expected text content, got {:?}", other),
        }
    }

    #[test]
    fn unknown_content_kind_is_unrecognized() {
        let json = r#"{
            "id": "9",
            "channel": {"name": "eng", "members_type": "team", "topic_name": "general"},
            "sender": {"id": "u-2", "username": "bob"},
            "content": {"type": "attachment", "attachment": {"object": {}}}
        }"#;
        let event: RawEvent = serde_json::from_str(json).expect("parse attachment event");
        assert!(matches!(event.content, Content::Unrecognized));
    }

    #[test]
    fn system_and_unfurl_payloads_parse_without_detail() {
        let system: Content =
            serde_json::from_str(r#"{"type":"system","system":{"systemType":0}}"#).expect("system");
        assert!(matches!(system, Content::System));
        let unfurl: Content =
            serde_json::from_str(r#"{"type":"unfurl","unfurl":{"url":"https://x"}}"#).expect("unfurl");
        assert!(matches!(unfurl, Content::Unfurl));
    }

    #[test]
    fn text_without_body_is_rejected() {
        let res: Result<Content, _> = serde_json::from_str(r#"{"type":"text"}"#);
        assert!(res.is_err());
    }
}
