//! Room addressing: Keybase channel descriptor <-> single room address string.
//!
//! Team channels encode as `team#topic`; implicit-team conversations (DMs and
//! small groups) are addressed by their comma-separated member list, which is
//! already the channel name.
//!
//! Membership is counted by splitting on `,`, so a team name that contains a
//! comma decodes as a multi-party conversation. That classification is part of
//! the observable addressing and is kept as-is.

use serde::{Deserialize, Serialize};
use std::fmt;

const TOPIC_SEPARATOR: char = '#';
const MEMBER_SEPARATOR: char = ',';
const MESSAGE_ID_SEPARATOR: char = '@';
const CHAT_TOPIC_TYPE: &str = "chat";

/// Who the members of a conversation are: a named team or an ad-hoc member list.
///
/// Only `impteamnative` counts as multi-party. Any other kind (`impteamupgrade`,
/// legacy `kbfs`, ...) is kept verbatim so its events still get through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MembersType {
    Team,
    /// Implicit team built from the participant list (DMs and group chats).
    MultiParty,
    Other(String),
}

impl From<String> for MembersType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "team" => Self::Team,
            "impteamnative" => Self::MultiParty,
            _ => Self::Other(s),
        }
    }
}

impl From<MembersType> for String {
    fn from(kind: MembersType) -> Self {
        match kind {
            MembersType::Team => "team".to_string(),
            MembersType::MultiParty => "impteamnative".to_string(),
            MembersType::Other(s) => s,
        }
    }
}

/// Channel as the Keybase chat API describes it (wire names are snake_case).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub name: String,
    #[serde(default)]
    pub public: bool,
    pub members_type: MembersType,
    #[serde(default = "default_topic_type")]
    pub topic_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,
}

fn default_topic_type() -> String {
    CHAT_TOPIC_TYPE.to_string()
}

impl ChannelDescriptor {
    /// Team channel descriptor (`eng` + `general`).
    pub fn team(name: impl Into<String>, topic_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public: false,
            members_type: MembersType::Team,
            topic_type: default_topic_type(),
            topic_name: Some(topic_name.into()),
        }
    }

    /// Multi-party descriptor from a comma-separated member list (`alice,bob`).
    pub fn multi_party(members: impl Into<String>) -> Self {
        Self {
            name: members.into(),
            public: false,
            members_type: MembersType::MultiParty,
            topic_type: default_topic_type(),
            topic_name: None,
        }
    }

    /// True for a multi-party conversation between exactly two members.
    pub fn is_two_party(&self) -> bool {
        self.members_type == MembersType::MultiParty && participant_count(&self.name) == 2
    }
}

/// Canonical room identity used everywhere downstream of the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomAddress(String);

impl RoomAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RoomAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Message id scoped to a room: `room@raw_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Number of comma-separated members in a channel name or room address.
pub fn participant_count(name: &str) -> usize {
    name.split(MEMBER_SEPARATOR).count()
}

/// Room address for a channel: the name alone, or `name#topic` for team channels.
pub fn encode(channel: &ChannelDescriptor) -> RoomAddress {
    match channel.topic_name.as_deref() {
        Some(topic) if !topic.is_empty() => {
            RoomAddress(format!("{}{}{}", channel.name, TOPIC_SEPARATOR, topic))
        }
        _ => RoomAddress(channel.name.clone()),
    }
}

/// Rebuild a descriptor the chat API accepts for sending, from a room address alone.
pub fn decode(address: &RoomAddress) -> ChannelDescriptor {
    let address = address.as_str();
    if participant_count(address) > 1 {
        return ChannelDescriptor::multi_party(address);
    }
    let mut parts = address.splitn(2, TOPIC_SEPARATOR);
    let team = parts.next().unwrap_or_default();
    ChannelDescriptor {
        name: team.to_string(),
        public: false,
        members_type: MembersType::Team,
        topic_type: default_topic_type(),
        topic_name: parts.next().map(str::to_string),
    }
}

/// True when the address names a two-person conversation (a DM).
pub fn is_two_party(address: &RoomAddress) -> bool {
    decode(address).is_two_party()
}

/// Compose the per-room message id for a raw event id.
pub fn compose_message_id(room: &RoomAddress, raw_id: &str) -> MessageId {
    MessageId(format!("{}{}{}", room.as_str(), MESSAGE_ID_SEPARATOR, raw_id))
}
