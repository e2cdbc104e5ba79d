//! Chat client seam: what the adapter needs from the chat network.

use crate::message::RawEvent;
use crate::room::ChannelDescriptor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("chat api error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("chat api returned malformed output: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("chat api io: {0}")]
    Io(#[from] std::io::Error),
    #[error("event subscription failed: {0}")]
    Subscription(String),
}

/// Acknowledgement returned by the chat network for one sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAck {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub id: Option<u64>,
}

/// Link preview behaviour of the bot account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnfurlMode {
    Always,
    Never,
    Whitelisted,
}

impl fmt::Display for UnfurlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Always => "always",
            Self::Never => "never",
            Self::Whitelisted => "whitelisted",
        })
    }
}

impl FromStr for UnfurlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            "whitelisted" => Ok(Self::Whitelisted),
            other => Err(format!("unknown unfurl mode: {}", other)),
        }
    }
}

/// Connection to the chat network.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Post one text message to a channel.
    async fn send(&self, channel: &ChannelDescriptor, body: &str) -> Result<SendAck, ChatError>;

    /// Forward every new message on every channel to `events` until the stream
    /// ends. Returning at all (Ok or Err) means the subscription is gone.
    async fn subscribe(&self, events: mpsc::Sender<RawEvent>) -> Result<(), ChatError>;

    async fn set_unfurl_mode(&self, mode: UnfurlMode) -> Result<(), ChatError>;

    /// Current unfurl settings as reported by the network (shape is backend-defined).
    async fn unfurl_settings(&self) -> Result<serde_json::Value, ChatError>;
}
