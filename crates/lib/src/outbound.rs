//! Outbound composition: send/reply requests -> concurrent chat client sends.

use crate::channels::{ChatClient, ChatError, SendAck};
use crate::room::{self, RoomAddress};
use futures_util::future::try_join_all;
use std::sync::Arc;

/// A send or reply built for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub room: RoomAddress,
    pub texts: Vec<String>,
    /// Display name to mention; only applied in two-party rooms.
    pub mention: Option<String>,
}

impl OutboundRequest {
    pub fn send(room: RoomAddress, texts: Vec<String>) -> Self {
        Self {
            room,
            texts,
            mention: None,
        }
    }

    pub fn reply(room: RoomAddress, sender_name: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            room,
            texts,
            mention: Some(sender_name.into()),
        }
    }

    /// Final message bodies, with `@name ` prefixed in two-party rooms.
    pub fn bodies(&self) -> Vec<String> {
        match self.mention.as_deref() {
            Some(name) if room::is_two_party(&self.room) => self
                .texts
                .iter()
                .map(|text| format!("@{} {}", name, text))
                .collect(),
            _ => self.texts.clone(),
        }
    }
}

/// Turns outbound requests into chat client sends.
#[derive(Clone)]
pub struct OutboundComposer {
    client: Arc<dyn ChatClient>,
}

impl OutboundComposer {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    /// Send every text to the room concurrently. Fails with the first error
    /// observed; acks of the other sends are discarded in that case.
    pub async fn send(&self, room: &RoomAddress, texts: &[String]) -> Result<Vec<SendAck>, ChatError> {
        self.dispatch(OutboundRequest::send(room.clone(), texts.to_vec()))
            .await
    }

    /// Like `send`, but mentions the sender in two-party rooms.
    pub async fn reply(
        &self,
        room: &RoomAddress,
        sender_name: &str,
        texts: &[String],
    ) -> Result<Vec<SendAck>, ChatError> {
        self.dispatch(OutboundRequest::reply(room.clone(), sender_name, texts.to_vec()))
            .await
    }

    pub async fn dispatch(&self, request: OutboundRequest) -> Result<Vec<SendAck>, ChatError> {
        let channel = room::decode(&request.room);
        let bodies = request.bodies();
        let client = &self.client;
        let channel = &channel;
        let sends = bodies
            .iter()
            .map(|body| async move { client.send(channel, body).await });
        let acks = try_join_all(sends).await?;
        log::debug!("sent {} message(s) to {}", acks.len(), request.room);
        Ok(acks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::UnfurlMode;
    use crate::message::RawEvent;
    use crate::room::ChannelDescriptor;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Records sends; fails any body equal to `fail_on`.
    #[derive(Default)]
    struct RecordingClient {
        sent: Mutex<Vec<(ChannelDescriptor, String)>>,
        fail_on: Option<String>,
    }

    impl RecordingClient {
        fn sent(&self) -> Vec<(ChannelDescriptor, String)> {
            self.sent.lock().expect("sent lock").clone()
        }
    }

    #[async_trait]
    impl ChatClient for RecordingClient {
        async fn send(&self, channel: &ChannelDescriptor, body: &str) -> Result<SendAck, ChatError> {
            if self.fail_on.as_deref() == Some(body) {
                return Err(ChatError::Api {
                    code: 500,
                    message: format!("rejected {}", body),
                });
            }
            let mut sent = self.sent.lock().expect("sent lock");
            sent.push((channel.clone(), body.to_string()));
            Ok(SendAck {
                message: "message sent".to_string(),
                id: Some(sent.len() as u64),
            })
        }

        async fn subscribe(&self, _events: mpsc::Sender<RawEvent>) -> Result<(), ChatError> {
            Ok(())
        }

        async fn set_unfurl_mode(&self, _mode: UnfurlMode) -> Result<(), ChatError> {
            Ok(())
        }

        async fn unfurl_settings(&self) -> Result<serde_json::Value, ChatError> {
            Ok(serde_json::Value::Null)
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn reply_in_dm_mentions_sender() {
        let client = Arc::new(RecordingClient::default());
        let composer = OutboundComposer::new(client.clone());
        composer
            .reply(&RoomAddress::from("alice,bob"), "alice", &texts(&["hi"]))
            .await
            .expect("reply");
        let sent = client.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChannelDescriptor::multi_party("alice,bob"));
        assert_eq!(sent[0].1, "@alice hi");
    }

    #[tokio::test]
    async fn reply_in_team_channel_is_plain() {
        let client = Arc::new(RecordingClient::default());
        let composer = OutboundComposer::new(client.clone());
        composer
            .reply(&RoomAddress::from("eng#general"), "alice", &texts(&["hi"]))
            .await
            .expect("reply");
        let sent = client.sent();
        assert_eq!(sent[0].0, ChannelDescriptor::team("eng", "general"));
        assert_eq!(sent[0].1, "hi");
    }

    #[tokio::test]
    async fn send_never_mentions() {
        let client = Arc::new(RecordingClient::default());
        let composer = OutboundComposer::new(client.clone());
        let acks = composer
            .send(&RoomAddress::from("alice,bob"), &texts(&["one", "two"]))
            .await
            .expect("send");
        assert_eq!(acks.len(), 2);
        let mut bodies: Vec<String> = client.sent().into_iter().map(|(_, b)| b).collect();
        bodies.sort();
        assert_eq!(bodies, texts(&["one", "two"]));
    }

    #[tokio::test]
    async fn one_failed_send_fails_the_batch() {
        let client = Arc::new(RecordingClient {
            fail_on: Some("two".to_string()),
            ..Default::default()
        });
        let composer = OutboundComposer::new(client.clone());
        let err = composer
            .send(&RoomAddress::from("eng#general"), &texts(&["one", "two", "three"]))
            .await
            .expect_err("batch should fail");
        match err {
            ChatError::Api { message, .. } => assert_eq!(message, "rejected two"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn group_reply_is_not_prefixed() {
        let req = OutboundRequest::reply(RoomAddress::from("alice,bob,carol"), "alice", texts(&["hi"]));
        assert_eq!(req.bodies(), texts(&["hi"]));
    }
}
