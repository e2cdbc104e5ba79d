//! Adapter shell: startup handshake, subscription loop, and the bridge between
//! the chat client and the bot runtime.

use crate::channels::{ChatClient, ChatError, SendAck, UnfurlMode};
use crate::message::{CanonicalMessage, RawEvent};
use crate::normalizer::{BotIdentity, MessageNormalizer};
use crate::outbound::OutboundComposer;
use crate::participants::ParticipantRegistry;
use crate::room::RoomAddress;
use crate::runtime::BotRuntime;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;

const EVENT_BUFFER: usize = 64;

/// State shared by the adapter's components.
#[derive(Clone)]
pub struct AdapterState {
    pub identity: BotIdentity,
    /// User registry, shared with the runtime.
    pub users: Arc<ParticipantRegistry>,
}

impl AdapterState {
    pub fn new(identity: BotIdentity, users: Arc<ParticipantRegistry>) -> Self {
        Self { identity, users }
    }
}

/// Bridges one chat client to one bot runtime.
pub struct Adapter {
    state: AdapterState,
    client: Arc<dyn ChatClient>,
    runtime: Arc<dyn BotRuntime>,
    normalizer: MessageNormalizer,
    composer: OutboundComposer,
    unfurl_mode: Option<UnfurlMode>,
}

impl Adapter {
    pub fn new(
        state: AdapterState,
        client: Arc<dyn ChatClient>,
        runtime: Arc<dyn BotRuntime>,
    ) -> Self {
        Self {
            normalizer: MessageNormalizer::new(state.identity.clone()),
            composer: OutboundComposer::new(client.clone()),
            state,
            client,
            runtime,
            unfurl_mode: None,
        }
    }

    /// Apply this link preview mode once at startup.
    pub fn with_unfurl_mode(mut self, mode: Option<UnfurlMode>) -> Self {
        self.unfurl_mode = mode;
        self
    }

    /// Start up, then feed every event to the runtime until the subscription ends.
    /// The subscription ending is fatal and returned as an error; restart is up to the supervisor.
    pub async fn run(&self) -> Result<()> {
        log::info!("[startup] keybase adapter in use");
        if let Some(mode) = self.unfurl_mode {
            self.client
                .set_unfurl_mode(mode)
                .await
                .with_context(|| format!("setting unfurl mode to {}", mode))?;
            match self.client.unfurl_settings().await {
                Ok(settings) => log::info!("changed unfurl settings: {}", settings),
                Err(e) => log::warn!("reading unfurl settings failed: {}", e),
            }
        }
        log::info!("[startup] respond to name: {}", self.state.identity.name);
        if let Some(alias) = &self.state.identity.alias {
            log::info!("[startup] respond to alias: {}", alias);
        }

        let (events_tx, mut events_rx) = mpsc::channel::<RawEvent>(EVENT_BUFFER);
        let client = self.client.clone();
        let subscription = tokio::spawn(async move { client.subscribe(events_tx).await });
        self.runtime.connected();

        while let Some(event) = events_rx.recv().await {
            self.process(&event);
        }

        let outcome = subscription
            .await
            .context("event subscription task panicked")?;
        match outcome {
            Ok(()) => Err(ChatError::Subscription("event stream closed".to_string()).into()),
            Err(e) => Err(anyhow::Error::new(e).context("event subscription failed")),
        }
    }

    /// Normalize one event and hand the result to the runtime.
    pub fn process(&self, event: &RawEvent) -> Option<CanonicalMessage> {
        let message = self.normalizer.normalize(event, &self.state.users)?;
        log::debug!("received {} from {}", message.id(), message.user().name);
        self.runtime.receive(message.clone());
        Some(message)
    }

    pub async fn send(&self, room: &RoomAddress, texts: &[String]) -> Result<Vec<SendAck>, ChatError> {
        self.composer.send(room, texts).await
    }

    pub async fn reply(
        &self,
        room: &RoomAddress,
        sender_name: &str,
        texts: &[String],
    ) -> Result<Vec<SendAck>, ChatError> {
        self.composer.reply(room, sender_name, texts).await
    }
}
