//! Keybase channel: drives the local `keybase` binary through its JSON chat API.
//!
//! Calls go through `keybase chat api -m <json>`; the event stream is
//! `keybase chat api-listen`, one JSON envelope per line. The binary must
//! already be logged in.

use crate::channels::client::{ChatClient, ChatError, SendAck, UnfurlMode};
use crate::message::RawEvent;
use crate::room::ChannelDescriptor;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

pub const DEFAULT_KEYBASE_BINARY: &str = "keybase";

const CHAT_ENVELOPE_TYPE: &str = "chat";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// One line of `api-listen` output.
#[derive(Debug, Deserialize)]
struct ListenEnvelope {
    #[serde(rename = "type")]
    typ: String,
    #[serde(default)]
    msg: Option<Value>,
}

/// Keybase chat client backed by the `keybase` CLI.
#[derive(Debug, Clone)]
pub struct KeybaseClient {
    binary: PathBuf,
}

impl KeybaseClient {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| PathBuf::from(DEFAULT_KEYBASE_BINARY)),
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> ChatError {
        ChatError::Spawn {
            binary: self.binary.display().to_string(),
            source,
        }
    }

    /// Run one `chat api` method and return its `result` object.
    async fn call(&self, method: &str, options: Value) -> Result<Value, ChatError> {
        let request = api_request(method, options);
        log::debug!("keybase chat api: {}", method);
        let output = Command::new(&self.binary)
            .args(["chat", "api", "-m"])
            .arg(request.to_string())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        if output.stdout.iter().all(u8::is_ascii_whitespace) && !output.status.success() {
            return Err(ChatError::Api {
                code: output.status.code().map_or(-1, i64::from),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_api_response(&output.stdout)
    }
}

/// Request body for `keybase chat api`: `{"method", "params": {"options"}}`.
fn api_request(method: &str, options: Value) -> Value {
    json!({ "method": method, "params": { "options": options } })
}

/// Options for the `send` method: target channel and message body.
fn send_options(channel: &ChannelDescriptor, body: &str) -> Value {
    json!({ "channel": channel, "message": { "body": body } })
}

fn parse_api_response(stdout: &[u8]) -> Result<Value, ChatError> {
    let res: ApiResponse = serde_json::from_slice(stdout)?;
    if let Some(err) = res.error {
        return Err(ChatError::Api {
            code: err.code,
            message: err.message,
        });
    }
    Ok(res.result.unwrap_or(Value::Null))
}

/// Parse one `api-listen` line. Non-chat envelopes yield `Ok(None)`.
fn parse_listen_line(line: &str) -> Result<Option<RawEvent>, ChatError> {
    let envelope: ListenEnvelope = serde_json::from_str(line)?;
    if envelope.typ != CHAT_ENVELOPE_TYPE {
        return Ok(None);
    }
    match envelope.msg {
        Some(msg) => Ok(Some(serde_json::from_value(msg)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl ChatClient for KeybaseClient {
    async fn send(&self, channel: &ChannelDescriptor, body: &str) -> Result<SendAck, ChatError> {
        let result = self.call("send", send_options(channel, body)).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn subscribe(&self, events: mpsc::Sender<RawEvent>) -> Result<(), ChatError> {
        let mut child = Command::new(&self.binary)
            .args(["chat", "api-listen"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ChatError::Subscription("api-listen stdout not captured".to_string()))?;
        log::info!("keybase channel: listening for new messages on all channels");

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match parse_listen_line(&line) {
                Ok(Some(event)) => {
                    if events.send(event).await.is_err() {
                        log::debug!("keybase: event receiver closed, stopping listener");
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(e) => log::debug!("keybase: dropping malformed event: {}", e),
            }
        }

        let status = child.wait().await?;
        Err(ChatError::Subscription(format!("api-listen exited ({})", status)))
    }

    async fn set_unfurl_mode(&self, mode: UnfurlMode) -> Result<(), ChatError> {
        self.call("setunfurlsettings", json!({ "mode": mode })).await?;
        Ok(())
    }

    async fn unfurl_settings(&self) -> Result<Value, ChatError> {
        self.call("getunfurlsettings", json!({})).await
    }
}
