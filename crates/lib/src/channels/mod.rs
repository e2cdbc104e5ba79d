//! Chat network side of the adapter.
//!
//! `ChatClient` is the seam the adapter talks through; `KeybaseClient` is the
//! implementation backed by the local `keybase` binary.

mod client;
mod keybase;

pub use client::{ChatClient, ChatError, SendAck, UnfurlMode};
pub use keybase::{KeybaseClient, DEFAULT_KEYBASE_BINARY};
