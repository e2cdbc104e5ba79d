//! kbridge core library: bridges the Keybase chat event stream to a chat-bot
//! runtime's message model.
//!
//! Inbound: raw chat events are normalized into canonical text/enter/leave
//! messages. Outbound: replies are turned into chat sends, addressed through
//! a single room-address string in both directions.

pub mod adapter;
pub mod channels;
pub mod config;
pub mod message;
pub mod normalizer;
pub mod outbound;
pub mod participants;
pub mod room;
pub mod runtime;
