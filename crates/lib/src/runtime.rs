//! Bot runtime seam: the framework core that consumes canonical messages.

use crate::message::CanonicalMessage;

/// Receives normalized messages from the adapter. Calls arrive one at a time,
/// in event order; the runtime may run its own handlers concurrently.
pub trait BotRuntime: Send + Sync {
    fn receive(&self, message: CanonicalMessage);

    /// Called once the subscription is running, before the first message.
    fn connected(&self) {}
}
