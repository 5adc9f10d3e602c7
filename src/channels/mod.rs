//! Channels deliver inbound messages; transports carry the agent's sends.
//!
//! The messaging protocol client itself lives outside this crate. A channel
//! adapts whatever it speaks to a stream of normalized [`InboundMessage`]s,
//! and a [`Transport`] accepts [`OutgoingContent`] addressed by the message
//! being answered.

mod recording;
pub mod repl;
pub mod web;

pub use recording::{RecordingTransport, SentContent};
pub use repl::ReplChannel;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::content::{InboundMessage, OutgoingContent};
use crate::error::ChannelError;

/// Stream of inbound messages from a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = InboundMessage> + Send>>;

/// Source of inbound messages.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start listening. The stream ends when the channel closes.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Send primitives of the messaging client.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Send `content` into the conversation `to` belongs to. Reactions and
    /// replies reference `to` itself.
    async fn send(&self, to: &InboundMessage, content: OutgoingContent)
    -> Result<(), ChannelError>;
}
