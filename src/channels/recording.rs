use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::channels::Transport;
use crate::content::{ContentType, InboundMessage, OutgoingContent};
use crate::error::ChannelError;

/// One send captured by [`RecordingTransport`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentContent {
    pub conversation_id: String,
    pub reference: String,
    pub content_type: ContentType,
    #[serde(flatten)]
    pub content: OutgoingContent,
}

/// Transport that records sends instead of delivering them.
///
/// Backs the HTTP bridge, where the external client performs delivery, and
/// doubles as the transport in tests. Individual content kinds can be made
/// to fail.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentContent>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send of the given kind (see [`OutgoingContent::label`]) fail.
    pub fn fail_on(self, label: &'static str) -> Self {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(label);
        self
    }

    pub fn sent(&self) -> Vec<SentContent> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Drain recorded sends.
    pub fn take(&self) -> Vec<SentContent> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| sent.content.as_text().map(str::to_string))
            .collect()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.sent()
            .iter()
            .map(|sent| sent.content.label())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(
        &self,
        to: &InboundMessage,
        content: OutgoingContent,
    ) -> Result<(), ChannelError> {
        let label = content.label();
        if self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(label)
        {
            return Err(ChannelError::SendFailed {
                name: self.name().to_string(),
                content_type: label,
                reason: "injected failure".to_string(),
            });
        }

        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentContent {
                conversation_id: to.conversation_id.clone(),
                reference: to.id.clone(),
                content_type: content.content_type(),
                content,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_fails_by_kind() {
        let transport = RecordingTransport::new().fail_on("reaction");
        let msg = InboundMessage::text("alice", "hi");

        transport
            .send(&msg, OutgoingContent::text("hello"))
            .await
            .unwrap();
        let err = transport
            .send(
                &msg,
                OutgoingContent::Reaction(crate::content::Reaction {
                    reference: msg.id.clone(),
                    emoji: "✅".to_string(),
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChannelError::SendFailed {
                content_type: "reaction",
                ..
            }
        ));

        assert_eq!(transport.texts(), vec!["hello".to_string()]);
        assert_eq!(transport.take().len(), 1);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn serializes_with_content_type() {
        let msg = InboundMessage::text("alice", "hi");
        let sent = SentContent {
            conversation_id: msg.conversation_id.clone(),
            reference: msg.id.clone(),
            content_type: OutgoingContent::text("x").content_type(),
            content: OutgoingContent::text("x"),
        };
        let json = serde_json::to_value(&sent).unwrap();
        assert_eq!(json["contentType"], "xmtp.org/text:1.0");
        assert_eq!(json["kind"], "text");
        assert_eq!(json["content"], "x");
    }
}
