//! Message content model.
//!
//! Inbound transport events are normalized once, at the boundary, into an
//! [`InboundMessage`] whose [`MessageContent`] is a closed enum. Everything
//! downstream matches on that enum instead of probing payload shapes.
//! Outbound content is expressed as [`OutgoingContent`].

mod quick_actions;
mod transactions;
mod types;

pub use quick_actions::{Action, ActionStyle, ActionsMenu, Intent, MAX_ACTIONS, MetadataValue};
pub use transactions::{
    TransactionReference, TransactionReferenceMetadata, TrayMetadata, WalletCall, WalletSendCalls,
};
pub use types::{ContentKind, ContentType, ContentTypeDescriptor};

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ContentError;

/// Inline file payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// File hosted elsewhere and referenced by URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAttachment {
    pub url: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    #[default]
    #[serde(alias = "direct")]
    Dm,
    Group,
}

impl ConversationKind {
    /// Context label handed to the generative responder.
    pub fn context_label(self) -> &'static str {
        match self {
            Self::Dm => "DM",
            Self::Group => "Group chat",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReplyReference {
    #[serde(default, alias = "reference")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub sender_address: Option<String>,
}

/// Closed set of inbound content variants.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Intent(Intent),
    Attachment(Attachment),
    RemoteAttachment(RemoteAttachment),
    Unknown { content_type: String },
}

impl MessageContent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Intent(_) => "intent",
            Self::Attachment(_) => "attachment",
            Self::RemoteAttachment(_) => "remote_attachment",
            Self::Unknown { .. } => "unknown",
        }
    }
}

/// A normalized inbound message. Lives for one dispatch cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_address: Option<String>,
    pub conversation_id: String,
    pub conversation_kind: ConversationKind,
    pub content: MessageContent,
    pub reply_reference: Option<ReplyReference>,
    pub sent_at: DateTime<Utc>,
}

impl InboundMessage {
    /// A direct text message; the conversation id defaults to the sender id.
    pub fn text(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(sender_id, MessageContent::Text(text.into()))
    }

    pub fn new(sender_id: impl Into<String>, content: MessageContent) -> Self {
        let sender_id = sender_id.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: sender_id.clone(),
            sender_id,
            sender_address: None,
            conversation_kind: ConversationKind::Dm,
            content,
            reply_reference: None,
            sent_at: Utc::now(),
        }
    }

    pub fn in_group(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self.conversation_kind = ConversationKind::Group;
        self
    }

    pub fn with_sender_address(mut self, address: impl Into<String>) -> Self {
        self.sender_address = Some(address.into());
        self
    }

    pub fn replying_to(mut self, sender_address: impl Into<String>) -> Self {
        self.reply_reference = Some(ReplyReference {
            message_id: None,
            sender_address: Some(sender_address.into()),
        });
        self
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_group(&self) -> bool {
        self.conversation_kind == ConversationKind::Group
    }

    /// Address wallet calls are drawn from and paid to: the sender's wallet
    /// address when known, otherwise the inbox id.
    pub fn wallet_address(&self) -> &str {
        self.sender_address.as_deref().unwrap_or(&self.sender_id)
    }
}

/// Inbound event as relayed by the messaging client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub sender_inbox_id: String,
    #[serde(default)]
    pub sender_address: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub conversation_kind: ConversationKind,
    pub content_type: ContentTypeDescriptor,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub reply_reference: Option<ReplyReference>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

/// Build an [`InboundMessage`] from a raw transport event.
///
/// Content types outside the handled set normalize to
/// [`MessageContent::Unknown`]; a handled type whose payload does not decode
/// is an error.
pub fn normalize(event: InboundEvent) -> Result<InboundMessage, ContentError> {
    let content_type = event.content_type.resolve()?;
    let malformed = |reason: String| ContentError::Malformed {
        content_type: content_type.to_string(),
        reason,
    };

    let content = match content_type.kind() {
        ContentKind::Text => match event.content {
            serde_json::Value::String(text) => MessageContent::Text(text),
            other => return Err(malformed(format!("expected string, got {other}"))),
        },
        ContentKind::Intent => MessageContent::Intent(
            serde_json::from_value(event.content).map_err(|e| malformed(e.to_string()))?,
        ),
        ContentKind::Attachment => MessageContent::Attachment(
            serde_json::from_value(event.content).map_err(|e| malformed(e.to_string()))?,
        ),
        ContentKind::RemoteStaticAttachment => MessageContent::RemoteAttachment(
            serde_json::from_value(event.content).map_err(|e| malformed(e.to_string()))?,
        ),
        _ => MessageContent::Unknown {
            content_type: content_type.to_string(),
        },
    };

    Ok(InboundMessage {
        id: event
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        conversation_id: event
            .conversation_id
            .unwrap_or_else(|| event.sender_inbox_id.clone()),
        sender_id: event.sender_inbox_id,
        sender_address: event.sender_address,
        conversation_kind: event.conversation_kind,
        content,
        reply_reference: event.reply_reference,
        sent_at: event.sent_at.unwrap_or_else(Utc::now),
    })
}

/// Reaction emoji attached to an inbound message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub reference: String,
    pub emoji: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub reference: String,
    pub text: String,
}

/// Everything the agent can send.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum OutgoingContent {
    Text(String),
    Reaction(Reaction),
    Reply(Reply),
    Attachment(Attachment),
    RemoteAttachment(RemoteAttachment),
    Actions(ActionsMenu),
    WalletSendCalls(WalletSendCalls),
    TransactionReference(TransactionReference),
}

impl OutgoingContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Text(_) => ContentKind::Text,
            Self::Reaction(_) => ContentKind::Reaction,
            Self::Reply(_) => ContentKind::Reply,
            Self::Attachment(_) => ContentKind::Attachment,
            Self::RemoteAttachment(_) => ContentKind::RemoteStaticAttachment,
            Self::Actions(_) => ContentKind::Actions,
            Self::WalletSendCalls(_) => ContentKind::WalletSendCalls,
            Self::TransactionReference(_) => ContentKind::TransactionReference,
        }
    }

    pub fn content_type(&self) -> ContentType {
        ContentType::of(self.kind())
    }

    /// Short label used in logs and send errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Reaction(_) => "reaction",
            Self::Reply(_) => "reply",
            Self::Attachment(_) => "attachment",
            Self::RemoteAttachment(_) => "remote_attachment",
            Self::Actions(_) => "actions",
            Self::WalletSendCalls(_) => "wallet_send_calls",
            Self::TransactionReference(_) => "transaction_reference",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Encode attachment bytes the way the inbound wire form expects them.
pub fn encode_attachment_data(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}
