//! Content type identifiers as they appear on the XMTP wire.
//!
//! Inbound events carry the content type either as a string id
//! (`xmtp.org/text:1.0`) or as a structured descriptor
//! (`{authorityId, typeId, versionMajor, versionMinor}`). Both forms are
//! resolved to a [`ContentType`] exactly once, at the transport boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ContentError;

pub const XMTP_AUTHORITY: &str = "xmtp.org";
pub const COINBASE_AUTHORITY: &str = "coinbase.com";

/// Resolved content type identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentType {
    pub authority_id: String,
    pub type_id: String,
    pub version_major: u32,
    pub version_minor: u32,
}

/// Closed set of content kinds the agent distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Attachment,
    RemoteStaticAttachment,
    Reaction,
    Reply,
    ReadReceipt,
    WalletSendCalls,
    TransactionReference,
    GroupMembershipChange,
    GroupUpdated,
    Actions,
    Intent,
    Unknown,
}

impl ContentKind {
    fn authority_and_type(self) -> Option<(&'static str, &'static str)> {
        let pair = match self {
            Self::Text => (XMTP_AUTHORITY, "text"),
            Self::Attachment => (XMTP_AUTHORITY, "attachment"),
            Self::RemoteStaticAttachment => (XMTP_AUTHORITY, "remoteStaticAttachment"),
            Self::Reaction => (XMTP_AUTHORITY, "reaction"),
            Self::Reply => (XMTP_AUTHORITY, "reply"),
            Self::ReadReceipt => (XMTP_AUTHORITY, "readReceipt"),
            Self::WalletSendCalls => (XMTP_AUTHORITY, "walletSendCalls"),
            Self::TransactionReference => (XMTP_AUTHORITY, "transactionReference"),
            Self::GroupMembershipChange => (XMTP_AUTHORITY, "group_membership_change"),
            Self::GroupUpdated => (XMTP_AUTHORITY, "group_updated"),
            Self::Actions => (COINBASE_AUTHORITY, "actions"),
            Self::Intent => (COINBASE_AUTHORITY, "intent"),
            Self::Unknown => return None,
        };
        Some(pair)
    }

    const ALL: [ContentKind; 12] = [
        Self::Text,
        Self::Attachment,
        Self::RemoteStaticAttachment,
        Self::Reaction,
        Self::Reply,
        Self::ReadReceipt,
        Self::WalletSendCalls,
        Self::TransactionReference,
        Self::GroupMembershipChange,
        Self::GroupUpdated,
        Self::Actions,
        Self::Intent,
    ];
}

impl ContentType {
    pub fn new(authority_id: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            authority_id: authority_id.into(),
            type_id: type_id.into(),
            version_major: 1,
            version_minor: 0,
        }
    }

    /// The canonical 1.0 content type for a known kind.
    pub fn of(kind: ContentKind) -> Self {
        match kind.authority_and_type() {
            Some((authority, type_id)) => Self::new(authority, type_id),
            None => Self::new("unknown", "unknown"),
        }
    }

    /// Parse the string form `authority/type:major.minor`.
    ///
    /// The version suffix is optional and defaults to `1.0`.
    pub fn parse(raw: &str) -> Result<Self, ContentError> {
        let raw = raw.trim();
        let (authority, rest) = raw
            .split_once('/')
            .ok_or_else(|| ContentError::UnsupportedDescriptor(raw.to_string()))?;
        let (type_id, version) = match rest.split_once(':') {
            Some((type_id, version)) => (type_id, Some(version)),
            None => (rest, None),
        };
        if authority.is_empty() || type_id.is_empty() {
            return Err(ContentError::UnsupportedDescriptor(raw.to_string()));
        }

        let (version_major, version_minor) = match version {
            Some(version) => {
                let (major, minor) = version.split_once('.').unwrap_or((version, "0"));
                let major = major
                    .parse()
                    .map_err(|_| ContentError::UnsupportedDescriptor(raw.to_string()))?;
                let minor = minor
                    .parse()
                    .map_err(|_| ContentError::UnsupportedDescriptor(raw.to_string()))?;
                (major, minor)
            }
            None => (1, 0),
        };

        Ok(Self {
            authority_id: authority.to_string(),
            type_id: type_id.to_string(),
            version_major,
            version_minor,
        })
    }

    pub fn kind(&self) -> ContentKind {
        ContentKind::ALL
            .into_iter()
            .find(|kind| {
                kind.authority_and_type()
                    .is_some_and(|(authority, type_id)| {
                        authority == self.authority_id && type_id == self.type_id
                    })
            })
            .unwrap_or(ContentKind::Unknown)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}.{}",
            self.authority_id, self.type_id, self.version_major, self.version_minor
        )
    }
}

impl Serialize for ContentType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Content type as received from the transport, in either of its two forms.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ContentTypeDescriptor {
    Id(String),
    #[serde(rename_all = "camelCase")]
    Structured {
        authority_id: String,
        type_id: String,
        #[serde(default)]
        version_major: Option<u32>,
        #[serde(default)]
        version_minor: Option<u32>,
    },
}

impl ContentTypeDescriptor {
    pub fn resolve(&self) -> Result<ContentType, ContentError> {
        match self {
            Self::Id(raw) => ContentType::parse(raw),
            Self::Structured {
                authority_id,
                type_id,
                version_major,
                version_minor,
            } => {
                if authority_id.is_empty() || type_id.is_empty() {
                    return Err(ContentError::UnsupportedDescriptor(format!(
                        "{authority_id}/{type_id}"
                    )));
                }
                Ok(ContentType {
                    authority_id: authority_id.clone(),
                    type_id: type_id.clone(),
                    version_major: version_major.unwrap_or(1),
                    version_minor: version_minor.unwrap_or(0),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_ids() {
        let ct = ContentType::parse("xmtp.org/text:1.0").unwrap();
        assert_eq!(ct.kind(), ContentKind::Text);
        assert_eq!(ct.to_string(), "xmtp.org/text:1.0");

        let ct = ContentType::parse("coinbase.com/intent:1.0").unwrap();
        assert_eq!(ct.kind(), ContentKind::Intent);

        let ct = ContentType::parse("xmtp.org/remoteStaticAttachment").unwrap();
        assert_eq!(ct.kind(), ContentKind::RemoteStaticAttachment);
        assert_eq!(ct.version_major, 1);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("xmtp.org/").is_err());
        assert!(ContentType::parse("xmtp.org/text:one.zero").is_err());
    }

    #[test]
    fn resolves_structured_descriptor() {
        let descriptor: ContentTypeDescriptor = serde_json::from_str(
            r#"{"authorityId":"xmtp.org","typeId":"text","versionMajor":1,"versionMinor":0}"#,
        )
        .unwrap();
        let ct = descriptor.resolve().unwrap();
        assert_eq!(ct, ContentType::of(ContentKind::Text));

        let descriptor: ContentTypeDescriptor =
            serde_json::from_str(r#""coinbase.com/actions:1.0""#).unwrap();
        assert_eq!(descriptor.resolve().unwrap().kind(), ContentKind::Actions);
    }

    #[test]
    fn unknown_authority_is_unknown_kind() {
        let ct = ContentType::parse("example.com/poll:2.1").unwrap();
        assert_eq!(ct.kind(), ContentKind::Unknown);
        assert_eq!(ct.to_string(), "example.com/poll:2.1");
    }

    #[test]
    fn serializes_as_string_id() {
        let encoded = serde_json::to_string(&ContentType::of(ContentKind::Intent)).unwrap();
        assert_eq!(encoded, "\"coinbase.com/intent:1.0\"");
    }
}
