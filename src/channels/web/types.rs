//! Request and response types for the web gateway API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channels::SentContent;
use crate::config::{AccountAssociation, FrameConfig};

// --- Manifest ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameManifest {
    pub frame: FrameDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_association: Option<AccountAssociationInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDetails {
    pub name: String,
    pub version: &'static str,
    pub icon_url: String,
    pub home_url: String,
    pub image_url: String,
    pub splash_image_url: String,
    pub splash_background_color: String,
    pub webhook_url: String,
    pub subtitle: String,
    pub description: String,
    pub primary_category: String,
}

#[derive(Debug, Serialize)]
pub struct AccountAssociationInfo {
    pub header: String,
    pub payload: String,
    pub signature: String,
}

impl From<&AccountAssociation> for AccountAssociationInfo {
    fn from(association: &AccountAssociation) -> Self {
        Self {
            header: association.header.clone(),
            payload: association.payload.clone(),
            signature: association.signature.clone(),
        }
    }
}

impl FrameManifest {
    pub fn from_config(frame: &FrameConfig) -> Self {
        Self {
            frame: FrameDetails {
                name: frame.name.clone(),
                version: "1",
                icon_url: frame.url("/icon.png"),
                home_url: frame.url(""),
                image_url: frame.url("/api/image"),
                splash_image_url: frame.url("/splash.png"),
                splash_background_color: frame.splash_background_color.clone(),
                webhook_url: frame.url("/api/webhook"),
                subtitle: frame.subtitle.clone(),
                description: frame.subtitle.clone(),
                primary_category: frame.primary_category.clone(),
            },
            account_association: frame
                .account_association
                .as_ref()
                .map(AccountAssociationInfo::from),
        }
    }
}

// --- Webhook ---

/// Frame lifecycle event posted by the hosting app.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventKind {
    Opened,
    Closed,
    ButtonClicked,
    Other,
}

impl WebhookEvent {
    pub fn kind(&self) -> WebhookEventKind {
        match self.event_type.as_deref() {
            Some("frame.opened") => WebhookEventKind::Opened,
            Some("frame.closed") => WebhookEventKind::Closed,
            Some("frame.button_clicked") => WebhookEventKind::ButtonClicked,
            _ => WebhookEventKind::Other,
        }
    }

    /// A field of `data`, rendered for logs.
    pub fn data_field(&self, key: &str) -> Option<String> {
        self.data.as_ref()?.get(key).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WebhookStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
}

// --- Bridge ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    pub message_id: String,
    pub sends: Vec<SentContent>,
}

// --- Misc ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub channel: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
