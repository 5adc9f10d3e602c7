//! Quick-action menus (`coinbase.com/actions:1.0`) and the intents
//! (`coinbase.com/intent:1.0`) emitted when a user taps one of their buttons.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum number of buttons a single menu may carry.
pub const MAX_ACTIONS: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionStyle {
    Primary,
    Secondary,
    Danger,
}

/// One tappable button.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ActionStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Action {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            image_url: None,
            style: None,
            expires_at: None,
        }
    }

    pub fn with_style(mut self, style: ActionStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyField("action.id"));
        }
        if self.label.trim().is_empty() {
            return Err(ValidationError::EmptyField("action.label"));
        }
        if let Some(image_url) = &self.image_url {
            url::Url::parse(image_url).map_err(|e| ValidationError::InvalidValue {
                field: "action.image_url",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// A menu of quick-action buttons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionsMenu {
    pub id: String,
    pub description: String,
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ActionsMenu {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            actions: Vec::new(),
            expires_at: None,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Reject menus the client would refuse to render.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyField("id"));
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyField("description"));
        }
        if self.actions.is_empty() || self.actions.len() > MAX_ACTIONS {
            return Err(ValidationError::OutOfRange {
                field: "actions",
                min: 1,
                max: MAX_ACTIONS,
                actual: self.actions.len(),
            });
        }
        self.actions.iter().try_for_each(Action::validate)
    }

    /// Plain-text enumeration of the buttons, used alongside (or instead of)
    /// the rich menu.
    pub fn fallback_text(&self) -> String {
        let options = self
            .actions
            .iter()
            .enumerate()
            .map(|(index, action)| format!("[{}] {}", index + 1, action.label))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{}\n\n{}\n\nReply with the number to choose.",
            self.description, options
        )
    }
}

/// Scalar metadata value carried by an intent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

/// A user's tap on a quick-action button.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub id: String,
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, MetadataValue>>,
}

impl Intent {
    pub fn new(id: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action_id: action_id.into(),
            metadata: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyField("intent.id"));
        }
        if self.action_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("intent.action_id"));
        }
        Ok(())
    }
}
