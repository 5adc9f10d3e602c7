use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_env, url_env};
use crate::error::ConfigError;

pub const DEFAULT_FRAME_BASE_URL: &str = "https://aria-miniapp.vercel.app";

/// Channel configurations.
#[derive(Debug, Clone)]
pub struct ChannelsConfig {
    pub gateway: GatewayConfig,
    pub frame: FrameConfig,
}

/// HTTP surface serving the frame and the transport bridge.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token required on the bridge endpoint. Open when unset.
    pub auth_token: Option<SecretString>,
}

/// Signed domain association published in the frame manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountAssociation {
    pub header: String,
    pub payload: String,
    pub signature: String,
}

/// Embeddable frame published by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    pub name: String,
    pub base_url: String,
    pub subtitle: String,
    pub splash_background_color: String,
    pub primary_category: String,
    pub account_association: Option<AccountAssociation>,
}

impl FrameConfig {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            name: "aria".to_string(),
            base_url: DEFAULT_FRAME_BASE_URL.to_string(),
            subtitle: "your ai girlfriend knows everything about web3".to_string(),
            splash_background_color: "#6200EA".to_string(),
            primary_category: "entertainment".to_string(),
            account_association: None,
        }
    }
}

impl ChannelsConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let gateway = GatewayConfig {
            host: optional_env("ARIA_GATEWAY_HOST")?.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_env("ARIA_GATEWAY_PORT", "a valid port number")?.unwrap_or(3000),
            auth_token: optional_env("ARIA_GATEWAY_TOKEN")?.map(SecretString::from),
        };

        let defaults = FrameConfig::default();
        let association = (
            optional_env("ARIA_FRAME_ASSOCIATION_HEADER")?,
            optional_env("ARIA_FRAME_ASSOCIATION_PAYLOAD")?,
            optional_env("ARIA_FRAME_ASSOCIATION_SIGNATURE")?,
        );
        let account_association = match association {
            (Some(header), Some(payload), Some(signature)) => Some(AccountAssociation {
                header,
                payload,
                signature,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "ARIA_FRAME_ASSOCIATION_HEADER".to_string(),
                    message: "header, payload and signature must be set together".to_string(),
                });
            }
        };

        let frame = FrameConfig {
            base_url: url_env("ARIA_FRAME_BASE_URL")?.unwrap_or(defaults.base_url),
            account_association,
            ..FrameConfig::default()
        };

        Ok(Self { gateway, frame })
    }
}
