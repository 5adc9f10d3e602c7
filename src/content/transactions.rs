//! Wallet-call requests (`xmtp.org/walletSendCalls:1.0`) and transaction
//! references (`xmtp.org/transactionReference:1.0`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const WALLET_SEND_CALLS_VERSION: &str = "1.0";

/// One call the user's wallet is asked to sign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WalletCall {
    pub to: String,
    pub value: String,
    pub data: String,
    pub gas_limit: String,
}

/// Display metadata shown in the wallet tray.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrayMetadata {
    pub description: String,
    pub hostname: String,
    pub favicon_url: String,
    pub title: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TrayMetadata {
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletSendCalls {
    pub version: String,
    pub from: String,
    pub chain_id: String,
    pub calls: Vec<WalletCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TrayMetadata>,
}

impl WalletSendCalls {
    pub fn new(from: impl Into<String>, chain_id: u64, calls: Vec<WalletCall>) -> Self {
        Self {
            version: WALLET_SEND_CALLS_VERSION.to_string(),
            from: from.into(),
            chain_id: format!("{chain_id:#x}"),
            calls,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: TrayMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReferenceMetadata {
    pub transaction_hash: String,
    pub network_id: u64,
}

/// Receipt pointing at a broadcast transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReference {
    pub network_id: u64,
    pub reference: String,
    pub metadata: TransactionReferenceMetadata,
}

impl TransactionReference {
    pub fn new(hash: impl Into<String>, network_id: u64) -> Self {
        let hash = hash.into();
        Self {
            network_id,
            reference: hash.clone(),
            metadata: TransactionReferenceMetadata {
                transaction_hash: hash,
                network_id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_is_hex_encoded() {
        let calls = WalletSendCalls::new("0xabc", 8453, vec![]);
        assert_eq!(calls.chain_id, "0x2105");
        assert_eq!(calls.version, "1.0");
    }

    #[test]
    fn tray_metadata_flattens_extra_fields() {
        let metadata = TrayMetadata {
            description: "USDC transfer".to_string(),
            hostname: "aria.chat".to_string(),
            favicon_url: "https://aria.chat/favicon.ico".to_string(),
            title: "Aria".to_string(),
            extra: BTreeMap::new(),
        }
        .with_extra("isDemo", serde_json::Value::Bool(true));

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["faviconUrl"], "https://aria.chat/favicon.ico");
        assert_eq!(json["isDemo"], true);
    }

    #[test]
    fn transaction_reference_mirrors_hash() {
        let reference = TransactionReference::new("0xdeadbeef", 8453);
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["reference"], "0xdeadbeef");
        assert_eq!(json["metadata"]["transactionHash"], "0xdeadbeef");
        assert_eq!(json["metadata"]["networkId"], 8453);
    }
}
