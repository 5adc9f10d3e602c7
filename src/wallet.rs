//! Wallet-call payload shaping.
//!
//! Builds the calls handed to a user's wallet for signing. Nothing here signs
//! or broadcasts; the output is plain data.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sha3::{Digest, Keccak256};

use crate::content::{TransactionReference, TrayMetadata, WalletCall, WalletSendCalls};
use crate::error::WalletError;

/// Base mainnet.
pub const BASE_MAINNET_CHAIN_ID: u64 = 8453;

/// Gas limit attached to every shaped call.
pub const DEFAULT_GAS_LIMIT: &str = "21000";

pub const ERC20_TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";

pub const NATIVE_DECIMALS: u32 = 18;

/// An ERC-20 token the agent can request transfers of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub symbol: &'static str,
    pub decimals: u32,
    pub contract: &'static str,
}

/// USDC on Base mainnet.
pub const USDC: Token = Token {
    symbol: "USDC",
    decimals: 6,
    contract: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
};

/// First four bytes of the keccak256 hash of a function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// `0x` followed by exactly 40 hex characters.
pub fn is_valid_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Shorten an address for display: `0x1234...abcd`.
pub fn format_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Scale a human amount to integer base units.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<u128, WalletError> {
    if amount <= Decimal::ZERO {
        return Err(WalletError::NonPositiveAmount(amount.to_string()));
    }
    let overflow = || WalletError::AmountOverflow {
        amount: amount.to_string(),
        decimals,
    };
    let scale = Decimal::from_i128_with_scale(10_i128.pow(decimals), 0);
    let scaled = amount.checked_mul(scale).ok_or_else(overflow)?;
    if scaled.fract() != Decimal::ZERO {
        return Err(overflow());
    }
    scaled.to_u128().ok_or_else(overflow)
}

/// ABI-encoded calldata for `transfer(recipient, units)`.
pub fn erc20_transfer_data(recipient: &str, units: u128) -> Result<String, WalletError> {
    if !is_valid_address(recipient) {
        return Err(WalletError::InvalidAddress(recipient.to_string()));
    }
    let selector = hex_lower(&function_selector(ERC20_TRANSFER_SIGNATURE));
    let address = recipient[2..].to_ascii_lowercase();
    Ok(format!("0x{selector}{address:0>64}{units:064x}"))
}

/// A call transferring `amount` of `token` to `recipient`.
pub fn erc20_transfer(
    token: &Token,
    recipient: &str,
    amount: Decimal,
) -> Result<WalletCall, WalletError> {
    let units = to_base_units(amount, token.decimals)?;
    Ok(WalletCall {
        to: token.contract.to_string(),
        value: "0".to_string(),
        data: erc20_transfer_data(recipient, units)?,
        gas_limit: DEFAULT_GAS_LIMIT.to_string(),
    })
}

/// A call transferring `amount` of the chain's native currency.
pub fn native_transfer(recipient: &str, amount: Decimal) -> Result<WalletCall, WalletError> {
    if !is_valid_address(recipient) {
        return Err(WalletError::InvalidAddress(recipient.to_string()));
    }
    let wei = to_base_units(amount, NATIVE_DECIMALS)?;
    Ok(WalletCall {
        to: recipient.to_string(),
        value: wei.to_string(),
        data: "0x".to_string(),
        gas_limit: DEFAULT_GAS_LIMIT.to_string(),
    })
}

/// Tray metadata shown for Aria-initiated calls.
pub fn tray_metadata(description: impl Into<String>) -> TrayMetadata {
    TrayMetadata {
        description: description.into(),
        hostname: "aria.chat".to_string(),
        favicon_url: "https://aria.chat/favicon.ico".to_string(),
        title: "Aria - Your Onchain Assistant".to_string(),
        extra: Default::default(),
    }
}

/// Wallet-send-calls request for a single token transfer drawn from `from`.
pub fn token_transfer_request(
    from: &str,
    recipient: &str,
    token: &Token,
    amount: Decimal,
    chain_id: u64,
) -> Result<WalletSendCalls, WalletError> {
    let call = erc20_transfer(token, recipient, amount)?;
    Ok(WalletSendCalls::new(from, chain_id, vec![call])
        .with_metadata(tray_metadata(format!("{} transfer", token.symbol))))
}

pub fn transaction_receipt(hash: &str, network_id: Option<u64>) -> TransactionReference {
    TransactionReference::new(hash, network_id.unwrap_or(BASE_MAINNET_CHAIN_ID))
}
