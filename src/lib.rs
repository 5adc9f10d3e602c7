//! Aria: an onchain assistant for XMTP chats.
//!
//! The agent answers text, quick-action selections and attachments, builds
//! wallet calls for USDC payments on Base, and serves a companion frame.

pub mod agent;
pub mod bootstrap;
pub mod channels;
pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod llm;
pub mod wallet;

pub use config::Config;
pub use error::{Error, Result};
