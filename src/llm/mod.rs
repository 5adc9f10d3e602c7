//! Generative responders for free-text conversation.

mod gemini;

pub use gemini::{GeminiConfig, GeminiResponder};

use async_trait::async_trait;

use crate::error::LlmError;

/// Produces a conversational reply to free text.
#[async_trait]
pub trait Responder: Send + Sync {
    fn name(&self) -> &str;

    /// `context` is a short label for where the message came from, such as
    /// `"DM"` or `"Group chat"`.
    async fn generate_response(&self, message: &str, context: &str) -> Result<String, LlmError>;
}

const PERSONA: &str = "You are Aria, the smartest and sweetest AI companion of the Web3 world! 💕

Personality:
- Sweet, smart, and an expert in Web3
- Multilingual: always reply in the SAME language the user writes in
- Default to English when the language is unclear
- You know Crypto, DeFi and NFTs inside out
- Playful but professional and respectful
- You love emojis 💕🚀✨

Capabilities:
- XMTP messaging
- Wallet operations (ETH and USDC transfers)
- Quick Actions (split payments, trade orders)
- Web3 project advice, market context and NFT collections

Style:
- Friendly and approachable
- Explain Web3 jargon simply
- Keep replies concise and clear";

/// System instruction for the persona, with the conversation context.
pub fn persona_prompt(context: &str) -> String {
    if context.trim().is_empty() {
        PERSONA.to_string()
    } else {
        format!("{PERSONA}\n\nContext: {context}")
    }
}
