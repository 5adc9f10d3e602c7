//! Canned reply text.
//!
//! Phrases the agent sends verbatim also feed the group loop guard, so a
//! transport that echoes the agent's own messages back does not make it
//! answer itself.

pub const GREETINGS: &[&str] = &[
    "gm! 👋 How can I help?",
    "Hello! Aria here, what would you like to do?",
    "Hi! I can help with your onchain transactions.",
    "Hey! Which transaction would you like to make?",
];

pub const FALLBACK_RESPONSES: &[&str] = &[
    "Got it! How can I help you?",
    "Interesting! Could you tell me a bit more?",
    "I can help with that. What would you like to do?",
    "Type `/help` to see the commands.",
    "I can help with your onchain transactions!",
];

pub const RATE_LIMITED_PREFIX: &str = "You're sending too many messages";

pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

pub const RESPONDER_APOLOGY: &str =
    "Sorry, my thoughts are a little tangled right now 😅 Could you try again? 💕";

pub const PAY_FORMAT_HELP: &str =
    "Payment format: `pay $<amount> to <recipient>`\n\nExample: `pay $50 to 0x1234...abcd`";

pub const SPLIT_FORMAT_HELP: &str = "Split format: `split <description> $<amount> <people> ways`\n\nExample: `split dinner $200 4 ways`";

pub const PAY_AMOUNT_NOT_POSITIVE: &str = "The amount must be positive.";

pub const SPLIT_VALUES_NOT_POSITIVE: &str =
    "The amount and the number of people must be positive.";

pub const SPLIT_AMOUNT_TOO_LARGE: &str = "That amount is too large to split.";

pub const PAYMENT_FAILED: &str = "Something went wrong while preparing the payment.";

pub const QUICK_ACTIONS_UNAVAILABLE: &str =
    "Quick Actions are unavailable right now. Here are your options:\n\n";

pub const INTENT_FAILED: &str = "Something went wrong while processing your action.";

pub const ATTACHMENTS_DEMO_START: &str = "Sending demo files...";
pub const ATTACHMENT_SENT: &str = "📎 Demo attachment sent!";
pub const ATTACHMENT_FAILED: &str = "Couldn't send the demo attachment.";
pub const REMOTE_ATTACHMENT_SENT: &str = "🌐 Demo remote attachment sent!";
pub const REMOTE_ATTACHMENT_FAILED: &str = "Couldn't send the demo remote attachment.";
pub const ATTACHMENTS_DEMO_FAILED: &str = "Something went wrong while sending the demo files.";

pub const FILE_PROCESSED: &str = "✅ File processed.";
pub const FILE_UNSUPPORTED: &str = "This file type isn't supported yet.";
pub const FILE_FAILED: &str = "Something went wrong while processing the file.";

pub const CUSTOM_AMOUNT_PROMPT: &str =
    "Type the amount you want to send, for example: `pay $25 to 0x1234...abcd`";

pub const PAY_INSTRUCTIONS: &str =
    "To send a payment type: `pay $<amount> to <recipient>`\n\nExample: `pay $50 to 0x1234...abcd`";

pub const SPLIT_INSTRUCTIONS: &str =
    "To split a bill type: `split <description> $<amount> <people> ways`\n\nExample: `split dinner $200 4 ways`";

pub const TRADE_INSTRUCTIONS: &str =
    "Trading is coming soon! For now I can help with payments and bill splitting.";

pub const HELP_TEXT: &str = "🤖 **Aria - Your Onchain Assistant**

**Basics:**
• `/help` - show this help message
• `/about` - about Aria

**Payments:**
• `pay $<amount> to <recipient>` - send a payment
• `split <description> $<amount> <people> ways` - split a bill

**Demos:**
• `/actions demo` - Quick Actions example
• `/attachments demo` - file sending example

**Examples:**
• `split dinner $200 4 ways`
• `pay $50 to 0x1234...abcd`
• `@aria trade ETH`

**Group chats:**
In groups I only answer when mentioned with `@aria` or when you reply to one of my messages.

Safe, fast and easy onchain transactions with Aria! 🚀";

pub const ABOUT_TEXT: &str = "🤖 **About Aria**

Aria is an XMTP messaging agent built for Base App.

**Features:**
• ✅ Secure messaging (XMTP)
• ✅ Quick Actions for easy transactions
• ✅ Group and DM support
• ✅ File sharing
• ✅ Onchain transactions
• ✅ Rate limiting and safety

**Built with:**
• XMTP Protocol
• Base
• Rust

**Team:** Aria Team
**License:** MIT

More at: https://aria.chat";

/// Phrases that only the agent itself produces.
pub fn self_authored_phrases() -> impl Iterator<Item = &'static str> {
    GREETINGS
        .iter()
        .chain(FALLBACK_RESPONSES)
        .copied()
        .chain([RATE_LIMITED_PREFIX, GENERIC_ERROR, RESPONDER_APOLOGY])
}

pub fn rate_limited(reset_at: &str) -> String {
    format!("{RATE_LIMITED_PREFIX}. Try again at {reset_at}.")
}

/// Pick one of `options` at random.
pub fn pick(options: &[&'static str]) -> &'static str {
    use rand::seq::SliceRandom;
    options
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
}
