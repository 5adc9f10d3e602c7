//! Deciding whether a message is addressed to the agent.
//!
//! Direct messages always are. In groups the agent answers only when one of
//! its aliases is mentioned or when the message replies to something the
//! agent sent.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use regex::Regex;

use crate::agent::replies;
use crate::content::InboundMessage;

pub struct AddressingResolver {
    aliases: Vec<String>,
    agent_address: Option<String>,
    mention_matcher: Option<AhoCorasick>,
    self_phrase_matcher: Option<AhoCorasick>,
    alias_strip: Option<Regex>,
}

impl AddressingResolver {
    pub fn new(aliases: Vec<String>, agent_address: Option<String>) -> Self {
        let aliases: Vec<String> = aliases
            .into_iter()
            .map(|alias| alias.trim().to_string())
            .filter(|alias| !alias.is_empty())
            .collect();

        let mention_matcher = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .build(&aliases)
            .ok();
        let self_phrase_matcher = AhoCorasick::new(replies::self_authored_phrases()).ok();

        // Longest alias first so `@aria` is consumed whole rather than
        // leaving a stray `@` behind.
        let mut by_length = aliases.clone();
        by_length.sort_by_key(|alias| std::cmp::Reverse(alias.len()));
        let alternation = by_length
            .iter()
            .map(|alias| regex::escape(alias.trim_start_matches('@')))
            .filter(|alias| !alias.is_empty())
            .collect::<Vec<_>>()
            .join("|");
        let alias_strip = if alternation.is_empty() {
            None
        } else {
            Regex::new(&format!(r"(?i)@?(?:{alternation})\s*")).ok()
        };

        Self {
            aliases,
            agent_address,
            mention_matcher,
            self_phrase_matcher,
            alias_strip,
        }
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Whether the text mentions any alias, case-insensitively.
    pub fn is_mentioned(&self, text: &str) -> bool {
        self.mention_matcher
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(text))
    }

    /// Whether the message replies to one of the agent's own messages.
    pub fn is_reply_to_self(&self, message: &InboundMessage) -> bool {
        let Some(agent_address) = self.agent_address.as_deref() else {
            return false;
        };
        message
            .reply_reference
            .as_ref()
            .and_then(|reference| reference.sender_address.as_deref())
            .is_some_and(|sender| sender.eq_ignore_ascii_case(agent_address))
    }

    /// Best-effort check for the agent's own canned phrases.
    pub fn is_self_authored(&self, text: &str) -> bool {
        self.self_phrase_matcher
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(text))
    }

    pub fn should_respond(&self, message: &InboundMessage) -> bool {
        let text = message.text_content();

        if let Some(text) = text
            && self.is_self_authored(text)
        {
            let preview: String = text.chars().take(50).collect();
            tracing::debug!(preview = %preview, "Skipping own message");
            return false;
        }

        if !message.is_group() {
            return true;
        }

        text.is_some_and(|text| self.is_mentioned(text)) || self.is_reply_to_self(message)
    }

    /// Strip alias mentions and surrounding whitespace.
    pub fn extract_message_content(&self, text: &str) -> String {
        match &self.alias_strip {
            Some(regex) => regex.replace_all(text, "").trim().to_string(),
            None => text.trim().to_string(),
        }
    }
}
