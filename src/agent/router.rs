//! Command parsing for inbound text.
//!
//! Several grammars compete for the same text. They are tried in a fixed
//! order and the first match wins; anything unmatched is free text for the
//! conversational responder.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::content::{Action, ActionStyle, ActionsMenu};
use crate::error::ValidationError;

static PAY_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)pay\s+\$?(\d+(?:\.\d{2})?)\s+to\s+(.+)").ok());

static SPLIT_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)split\s+(.+?)\s+\$?(\d+(?:\.\d{2})?)\s+(\d+)\s+ways?").ok()
});

/// How long a split menu stays valid.
pub const SPLIT_MENU_TTL_MINUTES: i64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayRequest {
    pub amount: Decimal,
    pub recipient: String,
}

impl PayRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveNumber("amount"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRequest {
    pub description: String,
    pub amount: Decimal,
    pub participants: u32,
}

impl SplitRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveNumber("amount"));
        }
        if self.participants == 0 {
            return Err(ValidationError::NonPositiveNumber("participants"));
        }
        if self.share().is_zero() {
            return Err(ValidationError::NonPositiveNumber("share"));
        }
        self.suggested_amounts().map(|_| ())
    }

    /// Per-person share, rounded to cents half away from zero.
    pub fn share(&self) -> Decimal {
        if self.participants == 0 {
            return Decimal::ZERO;
        }
        (self.amount / Decimal::from(self.participants))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// One, two and three shares. Fails when three shares do not fit a
    /// `Decimal`.
    pub fn suggested_amounts(&self) -> Result<[Decimal; 3], ValidationError> {
        let share = self.share();
        let multiple = |n: i64| {
            share
                .checked_mul(Decimal::from(n))
                .ok_or_else(|| ValidationError::InvalidValue {
                    field: "amount",
                    reason: "too large to split".to_string(),
                })
        };
        Ok([share, multiple(2)?, multiple(3)?])
    }

    /// Quick-action menu offering the suggested amounts plus a custom one.
    pub fn menu(&self, now: DateTime<Utc>) -> Result<ActionsMenu, ValidationError> {
        let amounts = self.suggested_amounts()?;
        let menu = ActionsMenu::new(
            format!("split_{}", now.timestamp_millis()),
            format!(
                "💰 {}: ${} split {} ways. {} people payment options",
                self.description,
                self.amount,
                self.participants,
                self.participants
            ),
        )
        .expires_at(now + Duration::minutes(SPLIT_MENU_TTL_MINUTES));

        Ok(amounts
            .into_iter()
            .fold(menu, |menu, amount| {
                let amount = amount.normalize();
                menu.with_action(
                    Action::new(format!("send_{amount}"), format!("Send ${amount}"))
                        .with_style(ActionStyle::Primary),
                )
            })
            .with_action(
                Action::new("custom_amount", "Custom amount").with_style(ActionStyle::Secondary),
            ))
    }
}

/// Parsed form of an addressed text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Greeting,
    Help,
    About,
    Pay(PayRequest),
    PayFormatHelp,
    Split(SplitRequest),
    SplitFormatHelp,
    ActionsDemo,
    AttachmentsDemo,
    FreeText { text: String },
}

impl ParsedCommand {
    /// Stable label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Help => "help",
            Self::About => "about",
            Self::Pay(_) => "pay",
            Self::PayFormatHelp => "pay.format_help",
            Self::Split(_) => "split",
            Self::SplitFormatHelp => "split.format_help",
            Self::ActionsDemo => "actions.demo",
            Self::AttachmentsDemo => "attachments.demo",
            Self::FreeText { .. } => "free_text",
        }
    }
}

pub fn parse_pay(text: &str) -> Option<PayRequest> {
    let captures = PAY_PATTERN.as_ref()?.captures(text)?;
    Some(PayRequest {
        amount: Decimal::from_str(captures.get(1)?.as_str()).ok()?,
        recipient: captures.get(2)?.as_str().trim().to_string(),
    })
}

pub fn parse_split(text: &str) -> Option<SplitRequest> {
    let captures = SPLIT_PATTERN.as_ref()?.captures(text)?;
    Some(SplitRequest {
        description: captures.get(1)?.as_str().trim().to_string(),
        amount: Decimal::from_str(captures.get(2)?.as_str()).ok()?,
        participants: captures.get(3)?.as_str().parse().ok()?,
    })
}

const COMMAND_PREFIX: &str = "/";

/// Routes cleaned message text to a [`ParsedCommand`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Router;

impl Router {
    pub fn new() -> Self {
        Self
    }

    fn command(&self, name: &str) -> String {
        format!("{COMMAND_PREFIX}{name}")
    }

    /// Parse mention-stripped text. First match wins.
    pub fn parse(&self, cleaned: &str) -> ParsedCommand {
        let lower = cleaned.trim().to_lowercase();

        if matches!(lower.as_str(), "gm" | "hello" | "hi") {
            ParsedCommand::Greeting
        } else if lower == self.command("help") {
            ParsedCommand::Help
        } else if lower == self.command("about") {
            ParsedCommand::About
        } else if lower.starts_with(&self.command("split")) {
            Self::split(cleaned)
        } else if lower.starts_with(&self.command("pay")) {
            Self::pay(cleaned)
        } else if lower == self.command("actions demo") {
            ParsedCommand::ActionsDemo
        } else if lower == self.command("attachments demo") {
            ParsedCommand::AttachmentsDemo
        } else if lower.starts_with("split ") {
            Self::split(cleaned)
        } else if lower.starts_with("pay ") {
            Self::pay(cleaned)
        } else if lower.contains("split") && lower.contains('$') {
            Self::split(cleaned)
        } else if lower.contains("pay") && lower.contains('$') {
            Self::pay(cleaned)
        } else {
            ParsedCommand::FreeText {
                text: cleaned.to_string(),
            }
        }
    }

    fn pay(text: &str) -> ParsedCommand {
        parse_pay(text)
            .map(ParsedCommand::Pay)
            .unwrap_or(ParsedCommand::PayFormatHelp)
    }

    fn split(text: &str) -> ParsedCommand {
        parse_split(text)
            .map(ParsedCommand::Split)
            .unwrap_or(ParsedCommand::SplitFormatHelp)
    }
}
