//! Quick-action taps.
//!
//! Every intent is acknowledged with ⌛ and settled with ✅ or ❌. Errors
//! never leave [`Agent::handle_intent`].

use rust_decimal::Decimal;

use crate::agent::Agent;
use crate::agent::dispatcher::Outbox;
use crate::agent::replies;
use crate::content::Intent;
use crate::error::{Error, report_error};
use crate::wallet::{self, USDC};

/// What a tapped action id asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentAction {
    /// `send_<amount>`, from fixed-amount buttons and split menus.
    SendAmount(Decimal),
    CustomAmount,
    Help,
    Pay,
    Split,
    Trade,
    Unknown(String),
}

impl IntentAction {
    pub fn parse(action_id: &str) -> Self {
        match action_id {
            "custom_amount" => Self::CustomAmount,
            "help" => Self::Help,
            "pay" => Self::Pay,
            "split" => Self::Split,
            "trade" => Self::Trade,
            other => other
                .strip_prefix("send_")
                .and_then(|amount| amount.parse::<Decimal>().ok())
                .filter(|amount| *amount > Decimal::ZERO)
                .map(Self::SendAmount)
                .unwrap_or_else(|| Self::Unknown(other.to_string())),
        }
    }
}

impl Agent {
    pub(super) async fn handle_intent(&self, outbox: &Outbox<'_>, intent: &Intent) {
        if let Err(e) = self.run_intent(outbox, intent).await {
            report_error(
                &e,
                &[
                    ("intent_id", intent.id.as_str()),
                    ("action_id", intent.action_id.as_str()),
                ],
            );
            outbox.react("❌").await;
            if let Err(e) = outbox.text(replies::INTENT_FAILED).await {
                tracing::warn!(intent_id = %intent.id, "Failed to send intent apology: {e}");
            }
        }
    }

    async fn run_intent(&self, outbox: &Outbox<'_>, intent: &Intent) -> Result<(), Error> {
        intent.validate()?;

        tracing::info!(
            event = "intent_received",
            intent_id = %intent.id,
            action_id = %intent.action_id,
            "Intent received"
        );
        outbox.react("⌛").await;

        match IntentAction::parse(&intent.action_id) {
            IntentAction::SendAmount(amount) => {
                // The tapping user is both payer and recipient until menus
                // carry a payee.
                let sender = outbox.message().wallet_address().to_string();
                let calls = wallet::token_transfer_request(
                    &sender,
                    &sender,
                    &USDC,
                    amount,
                    self.config.chain_id,
                )?;
                outbox.wallet_calls(calls).await?;
                outbox
                    .text(format!(
                        "${amount} payment started. Check your wallet to approve it."
                    ))
                    .await?;
            }
            IntentAction::CustomAmount => outbox.text(replies::CUSTOM_AMOUNT_PROMPT).await?,
            IntentAction::Help => outbox.text(replies::HELP_TEXT).await?,
            IntentAction::Pay => outbox.text(replies::PAY_INSTRUCTIONS).await?,
            IntentAction::Split => outbox.text(replies::SPLIT_INSTRUCTIONS).await?,
            IntentAction::Trade => outbox.text(replies::TRADE_INSTRUCTIONS).await?,
            IntentAction::Unknown(id) => {
                outbox
                    .text(format!("Unknown action: {id}. Please pick one of the options."))
                    .await?
            }
        }

        outbox.react("✅").await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_fixed_and_split_amounts() {
        assert_eq!(IntentAction::parse("send_10"), IntentAction::SendAmount(dec!(10)));
        assert_eq!(IntentAction::parse("send_50"), IntentAction::SendAmount(dec!(50)));
        assert_eq!(
            IntentAction::parse("send_33.33"),
            IntentAction::SendAmount(dec!(33.33))
        );
    }

    #[test]
    fn parses_named_actions() {
        assert_eq!(IntentAction::parse("custom_amount"), IntentAction::CustomAmount);
        assert_eq!(IntentAction::parse("help"), IntentAction::Help);
        assert_eq!(IntentAction::parse("pay"), IntentAction::Pay);
        assert_eq!(IntentAction::parse("split"), IntentAction::Split);
        assert_eq!(IntentAction::parse("trade"), IntentAction::Trade);
    }

    #[test]
    fn rejects_malformed_amounts() {
        for id in ["send_", "send_abc", "send_0", "send_-5", "HELP", "other"] {
            assert_eq!(
                IntentAction::parse(id),
                IntentAction::Unknown(id.to_string()),
                "{id}"
            );
        }
    }
}
