//! Payment, bill-split and demo quick-action handlers.

use chrono::{DateTime, Utc};

use crate::agent::Agent;
use crate::agent::dispatcher::Outbox;
use crate::agent::replies;
use crate::agent::router::{PayRequest, SplitRequest};
use crate::content::{Action, ActionStyle, ActionsMenu};
use crate::error::{Error, ValidationError, report_error};
use crate::wallet::{self, USDC};

/// The showcase menu behind `/actions demo`.
pub fn demo_menu(now: DateTime<Utc>) -> ActionsMenu {
    ActionsMenu::new(
        format!("demo_{}", now.timestamp_millis()),
        "🚀 Aria Quick Actions demo. Pick what you'd like to do:",
    )
    .with_action(Action::new("help", "Help").with_style(ActionStyle::Primary))
    .with_action(Action::new("pay", "Send payment").with_style(ActionStyle::Primary))
    .with_action(Action::new("split", "Split a bill").with_style(ActionStyle::Secondary))
    .with_action(Action::new("trade", "Trade order").with_style(ActionStyle::Secondary))
}

impl Agent {
    /// Prepare a USDC transfer to the named recipient and confirm in text.
    ///
    /// Wallet shaping errors, such as a recipient that is not an address,
    /// are answered with a payment-error text rather than propagated.
    pub(super) async fn handle_pay(
        &self,
        outbox: &Outbox<'_>,
        request: PayRequest,
    ) -> Result<(), Error> {
        if request.validate().is_err() {
            outbox.text(replies::PAY_AMOUNT_NOT_POSITIVE).await?;
            return Ok(());
        }

        let from = outbox.message().wallet_address().to_string();
        let prepared = match wallet::token_transfer_request(
            &from,
            &request.recipient,
            &USDC,
            request.amount,
            self.config.chain_id,
        ) {
            Ok(calls) => outbox.wallet_calls(calls).await.map_err(Error::from),
            Err(e) => Err(Error::from(e)),
        };

        match prepared {
            Ok(()) => {
                outbox
                    .text(format!(
                        "${} to {} is ready to send. Check your wallet.",
                        request.amount,
                        wallet::format_address(&request.recipient)
                    ))
                    .await?;
            }
            Err(e) => {
                let amount = request.amount.to_string();
                report_error(
                    &e,
                    &[
                        ("command", "pay"),
                        ("amount", amount.as_str()),
                        ("to", request.recipient.as_str()),
                    ],
                );
                outbox.text(replies::PAYMENT_FAILED).await?;
            }
        }
        Ok(())
    }

    /// Offer per-person payment options for a bill.
    pub(super) async fn handle_split(
        &self,
        outbox: &Outbox<'_>,
        request: SplitRequest,
    ) -> Result<(), Error> {
        match request.validate() {
            Ok(()) => {}
            Err(ValidationError::InvalidValue { .. }) => {
                outbox.text(replies::SPLIT_AMOUNT_TOO_LARGE).await?;
                return Ok(());
            }
            Err(_) => {
                outbox.text(replies::SPLIT_VALUES_NOT_POSITIVE).await?;
                return Ok(());
            }
        }
        let menu = request.menu(Utc::now())?;
        outbox.quick_actions(&menu).await?;
        Ok(())
    }

    pub(super) async fn send_demo_actions(&self, outbox: &Outbox<'_>) -> Result<(), Error> {
        outbox.quick_actions(&demo_menu(Utc::now())).await?;
        Ok(())
    }
}
