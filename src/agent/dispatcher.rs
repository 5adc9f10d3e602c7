//! Send primitives and command dispatch.

use crate::agent::Agent;
use crate::agent::replies;
use crate::agent::router::ParsedCommand;
use crate::channels::Transport;
use crate::content::{
    ActionsMenu, Attachment, InboundMessage, OutgoingContent, Reaction, RemoteAttachment, Reply,
    WalletSendCalls,
};
use crate::error::{ChannelError, Error, report_error};
use crate::wallet;

/// Send primitives bound to the message being answered.
///
/// Reactions are best effort and never fail the caller. Every other send
/// returns the transport's error.
pub struct Outbox<'a> {
    transport: &'a dyn Transport,
    message: &'a InboundMessage,
}

impl<'a> Outbox<'a> {
    pub fn new(transport: &'a dyn Transport, message: &'a InboundMessage) -> Self {
        Self { transport, message }
    }

    pub fn message(&self) -> &InboundMessage {
        self.message
    }

    async fn send(&self, content: OutgoingContent) -> Result<(), ChannelError> {
        let label = content.label();
        self.transport.send(self.message, content).await?;
        tracing::debug!(
            conversation = %self.message.conversation_id,
            content = label,
            "Sent content"
        );
        Ok(())
    }

    pub async fn text(&self, text: impl Into<String>) -> Result<(), ChannelError> {
        self.send(OutgoingContent::Text(text.into())).await
    }

    /// Text threaded under the inbound message.
    pub async fn reply(&self, text: impl Into<String>) -> Result<(), ChannelError> {
        self.send(OutgoingContent::Reply(Reply {
            reference: self.message.id.clone(),
            text: text.into(),
        }))
        .await
    }

    /// React to the inbound message. Failures are logged and swallowed.
    pub async fn react(&self, emoji: &str) {
        let reaction = OutgoingContent::Reaction(Reaction {
            reference: self.message.id.clone(),
            emoji: emoji.to_string(),
        });
        if let Err(e) = self.send(reaction).await {
            tracing::warn!(
                conversation = %self.message.conversation_id,
                emoji,
                "Failed to send reaction: {e}"
            );
        }
    }

    pub async fn attachment(&self, attachment: Attachment) -> Result<(), ChannelError> {
        self.send(OutgoingContent::Attachment(attachment)).await
    }

    pub async fn remote_attachment(&self, attachment: RemoteAttachment) -> Result<(), ChannelError> {
        self.send(OutgoingContent::RemoteAttachment(attachment))
            .await
    }

    pub async fn wallet_calls(&self, calls: WalletSendCalls) -> Result<(), ChannelError> {
        self.send(OutgoingContent::WalletSendCalls(calls)).await
    }

    /// Send a transaction reference; the network defaults to Base mainnet.
    pub async fn transaction_receipt(
        &self,
        hash: &str,
        network_id: Option<u64>,
    ) -> Result<(), ChannelError> {
        self.send(OutgoingContent::TransactionReference(
            wallet::transaction_receipt(hash, network_id),
        ))
        .await
    }

    /// Send a quick-action menu followed by its plain-text enumeration.
    ///
    /// When the menu is invalid or the rich send fails, only the
    /// enumeration goes out, prefixed with an apology.
    pub async fn quick_actions(&self, menu: &ActionsMenu) -> Result<(), ChannelError> {
        let fallback = menu.fallback_text();

        let rich = match menu.validate() {
            Ok(()) => self
                .send(OutgoingContent::Actions(menu.clone()))
                .await
                .map_err(Error::from),
            Err(e) => Err(Error::from(e)),
        };

        match rich {
            Ok(()) => {
                tracing::info!(
                    event = "quick_actions_sent",
                    actions_id = %menu.id,
                    action_count = menu.actions.len(),
                    "Quick actions sent"
                );
                self.text(fallback).await
            }
            Err(e) => {
                report_error(&e, &[("menu_id", menu.id.as_str())]);
                self.text(format!("{}{}", replies::QUICK_ACTIONS_UNAVAILABLE, fallback))
                    .await
            }
        }
    }
}

impl Agent {
    /// Run the action for a parsed command.
    pub(super) async fn dispatch_command(
        &self,
        outbox: &Outbox<'_>,
        command: ParsedCommand,
    ) -> Result<(), Error> {
        match command {
            ParsedCommand::Greeting => outbox.text(replies::pick(replies::GREETINGS)).await?,
            ParsedCommand::Help => outbox.text(replies::HELP_TEXT).await?,
            ParsedCommand::About => outbox.text(replies::ABOUT_TEXT).await?,
            ParsedCommand::PayFormatHelp => outbox.text(replies::PAY_FORMAT_HELP).await?,
            ParsedCommand::SplitFormatHelp => outbox.text(replies::SPLIT_FORMAT_HELP).await?,
            ParsedCommand::Pay(request) => self.handle_pay(outbox, request).await?,
            ParsedCommand::Split(request) => self.handle_split(outbox, request).await?,
            ParsedCommand::ActionsDemo => self.send_demo_actions(outbox).await?,
            ParsedCommand::AttachmentsDemo => {
                if let Err(e) = self.send_attachments_demo(outbox).await {
                    report_error(&e, &[("command", "attachments.demo")]);
                    outbox.text(replies::ATTACHMENTS_DEMO_FAILED).await?;
                }
            }
            ParsedCommand::FreeText { text } => self.converse(outbox, &text).await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::RecordingTransport;
    use crate::content::Action;

    fn menu(actions: usize) -> ActionsMenu {
        (0..actions).fold(ActionsMenu::new("m1", "Pick"), |menu, i| {
            menu.with_action(Action::new(format!("a{i}"), format!("Option {i}")))
        })
    }

    #[tokio::test]
    async fn quick_actions_send_rich_then_text() {
        let transport = RecordingTransport::new();
        let msg = InboundMessage::text("alice", "hi");
        let outbox = Outbox::new(&transport, &msg);

        outbox.quick_actions(&menu(2)).await.unwrap();

        assert_eq!(transport.labels(), vec!["actions", "text"]);
        assert_eq!(
            transport.texts(),
            vec!["Pick\n\n[1] Option 0\n[2] Option 1\n\nReply with the number to choose."]
        );
    }

    #[tokio::test]
    async fn invalid_menu_is_never_sent() {
        let transport = RecordingTransport::new();
        let msg = InboundMessage::text("alice", "hi");
        let outbox = Outbox::new(&transport, &msg);

        outbox.quick_actions(&menu(11)).await.unwrap();

        assert_eq!(transport.labels(), vec!["text"]);
        assert!(transport.texts()[0].starts_with(replies::QUICK_ACTIONS_UNAVAILABLE));
        assert!(transport.texts()[0].contains("[11] Option 10"));
    }

    #[tokio::test]
    async fn rich_send_failure_falls_back_to_text() {
        let transport = RecordingTransport::new().fail_on("actions");
        let msg = InboundMessage::text("alice", "hi");
        let outbox = Outbox::new(&transport, &msg);

        outbox.quick_actions(&menu(3)).await.unwrap();

        assert_eq!(transport.labels(), vec!["text"]);
        assert!(transport.texts()[0].starts_with("Quick Actions are unavailable"));
    }

    #[tokio::test]
    async fn reaction_failures_are_swallowed_but_text_failures_are_not() {
        let transport = RecordingTransport::new()
            .fail_on("reaction")
            .fail_on("text");
        let msg = InboundMessage::text("alice", "hi");
        let outbox = Outbox::new(&transport, &msg);

        outbox.react("⌛").await;
        assert!(outbox.text("hello").await.is_err());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn transaction_receipt_defaults_to_base() {
        let transport = RecordingTransport::new();
        let msg = InboundMessage::text("alice", "hi");
        let outbox = Outbox::new(&transport, &msg);

        outbox.transaction_receipt("0xfeed", None).await.unwrap();
        match &transport.sent()[0].content {
            OutgoingContent::TransactionReference(reference) => {
                assert_eq!(reference.network_id, 8453);
                assert_eq!(reference.reference, "0xfeed");
            }
            other => panic!("Expected transaction reference, got {other:?}"),
        }
    }
}
