//! The message pipeline.
//!
//! [`Agent::handle`] is the per-message boundary: it routes one normalized
//! [`InboundMessage`] to the text pipeline, the intent handler or the
//! attachment acknowledgement, and never returns an error. [`Agent::run`]
//! drives it from a channel's stream, one message at a time.

pub mod actions;
pub mod addressing;
pub mod attachments;
mod conversation;
pub mod dispatcher;
pub mod intent;
pub mod rate_limit;
pub mod replies;
pub mod router;

pub use addressing::AddressingResolver;
pub use dispatcher::Outbox;
pub use intent::IntentAction;
pub use rate_limit::{Clock, ManualClock, RateLimitEntry, RateLimiter, SystemClock};
pub use router::{ParsedCommand, PayRequest, Router, SplitRequest};

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;

use crate::channels::{MessageStream, Transport};
use crate::config::AgentConfig;
use crate::content::{InboundMessage, MessageContent};
use crate::error::report_error;
use crate::llm::Responder;

/// Truncate to `max` characters for log previews.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub struct Agent {
    config: AgentConfig,
    limiter: Arc<RateLimiter>,
    addressing: AddressingResolver,
    router: Router,
    responder: Option<Arc<dyn Responder>>,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_max_requests,
            config.rate_limit_window,
        ));
        let addressing =
            AddressingResolver::new(config.aliases.clone(), config.agent_address.clone());
        Self {
            config,
            limiter,
            addressing,
            router: Router::new(),
            responder: None,
        }
    }

    /// Use a generative responder for free text.
    pub fn with_responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Replace the rate limiter, e.g. with one driven by a manual clock.
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn addressing(&self) -> &AddressingResolver {
        &self.addressing
    }

    /// Process one inbound message to completion.
    pub async fn handle(&self, message: &InboundMessage, transport: &dyn Transport) {
        let outbox = Outbox::new(transport, message);
        match &message.content {
            MessageContent::Text(text) => self.handle_text(&outbox, text).await,
            MessageContent::Intent(intent) => self.handle_intent(&outbox, intent).await,
            MessageContent::Attachment(attachment) => {
                if self.addressing.should_respond(message) {
                    self.handle_attachment(&outbox, attachment).await;
                }
            }
            MessageContent::RemoteAttachment(attachment) => {
                if self.addressing.should_respond(message) {
                    self.handle_remote_attachment(&outbox, attachment).await;
                }
            }
            MessageContent::Unknown { content_type } => {
                tracing::debug!(
                    message_id = %message.id,
                    content_type = %content_type,
                    "Ignoring unsupported content"
                );
            }
        }
    }

    async fn handle_text(&self, outbox: &Outbox<'_>, text: &str) {
        let message = outbox.message();
        tracing::info!(
            event = "message_received",
            sender = %message.sender_id,
            conversation = %message.conversation_id,
            kind = message.conversation_kind.context_label(),
            content = %truncate(text, 100),
            "Message received"
        );

        if !self.addressing.should_respond(message) {
            return;
        }

        if !self.limiter.admit(&message.sender_id) {
            let reset_at = self.limiter.reset_time(&message.sender_id);
            let notice = replies::rate_limited(&reset_at.format("%H:%M:%S UTC").to_string());
            // Threaded in groups so the notice names its target.
            let sent = if message.is_group() {
                outbox.reply(notice).await
            } else {
                outbox.text(notice).await
            };
            if let Err(e) = sent {
                tracing::warn!(sender = %message.sender_id, "Failed to send rate limit notice: {e}");
            }
            return;
        }

        let cleaned = self.addressing.extract_message_content(text);
        let command = self.router.parse(&cleaned);
        let label = command.label();

        match self.dispatch_command(outbox, command).await {
            Ok(()) => {
                tracing::info!(
                    event = "message_sent",
                    sender = %message.sender_id,
                    command = label,
                    "Message handled"
                );
            }
            Err(e) => {
                report_error(
                    &e,
                    &[("sender", message.sender_id.as_str()), ("command", label)],
                );
                outbox.react("❌").await;
                if let Err(e) = outbox.text(replies::GENERIC_ERROR).await {
                    tracing::warn!(sender = %message.sender_id, "Failed to send error reply: {e}");
                }
            }
        }
    }

    /// Handle messages from `stream` until it ends or `shutdown` resolves.
    ///
    /// The rate limiter's sweeper runs for as long as the loop does.
    pub async fn run<F>(&self, mut stream: MessageStream, transport: &dyn Transport, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let sweeper = Arc::clone(&self.limiter).spawn_sweeper(self.config.rate_limit_sweep_interval);
        tokio::pin!(shutdown);

        tracing::info!(transport = transport.name(), "Agent loop started");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                next = stream.next() => match next {
                    Some(message) => self.handle(&message, transport).await,
                    None => {
                        tracing::info!("Inbound stream closed");
                        break;
                    }
                },
            }
        }

        sweeper.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::channels::RecordingTransport;
    use crate::content::{Attachment, Intent, OutgoingContent};
    use crate::error::LlmError;

    const SENDER: &str = "0x1111111111111111111111111111111111111111";
    const AGENT: &str = "0x2222222222222222222222222222222222222222";

    struct FixedResponder(Result<String, ()>);

    #[async_trait]
    impl Responder for FixedResponder {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate_response(&self, message: &str, context: &str) -> Result<String, LlmError> {
            self.0
                .clone()
                .map(|reply| format!("{reply} [{context}] {message}"))
                .map_err(|()| LlmError::InvalidResponse {
                    provider: "fixed".to_string(),
                    reason: "down".to_string(),
                })
        }
    }

    struct SlowResponder;

    #[async_trait]
    impl Responder for SlowResponder {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate_response(&self, _: &str, _: &str) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    /// Fails the first text send, records everything else.
    struct FirstTextFails {
        inner: RecordingTransport,
        failed: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl Transport for FirstTextFails {
        fn name(&self) -> &str {
            "first-text-fails"
        }

        async fn send(
            &self,
            to: &InboundMessage,
            content: OutgoingContent,
        ) -> Result<(), crate::error::ChannelError> {
            if content.as_text().is_some()
                && !self.failed.swap(true, std::sync::atomic::Ordering::SeqCst)
            {
                return Err(crate::error::ChannelError::SendFailed {
                    name: "first-text-fails".to_string(),
                    content_type: content.label(),
                    reason: "offline".to_string(),
                });
            }
            self.inner.send(to, content).await
        }
    }

    fn config() -> AgentConfig {
        AgentConfig {
            agent_address: Some(AGENT.to_string()),
            attachment_demo_delay: Duration::ZERO,
            ..AgentConfig::default()
        }
    }

    fn agent() -> Agent {
        Agent::new(config())
    }

    fn text(body: &str) -> InboundMessage {
        InboundMessage::text(SENDER, body).with_sender_address(SENDER)
    }

    fn intent(action_id: &str) -> InboundMessage {
        InboundMessage::new(
            SENDER,
            MessageContent::Intent(Intent::new("intent-1", action_id)),
        )
        .with_sender_address(SENDER)
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
    }

    #[tokio::test]
    async fn greets_in_dm() {
        let transport = RecordingTransport::new();
        agent().handle(&text("gm"), &transport).await;

        let texts = transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(replies::GREETINGS.contains(&texts[0].as_str()));
    }

    #[tokio::test]
    async fn ignores_unaddressed_group_messages() {
        let transport = RecordingTransport::new();
        let agent = agent();

        agent.handle(&text("hello team").in_group("g1"), &transport).await;
        assert!(transport.sent().is_empty());

        agent
            .handle(&text("@aria /help").in_group("g1"), &transport)
            .await;
        assert_eq!(transport.texts(), vec![replies::HELP_TEXT.to_string()]);

        transport.take();
        agent
            .handle(&text("what now?").in_group("g1").replying_to(AGENT), &transport)
            .await;
        assert_eq!(transport.texts().len(), 1);
    }

    #[tokio::test]
    async fn ignores_own_canned_replies() {
        let transport = RecordingTransport::new();
        agent()
            .handle(&text(replies::GREETINGS[0]), &transport)
            .await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn rate_limits_the_sixth_message() {
        let transport = RecordingTransport::new();
        let agent = agent();

        for _ in 0..6 {
            agent.handle(&text("/about"), &transport).await;
        }

        let texts = transport.texts();
        assert_eq!(texts.len(), 6);
        assert!(texts[..5].iter().all(|t| t == replies::ABOUT_TEXT));
        assert!(texts[5].starts_with(replies::RATE_LIMITED_PREFIX));
        assert_eq!(agent.limiter().remaining(SENDER), 0);
    }

    #[tokio::test]
    async fn pay_sends_wallet_calls_then_confirmation() {
        let transport = RecordingTransport::new();
        agent()
            .handle(
                &text("pay $5 to 0x3333333333333333333333333333333333333333"),
                &transport,
            )
            .await;

        assert_eq!(transport.labels(), vec!["wallet_send_calls", "text"]);
        match &transport.sent()[0].content {
            OutgoingContent::WalletSendCalls(calls) => {
                assert_eq!(calls.from, SENDER);
                assert_eq!(calls.calls.len(), 1);
                assert!(calls.calls[0].data.ends_with(&format!("{:064x}", 5_000_000u64)));
            }
            other => panic!("Expected wallet calls, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pay_to_a_name_is_a_payment_error() {
        let transport = RecordingTransport::new();
        agent().handle(&text("pay $5 to alice"), &transport).await;
        assert_eq!(transport.texts(), vec![replies::PAYMENT_FAILED.to_string()]);
    }

    #[tokio::test]
    async fn non_positive_values_are_rejected() {
        let transport = RecordingTransport::new();
        let agent = agent();

        agent.handle(&text("pay $0 to alice"), &transport).await;
        agent.handle(&text("split dinner $100 0 ways"), &transport).await;

        assert_eq!(
            transport.texts(),
            vec![
                replies::PAY_AMOUNT_NOT_POSITIVE.to_string(),
                replies::SPLIT_VALUES_NOT_POSITIVE.to_string()
            ]
        );
    }

    #[tokio::test]
    async fn unsplittable_amounts_are_answered_in_text() {
        let transport = RecordingTransport::new();
        let agent = agent();

        agent.handle(&text("split gum $0.01 3 ways"), &transport).await;
        agent
            .handle(
                &text("split dinner $40000000000000000000000000000 1 ways"),
                &transport,
            )
            .await;

        assert_eq!(transport.labels(), vec!["text", "text"]);
        assert_eq!(
            transport.texts(),
            vec![
                replies::SPLIT_VALUES_NOT_POSITIVE.to_string(),
                replies::SPLIT_AMOUNT_TOO_LARGE.to_string()
            ]
        );
    }

    #[tokio::test]
    async fn group_rate_limit_notice_is_threaded() {
        let transport = RecordingTransport::new();
        let agent = agent();
        let message = text("@aria /about").in_group("g1");

        for _ in 0..6 {
            agent.handle(&message, &transport).await;
        }

        let sent = transport.sent();
        assert_eq!(sent.len(), 6);
        match &sent[5].content {
            OutgoingContent::Reply(reply) => {
                assert_eq!(reply.reference, message.id);
                assert!(reply.text.starts_with(replies::RATE_LIMITED_PREFIX));
            }
            other => panic!("Expected reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn attachments_demo_apologizes_when_its_status_fails() {
        let transport = FirstTextFails {
            inner: RecordingTransport::new(),
            failed: std::sync::atomic::AtomicBool::new(false),
        };
        agent().handle(&text("/attachments demo"), &transport).await;

        assert_eq!(
            transport.inner.texts(),
            vec![replies::ATTACHMENTS_DEMO_FAILED.to_string()]
        );
        assert_eq!(transport.inner.labels(), vec!["text"]);
    }

    #[tokio::test]
    async fn split_sends_menu_and_enumeration() {
        let transport = RecordingTransport::new();
        agent()
            .handle(&text("split dinner $100 3 ways"), &transport)
            .await;

        assert_eq!(transport.labels(), vec!["actions", "text"]);
        let enumeration = &transport.texts()[0];
        assert!(enumeration.contains("[1] Send $33.33"));
        assert!(enumeration.contains("[4] Custom amount"));
    }

    #[tokio::test]
    async fn failed_dispatch_reacts_and_apologizes() {
        let transport = RecordingTransport::new().fail_on("actions").fail_on("text");
        agent().handle(&text("/actions demo"), &transport).await;
        // Both the fallback enumeration and the apology fail; only the
        // reaction gets through.
        assert_eq!(transport.labels(), vec!["reaction"]);
    }

    #[tokio::test]
    async fn send_intent_shapes_one_wallet_call() {
        let transport = RecordingTransport::new();
        agent().handle(&intent("send_10"), &transport).await;

        assert_eq!(
            transport.labels(),
            vec!["reaction", "wallet_send_calls", "text", "reaction"]
        );
        let sent = transport.sent();
        assert!(matches!(
            &sent[0].content,
            OutgoingContent::Reaction(r) if r.emoji == "⌛"
        ));
        assert!(matches!(
            &sent[3].content,
            OutgoingContent::Reaction(r) if r.emoji == "✅"
        ));
    }

    #[tokio::test]
    async fn failed_intent_reacts_with_cross() {
        let transport = RecordingTransport::new().fail_on("wallet_send_calls");
        agent().handle(&intent("send_20"), &transport).await;

        assert_eq!(transport.labels(), vec!["reaction", "reaction", "text"]);
        let sent = transport.sent();
        assert!(matches!(
            &sent[1].content,
            OutgoingContent::Reaction(r) if r.emoji == "❌"
        ));
        assert_eq!(transport.texts(), vec![replies::INTENT_FAILED.to_string()]);
    }

    #[tokio::test]
    async fn invalid_intent_is_rejected_before_acknowledgement() {
        let transport = RecordingTransport::new();
        agent().handle(&intent(""), &transport).await;
        assert_eq!(transport.labels(), vec!["reaction", "text"]);
        assert_eq!(transport.texts(), vec![replies::INTENT_FAILED.to_string()]);
    }

    #[tokio::test]
    async fn unknown_intent_is_answered() {
        let transport = RecordingTransport::new();
        agent().handle(&intent("launch_rocket"), &transport).await;
        assert!(transport.texts()[0].starts_with("Unknown action: launch_rocket"));
    }

    #[tokio::test]
    async fn free_text_uses_responder_with_context() {
        let transport = RecordingTransport::new();
        let agent = agent().with_responder(Arc::new(FixedResponder(Ok("sure".to_string()))));

        agent.handle(&text("what is base?"), &transport).await;
        agent
            .handle(&text("aria what is base?").in_group("g1"), &transport)
            .await;

        assert_eq!(
            transport.texts(),
            vec![
                "sure [DM] what is base?".to_string(),
                "sure [Group chat] what is base?".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn responder_failure_is_an_apology() {
        let transport = RecordingTransport::new();
        let agent = agent().with_responder(Arc::new(FixedResponder(Err(()))));
        agent.handle(&text("tell me a story"), &transport).await;
        assert_eq!(transport.texts(), vec![replies::RESPONDER_APOLOGY.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn responder_timeout_is_an_apology() {
        let transport = RecordingTransport::new();
        let agent = agent().with_responder(Arc::new(SlowResponder));
        agent.handle(&text("tell me a story"), &transport).await;
        assert_eq!(transport.texts(), vec![replies::RESPONDER_APOLOGY.to_string()]);
    }

    #[tokio::test]
    async fn free_text_without_responder_is_canned() {
        let transport = RecordingTransport::new();
        agent().handle(&text("tell me a story"), &transport).await;
        let texts = transport.texts();
        assert!(replies::FALLBACK_RESPONSES.contains(&texts[0].as_str()));
    }

    #[tokio::test]
    async fn attachments_demo_reports_each_half() {
        let transport = RecordingTransport::new().fail_on("remote_attachment");
        agent().handle(&text("/attachments demo"), &transport).await;

        assert_eq!(transport.labels(), vec!["text", "attachment", "text", "text"]);
        assert_eq!(
            transport.texts(),
            vec![
                replies::ATTACHMENTS_DEMO_START.to_string(),
                replies::ATTACHMENT_SENT.to_string(),
                replies::REMOTE_ATTACHMENT_FAILED.to_string()
            ]
        );
    }

    #[tokio::test]
    async fn acknowledges_attachments_by_mime_type() {
        let transport = RecordingTransport::new();
        let agent = agent();
        let file = |name: &str, mime: &str, data: &[u8]| {
            InboundMessage::new(
                SENDER,
                MessageContent::Attachment(Attachment::new(name, mime, data.to_vec())),
            )
        };

        agent.handle(&file("a.png", "image/png", &[0; 2048]), &transport).await;
        agent.handle(&file("b.txt", "text/plain", b"notes"), &transport).await;
        agent
            .handle(&file("c.zip", "application/zip", b"PK"), &transport)
            .await;

        let texts = transport.texts();
        assert_eq!(texts[0], "📎 File received: a.png");
        assert!(texts[1].contains("2.0 KB"));
        assert_eq!(texts[3], "Preview:\n```\nnotes\n```");
        assert_eq!(texts[5], replies::FILE_UNSUPPORTED);
    }

    #[tokio::test]
    async fn unknown_content_is_dropped() {
        let transport = RecordingTransport::new();
        let msg = InboundMessage::new(
            SENDER,
            MessageContent::Unknown {
                content_type: "xmtp.org/readReceipt:1.0".to_string(),
            },
        );
        agent().handle(&msg, &transport).await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn run_stops_when_stream_ends() {
        let transport = RecordingTransport::new();
        let stream: MessageStream =
            Box::pin(futures::stream::iter(vec![text("/help"), text("/about")]));

        agent()
            .run(stream, &transport, std::future::pending())
            .await;

        assert_eq!(
            transport.texts(),
            vec![replies::HELP_TEXT.to_string(), replies::ABOUT_TEXT.to_string()]
        );
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let transport = RecordingTransport::new();
        let stream: MessageStream = Box::pin(futures::stream::pending());
        agent().run(stream, &transport, async {}).await;
        assert!(transport.sent().is_empty());
    }
}
