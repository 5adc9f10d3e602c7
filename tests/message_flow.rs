//! End-to-end message flows through the public agent API.

use std::time::Duration;

use aria::agent::{Agent, replies};
use aria::channels::{MessageStream, RecordingTransport};
use aria::config::AgentConfig;
use aria::content::{InboundMessage, Intent, MessageContent, OutgoingContent};
use pretty_assertions::assert_eq;

const ALICE: &str = "0x1111111111111111111111111111111111111111";
const ARIA: &str = "0x2222222222222222222222222222222222222222";

fn agent() -> Agent {
    Agent::new(AgentConfig {
        agent_address: Some(ARIA.to_string()),
        attachment_demo_delay: Duration::ZERO,
        ..AgentConfig::default()
    })
}

fn stream(messages: Vec<InboundMessage>) -> MessageStream {
    Box::pin(futures::stream::iter(messages))
}

#[tokio::test]
async fn split_menu_then_intent_requests_payment() {
    let agent = agent();
    let transport = RecordingTransport::new();

    agent
        .handle(
            &InboundMessage::text("alice", "split dinner $200 4 ways").with_sender_address(ALICE),
            &transport,
        )
        .await;

    let sent = transport.take();
    let menu = sent
        .iter()
        .find_map(|s| match &s.content {
            OutgoingContent::Actions(menu) => Some(menu.clone()),
            _ => None,
        })
        .expect("split should send a quick-action menu");
    let ids: Vec<&str> = menu.actions.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["send_50", "send_100", "send_150", "custom_amount"]);

    let selection = InboundMessage::new(
        "alice",
        MessageContent::Intent(Intent::new(menu.id.clone(), "send_100")),
    )
    .with_sender_address(ALICE);
    agent.handle(&selection, &transport).await;

    assert_eq!(
        transport.labels(),
        vec!["reaction", "wallet_send_calls", "text", "reaction"]
    );
    let calls = transport
        .sent()
        .into_iter()
        .find_map(|s| match s.content {
            OutgoingContent::WalletSendCalls(calls) => Some(calls),
            _ => None,
        })
        .unwrap();
    assert_eq!(calls.from, ALICE);
    assert_eq!(calls.chain_id, "0x2105");
    assert_eq!(calls.calls.len(), 1);
    assert!(transport.texts()[0].starts_with("$100"));
}

#[tokio::test]
async fn group_chat_only_answers_when_addressed() {
    let agent = agent();
    let transport = RecordingTransport::new();

    let chatter = InboundMessage::text("bob", "anyone up for lunch?").in_group("g1");
    let mention = InboundMessage::text("bob", "@aria /about").in_group("g1");
    let reply = InboundMessage::text("bob", "/help")
        .in_group("g1")
        .replying_to(ARIA);

    agent
        .run(stream(vec![chatter, mention, reply]), &transport, std::future::pending())
        .await;

    assert_eq!(
        transport.texts(),
        vec![replies::ABOUT_TEXT.to_string(), replies::HELP_TEXT.to_string()]
    );
}

#[tokio::test]
async fn flooding_sender_is_told_to_wait() {
    let agent = agent();
    let transport = RecordingTransport::new();

    let messages = (0..7)
        .map(|_| InboundMessage::text("carol", "/about"))
        .collect();
    agent
        .run(stream(messages), &transport, std::future::pending())
        .await;

    let texts = transport.texts();
    assert_eq!(texts.len(), 7);
    assert!(texts[..5].iter().all(|t| t == replies::ABOUT_TEXT));
    assert!(texts[5..].iter().all(|t| t.starts_with(replies::RATE_LIMITED_PREFIX)));
}

#[tokio::test]
async fn free_text_without_responder_gets_canned_reply() {
    let agent = agent();
    let transport = RecordingTransport::new();

    agent
        .handle(&InboundMessage::text("dave", "what's the weather"), &transport)
        .await;

    let texts = transport.texts();
    assert_eq!(texts.len(), 1);
    assert!(replies::FALLBACK_RESPONSES.contains(&texts[0].as_str()));
}

#[tokio::test]
async fn stream_stops_on_shutdown() {
    let agent = agent();
    let transport = RecordingTransport::new();
    let (tx, rx) = tokio::sync::mpsc::channel::<InboundMessage>(4);
    let stream: MessageStream = Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx));

    tx.send(InboundMessage::text("erin", "gm")).await.unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let run = agent.run(stream, &transport, async {
        let _ = stop_rx.await;
    });
    let stop = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = stop_tx.send(());
    };
    tokio::join!(run, stop);

    assert_eq!(transport.texts().len(), 1);
    drop(tx);
}
