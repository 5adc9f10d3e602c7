//! Interactive REPL channel with line editing and markdown rendering.
//!
//! Simulates a direct-message conversation with the agent from a terminal.
//! Uses rustyline for line editing, history, and tab-completion.
//! Uses termimad for rendering markdown responses inline.
//!
//! ## Local commands
//!
//! - `/intent <action_id>` - Tap a quick-action button
//! - `/group <text>` - Send the text into a simulated group chat
//! - `/quit` or `/exit` - Exit the REPL
//!
//! Everything else, including `/help`, goes to the agent.

use std::borrow::Cow;

use async_trait::async_trait;
use rustyline::completion::Completer;
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Editor, Helper};
use termimad::MadSkin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::agent::attachments::format_size;
use crate::channels::{Channel, MessageStream, Transport};
use crate::content::{InboundMessage, Intent, MessageContent, OutgoingContent};
use crate::error::ChannelError;
use crate::wallet::format_address;

const DEFAULT_SENDER: &str = "repl";
const GROUP_CONVERSATION: &str = "repl-group";

/// Slash commands offered for completion.
const SLASH_COMMANDS: &[&str] = &[
    "/help",
    "/about",
    "/actions demo",
    "/attachments demo",
    "/pay",
    "/split",
    "/intent",
    "/group",
    "/quit",
    "/exit",
];

/// Rustyline helper for slash-command tab completion.
struct ReplHelper;

impl Completer for ReplHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let prefix = &line[..pos];
        let matches: Vec<String> = SLASH_COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| cmd.to_string())
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if !line.starts_with('/') || pos < line.len() {
            return None;
        }

        SLASH_COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && **cmd != line)
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ReplHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{hint}\x1b[0m"))
    }
}

impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

/// Build a termimad skin with our color scheme.
fn make_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.set_headers_fg(termimad::crossterm::style::Color::Magenta);
    skin.bold.set_fg(termimad::crossterm::style::Color::White);
    skin.italic
        .set_fg(termimad::crossterm::style::Color::Magenta);
    skin.inline_code
        .set_fg(termimad::crossterm::style::Color::Green);
    skin.code_block
        .set_fg(termimad::crossterm::style::Color::Green);
    skin.code_block.left_margin = 2;
    skin
}

/// What one line of input turns into.
#[derive(Debug)]
enum ReplInput {
    Skip,
    Quit,
    Usage(&'static str),
    Message(Box<InboundMessage>),
}

/// Identity the REPL user speaks as.
#[derive(Debug, Clone)]
struct ReplUser {
    sender_id: String,
    sender_address: Option<String>,
}

impl ReplUser {
    fn message(&self, content: MessageContent) -> InboundMessage {
        let message = InboundMessage::new(self.sender_id.clone(), content);
        match &self.sender_address {
            Some(address) => message.with_sender_address(address.clone()),
            None => message,
        }
    }
}

fn parse_line(line: &str, user: &ReplUser) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Skip;
    }

    let (head, rest) = line
        .split_once(char::is_whitespace)
        .map(|(head, rest)| (head, rest.trim()))
        .unwrap_or((line, ""));

    match head.to_lowercase().as_str() {
        "/quit" | "/exit" => ReplInput::Quit,
        "/intent" if rest.is_empty() => ReplInput::Usage("usage: /intent <action_id>"),
        "/intent" => {
            let intent = Intent::new(uuid::Uuid::new_v4().to_string(), rest);
            ReplInput::Message(Box::new(user.message(MessageContent::Intent(intent))))
        }
        "/group" if rest.is_empty() => ReplInput::Usage("usage: /group <text>"),
        "/group" => ReplInput::Message(Box::new(
            user.message(MessageContent::Text(rest.to_string()))
                .in_group(GROUP_CONVERSATION),
        )),
        _ => ReplInput::Message(Box::new(
            user.message(MessageContent::Text(line.to_string())),
        )),
    }
}

/// Markdown rendering of outbound content for the terminal.
///
/// Quick-action menus become numbered lists with the `/intent` command that
/// taps each button.
pub fn render_outgoing(content: &OutgoingContent) -> String {
    match content {
        OutgoingContent::Text(text) => text.clone(),
        OutgoingContent::Reaction(reaction) => format!("*reacted {}*", reaction.emoji),
        OutgoingContent::Reply(reply) => format!("> *in reply*\n\n{}", reply.text),
        OutgoingContent::Attachment(attachment) => format!(
            "📎 **{}** ({}, {})",
            attachment.filename,
            attachment.mime_type,
            format_size(attachment.data.len())
        ),
        OutgoingContent::RemoteAttachment(attachment) => format!(
            "🔗 **{}** {}",
            attachment.filename.as_deref().unwrap_or("remote file"),
            attachment.url
        ),
        OutgoingContent::Actions(menu) => {
            let mut out = format!("**{}**\n", menu.description);
            for (i, action) in menu.actions.iter().enumerate() {
                out.push_str(&format!(
                    "\n{}. {} `/intent {}`",
                    i + 1,
                    action.label,
                    action.id
                ));
            }
            out
        }
        OutgoingContent::WalletSendCalls(request) => {
            let mut out = format!(
                "💳 **Wallet request** from `{}` on chain `{}`",
                format_address(&request.from),
                request.chain_id
            );
            if let Some(metadata) = &request.metadata {
                out.push_str(&format!("\n\n*{}*", metadata.description));
            }
            for call in &request.calls {
                out.push_str(&format!(
                    "\n\n* to `{}` value `{}` gas `{}`\n* data `{}`",
                    call.to, call.value, call.gas_limit, call.data
                ));
            }
            out
        }
        OutgoingContent::TransactionReference(reference) => format!(
            "🧾 **Transaction** `{}` on network `{}`",
            reference.reference, reference.network_id
        ),
    }
}

/// Get the history file path (~/.aria/history).
fn history_path() -> std::path::PathBuf {
    crate::bootstrap::aria_home_dir().join("history")
}

/// REPL channel with line editing and markdown rendering.
///
/// Acts as both the inbound channel and the transport the agent answers on.
pub struct ReplChannel {
    user: ReplUser,
    /// Optional single message to send (for -m flag).
    single_message: Option<String>,
}

impl ReplChannel {
    /// Create a new REPL channel.
    pub fn new() -> Self {
        Self {
            user: ReplUser {
                sender_id: DEFAULT_SENDER.to_string(),
                sender_address: None,
            },
            single_message: None,
        }
    }

    /// Create a REPL channel that sends a single message and exits.
    pub fn with_message(message: String) -> Self {
        Self {
            single_message: Some(message),
            ..Self::new()
        }
    }

    /// Speak as the given wallet address, so payments have a source.
    pub fn with_sender_address(mut self, address: impl Into<String>) -> Self {
        self.user.sender_address = Some(address.into());
        self
    }
}

impl Default for ReplChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for ReplChannel {
    fn name(&self) -> &str {
        "repl"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let user = self.user.clone();
        let single_message = self.single_message.clone();

        std::thread::spawn(move || {
            // Single message mode: send it and return
            if let Some(line) = single_message {
                if let ReplInput::Message(msg) = parse_line(&line, &user) {
                    let _ = tx.blocking_send(*msg);
                }
                return;
            }

            let config = match Config::builder().history_ignore_dups(true) {
                Ok(builder) => builder
                    .auto_add_history(true)
                    .completion_type(CompletionType::List)
                    .build(),
                Err(e) => {
                    eprintln!("Failed to configure line editor: {e}");
                    return;
                }
            };

            let mut rl = match Editor::with_config(config) {
                Ok(editor) => editor,
                Err(e) => {
                    eprintln!("Failed to initialize line editor: {e}");
                    return;
                }
            };

            rl.set_helper(Some(ReplHelper));

            let hist_path = history_path();
            if let Some(parent) = hist_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(&hist_path);

            println!(
                "\x1b[1mAria\x1b[0m  /help for commands, /intent <id> to tap a button, /group <text> for group chat, /quit to exit"
            );
            println!();

            loop {
                match rl.readline("\x1b[1;35m\u{203A}\x1b[0m ") {
                    Ok(line) => match parse_line(&line, &user) {
                        ReplInput::Skip => continue,
                        ReplInput::Quit => break,
                        ReplInput::Usage(usage) => println!("\x1b[90m{usage}\x1b[0m"),
                        ReplInput::Message(msg) => {
                            if tx.blocking_send(*msg).is_err() {
                                break;
                            }
                        }
                    },
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                    Err(e) => {
                        eprintln!("Input error: {e}");
                        break;
                    }
                }
            }

            let _ = rl.save_history(&history_path());
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[async_trait]
impl Transport for ReplChannel {
    fn name(&self) -> &str {
        "repl"
    }

    async fn send(
        &self,
        to: &InboundMessage,
        content: OutgoingContent,
    ) -> Result<(), ChannelError> {
        let width = termimad::crossterm::terminal::size()
            .map(|(w, _)| w as usize)
            .unwrap_or(80);

        if let OutgoingContent::Reaction(reaction) = &content {
            eprintln!("  \x1b[90m{}\x1b[0m", reaction.emoji);
            return Ok(());
        }

        let sep_width = width.min(80);
        let label = if to.is_group() { " group " } else { "" };
        eprintln!(
            "\x1b[90m{label}{}\x1b[0m",
            "\u{2500}".repeat(sep_width.saturating_sub(label.len()))
        );

        let skin = make_skin();
        let markdown = render_outgoing(&content);
        let text = termimad::FmtText::from(&skin, &markdown, Some(width));

        print!("{text}");
        println!();
        Ok(())
    }
}
