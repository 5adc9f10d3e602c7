//! Attachment acknowledgement and the attachments demo.

use crate::agent::Agent;
use crate::agent::dispatcher::Outbox;
use crate::agent::replies;
use crate::content::{Attachment, RemoteAttachment};
use crate::error::{Error, report_error};

pub const DEMO_FILENAME: &str = "aria-demo.txt";
pub const DEMO_IMAGE_URL: &str = "https://via.placeholder.com/300x200/4F46E5/FFFFFF?text=Aria+Demo";
pub const DEMO_IMAGE_FILENAME: &str = "aria-demo-image.png";

const TEXT_PREVIEW_CHARS: usize = 500;

fn demo_attachment() -> Attachment {
    let body = "Hello from Aria! 👋\n\n\
                This file was sent as an inline XMTP attachment.\n\
                Try `/help` to see everything Aria can do.\n";
    Attachment::new(DEMO_FILENAME, "text/plain", body.as_bytes().to_vec())
}

fn demo_remote_attachment() -> RemoteAttachment {
    RemoteAttachment {
        url: DEMO_IMAGE_URL.to_string(),
        filename: Some(DEMO_IMAGE_FILENAME.to_string()),
        mime_type: Some("image/png".to_string()),
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

/// Fenced preview of a text attachment, truncated to 500 characters.
pub fn text_preview(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    let mut preview: String = text.chars().take(TEXT_PREVIEW_CHARS).collect();
    if text.chars().count() > TEXT_PREVIEW_CHARS {
        preview.push_str("...");
    }
    format!("Preview:\n```\n{preview}\n```")
}

impl Agent {
    /// Send an inline text file, pause, then a remote image.
    ///
    /// Each half reports its own failure; a failed status text aborts.
    pub(super) async fn send_attachments_demo(&self, outbox: &Outbox<'_>) -> Result<(), Error> {
        outbox.text(replies::ATTACHMENTS_DEMO_START).await?;

        match outbox.attachment(demo_attachment()).await {
            Ok(()) => outbox.text(replies::ATTACHMENT_SENT).await?,
            Err(e) => {
                report_error(&Error::from(e), &[("filename", DEMO_FILENAME)]);
                outbox.text(replies::ATTACHMENT_FAILED).await?;
            }
        }

        tokio::time::sleep(self.config.attachment_demo_delay).await;

        match outbox.remote_attachment(demo_remote_attachment()).await {
            Ok(()) => outbox.text(replies::REMOTE_ATTACHMENT_SENT).await?,
            Err(e) => {
                report_error(&Error::from(e), &[("url", DEMO_IMAGE_URL)]);
                outbox.text(replies::REMOTE_ATTACHMENT_FAILED).await?;
            }
        }
        Ok(())
    }

    pub(super) async fn handle_attachment(&self, outbox: &Outbox<'_>, attachment: &Attachment) {
        if let Err(e) = acknowledge_attachment(outbox, attachment).await {
            report_error(&e, &[("filename", attachment.filename.as_str())]);
            if let Err(e) = outbox.text(replies::FILE_FAILED).await {
                tracing::warn!("Failed to send attachment apology: {e}");
            }
        }
    }

    pub(super) async fn handle_remote_attachment(
        &self,
        outbox: &Outbox<'_>,
        attachment: &RemoteAttachment,
    ) {
        let name = attachment.filename.as_deref().unwrap_or("file");
        let ack = format!("📎 File received: {name}\n🔗 {}", attachment.url);
        if let Err(e) = outbox.text(ack).await {
            report_error(&Error::from(e), &[("url", attachment.url.as_str())]);
        }
    }
}

async fn acknowledge_attachment(outbox: &Outbox<'_>, attachment: &Attachment) -> Result<(), Error> {
    tracing::info!(
        event = "attachment_received",
        filename = %attachment.filename,
        mime_type = %attachment.mime_type,
        size = attachment.data.len(),
        "Attachment received"
    );
    outbox
        .text(format!("📎 File received: {}", attachment.filename))
        .await?;

    if attachment.mime_type.starts_with("image/") {
        outbox
            .text(format!(
                "🖼️ Image size: {}\n{}",
                format_size(attachment.data.len()),
                replies::FILE_PROCESSED
            ))
            .await?;
    } else if attachment.mime_type.starts_with("text/") {
        outbox.text(text_preview(&attachment.data)).await?;
    } else {
        outbox.text(replies::FILE_UNSUPPORTED).await?;
    }
    Ok(())
}
