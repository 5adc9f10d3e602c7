use crate::agent::Agent;
use crate::agent::dispatcher::Outbox;
use crate::agent::replies;
use crate::error::{Error, LlmError, report_error};

impl Agent {
    /// Answer free text with the responder, or a canned line when none is
    /// configured. Responder failures and timeouts become an apology.
    pub(super) async fn converse(&self, outbox: &Outbox<'_>, text: &str) -> Result<(), Error> {
        let Some(responder) = &self.responder else {
            outbox.text(replies::pick(replies::FALLBACK_RESPONSES)).await?;
            return Ok(());
        };

        let context = outbox.message().conversation_kind.context_label();
        let timeout = self.config.responder_timeout;
        let result = tokio::time::timeout(timeout, responder.generate_response(text, context))
            .await
            .unwrap_or_else(|_| {
                Err(LlmError::Timeout {
                    provider: responder.name().to_string(),
                    timeout,
                })
            });

        match result {
            Ok(reply) => outbox.text(reply).await?,
            Err(e) => {
                report_error(
                    &Error::from(e),
                    &[
                        ("sender", outbox.message().sender_id.as_str()),
                        ("responder", responder.name()),
                    ],
                );
                outbox.text(replies::RESPONDER_APOLOGY).await?;
            }
        }
        Ok(())
    }
}
