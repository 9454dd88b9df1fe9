//! alk-notify
//!
//! Operator alert delivery over the configured mail relay.
//!
//! Address syntax is validated once at construction (startup), so a typo in
//! config is a fatal startup error rather than a per-alert delivery
//! failure. Relays are in-perimeter; the transport is plain SMTP against
//! the configured host and port.

use anyhow::{bail, Context, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use alk_events::HostRecord;
use alk_reconcile::{ActionError, AlertNotifier};

/// SMTP-relay notifier implementing the reconciler's alert boundary.
pub struct MailAlertNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl std::fmt::Debug for MailAlertNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailAlertNotifier")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl MailAlertNotifier {
    pub fn new(relay_host: &str, relay_port: u16, from: &str, to: &[String]) -> Result<Self> {
        if to.is_empty() {
            bail!("CONFIG_NO_RECIPIENTS alert recipient list is empty");
        }

        let from = from
            .parse::<Mailbox>()
            .with_context(|| format!("CONFIG_BAD_ADDRESS invalid from address '{from}'"))?;

        let to = to
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .with_context(|| format!("CONFIG_BAD_ADDRESS invalid recipient '{addr}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        let transport =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(relay_host)
                .port(relay_port)
                .build();

        Ok(Self { transport, from, to })
    }
}

#[async_trait::async_trait]
impl AlertNotifier for MailAlertNotifier {
    async fn notify(&self, subject: &str, host: &HostRecord) -> Result<(), ActionError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        let message = builder
            .body(render_alert_html(subject, host))
            .map_err(|e| ActionError::Transport(format!("build alert message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ActionError::Transport(format!("smtp relay: {e}")))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Body rendering
// ---------------------------------------------------------------------------

/// Render the alert body: hostname heading, the alert line, then every
/// host-record field the platform sent, verbatim but escaped.
pub fn render_alert_html(subject: &str, host: &HostRecord) -> String {
    let mut body = String::new();
    body.push_str(&format!("<h1>Alert for {}</h1>", escape_html(&host.hostname)));
    body.push_str(&format!("<h2>{}</h2>", escape_html(subject)));
    body.push_str("<b>Computer Info:</b><ul>");
    body.push_str(&format!(
        "<li><b>hostname:</b> {}</li>",
        escape_html(&host.hostname)
    ));
    for (key, value) in &host.details {
        let rendered = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        body.push_str(&format!(
            "<li><b>{}:</b> {}</li>",
            escape_html(key),
            escape_html(&rendered)
        ));
    }
    body.push_str("</ul>");
    body
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
