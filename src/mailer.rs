use anyhow::{bail, Context, Result};
use log::error;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use std::fmt::Display;

use crate::config::Config;

pub const INVOICE_SUBJECT: &str = "Factura generada";
pub const INVOICE_BODY: &str = "Adjuntamos su factura generada. Gracias por su compra.";
pub const REPORT_SUBJECT: &str = "📋 Reporte Diario de Envíos";

/// Something that can deliver a fully built message.
pub trait Mailer {
    /// Delivers `message` to the recipients in its envelope.
    ///
    /// # Errors
    ///
    /// Returns any error reported by the underlying transport.
    fn send(&self, message: &Message) -> Result<()>;
}

/// Delivers mail through an SMTP relay using STARTTLS and login credentials.
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    /// Builds a transport for `config.smtp_server:config.smtp_port`.
    ///
    /// No connection is made until the first message is sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are missing or the relay cannot be
    /// configured for STARTTLS.
    pub fn new(config: &Config) -> Result<Self> {
        let (user, pass) = config.credentials()?;
        let transport = SmtpTransport::starttls_relay(&config.smtp_server)
            .with_context(|| format!("configuring SMTP relay {}", config.smtp_server))?
            .port(config.smtp_port)
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .build();
        Ok(Self { transport })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, message: &Message) -> Result<()> {
        self.transport.send(message)?;
        Ok(())
    }
}

/// Stands in for a mailer that could not be set up; every send fails with
/// the setup error.
pub struct UnavailableMailer {
    reason: String,
}

impl UnavailableMailer {
    #[must_use]
    pub fn new(reason: impl Display) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl Mailer for UnavailableMailer {
    fn send(&self, _message: &Message) -> Result<()> {
        bail!("mailer unavailable: {}", self.reason)
    }
}

/// Returns an [`SmtpMailer`] for `config`, or an [`UnavailableMailer`] if
/// one cannot be built, so a run without credentials still logs each invoice
/// as failed.
#[must_use]
pub fn smtp_or_unavailable(config: &Config) -> Box<dyn Mailer> {
    match SmtpMailer::new(config) {
        Ok(mailer) => Box::new(mailer),
        Err(e) => {
            error!("cannot set up SMTP, nothing will be delivered: {e:#}");
            Box::new(UnavailableMailer::new(format!("{e:#}")))
        }
    }
}

/// Builds the customer email carrying invoice `pdf_name` as an attachment.
///
/// # Errors
///
/// Returns an error if either address cannot be parsed or the message cannot
/// be assembled.
pub fn invoice_message(from: &str, to: &str, pdf_name: &str, pdf: Vec<u8>) -> Result<Message> {
    let attachment = Attachment::new(pdf_name.to_string())
        .body(pdf, ContentType::parse("application/octet-stream")?);
    let message = Message::builder()
        .from(from.parse::<Mailbox>().with_context(|| format!("bad sender address {from:?}"))?)
        .to(to.parse::<Mailbox>().with_context(|| format!("bad recipient address {to:?}"))?)
        .subject(INVOICE_SUBJECT)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(INVOICE_BODY.to_string()))
                .singlepart(attachment),
        )?;
    Ok(message)
}

/// Builds the plain-text daily report email.
///
/// # Errors
///
/// Returns an error if either address cannot be parsed or the message cannot
/// be assembled.
pub fn report_message(from: &str, to: &str, text: &str) -> Result<Message> {
    let message = Message::builder()
        .from(from.parse::<Mailbox>().with_context(|| format!("bad sender address {from:?}"))?)
        .to(to.parse::<Mailbox>().with_context(|| format!("bad recipient address {to:?}"))?)
        .subject(REPORT_SUBJECT)
        .singlepart(SinglePart::plain(text.to_string()))?;
    Ok(message)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    use std::cell::RefCell;

    /// Records every message it is asked to send, optionally failing instead.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: RefCell<Vec<Message>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn recipients(&self) -> Vec<String> {
            self.sent
                .borrow()
                .iter()
                .flat_map(|m| m.envelope().to().iter().map(ToString::to_string))
                .collect()
        }
    }

    impl Mailer for RecordingMailer {
        fn send(&self, message: &Message) -> Result<()> {
            if self.fail {
                bail!("connection refused");
            }
            self.sent.borrow_mut().push(message.clone());
            Ok(())
        }
    }
}
