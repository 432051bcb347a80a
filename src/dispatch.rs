use anyhow::{bail, Context, Result};
use log::{error, info};

use std::fs;

use crate::{
    config::Config,
    email::is_valid_email,
    mailer::{invoice_message, report_message, Mailer},
    queue::{read_pending, PendingInvoice},
    send_log::{SendLog, SendStatus},
};

/// Tally of one pass over the pending queue.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Outcome {
    pub sent: usize,
    pub failed: usize,
}

fn sender(config: &Config) -> Result<&str> {
    config.smtp_user.as_deref().context("SMTP_USER is not set")
}

/// Emails one invoice, with its PDF attached.
///
/// The PDF is looked up in the invoices directory. Nothing is sent if the file
/// is missing or the recipient address is malformed.
///
/// # Errors
///
/// Returns an error if the PDF is missing or unreadable, the address is
/// invalid, or the mailer fails to deliver the message.
pub fn send_invoice(mailer: &dyn Mailer, config: &Config, invoice: &PendingInvoice) -> Result<()> {
    let pdf_path = config.paths.invoices.join(&invoice.pdf);
    if !pdf_path.is_file() {
        bail!("file not found: {}", invoice.pdf);
    }
    if !is_valid_email(&invoice.email) {
        bail!("invalid email address: {}", invoice.email);
    }
    let pdf = fs::read(&pdf_path).with_context(|| format!("reading {}", pdf_path.display()))?;
    let message = invoice_message(sender(config)?, &invoice.email, &invoice.pdf, pdf)?;
    mailer
        .send(&message)
        .with_context(|| format!("sending to {}", invoice.email))?;
    Ok(())
}

/// Sends every invoice in the pending queue and records each result in the
/// send log.
///
/// A failed invoice is logged as `fallido` and does not stop the batch.
///
/// # Errors
///
/// Returns an error if the queue cannot be read or the send log cannot be
/// written.
pub fn process_pending(mailer: &dyn Mailer, config: &Config) -> Result<Outcome> {
    let pending = read_pending(&config.paths.pending)?;
    let mut log = SendLog::open(&config.paths.send_log)?;
    let mut outcome = Outcome::default();

    for invoice in &pending {
        let status = match send_invoice(mailer, config, invoice) {
            Ok(()) => {
                info!("invoice {} sent to {}", invoice.pdf, invoice.email);
                outcome.sent += 1;
                SendStatus::Sent
            }
            Err(e) => {
                error!("invoice {} not sent to {}: {e:#}", invoice.pdf, invoice.email);
                outcome.failed += 1;
                SendStatus::Failed
            }
        };
        log.record(&invoice.pdf, &invoice.email, status)?;
    }
    info!(
        "processed {} invoice(s): {} sent, {} failed",
        pending.len(),
        outcome.sent,
        outcome.failed
    );
    Ok(outcome)
}

/// Emails the daily summary `text` to the administrator.
///
/// # Errors
///
/// Returns an error if no admin address is configured, or the message cannot
/// be built or delivered.
pub fn send_admin_report(mailer: &dyn Mailer, config: &Config, text: &str) -> Result<()> {
    let to = config
        .admin_address()
        .context("no admin address: set ADMIN_EMAIL or SMTP_USER")?;
    let message = report_message(sender(config)?, to, text)?;
    mailer.send(&message)?;
    info!("daily report sent to {to}");
    Ok(())
}
