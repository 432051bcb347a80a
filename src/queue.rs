use anyhow::{Context, Result};
use log::{debug, info};

use std::path::Path;

use crate::send_log;

/// One invoice waiting to be emailed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingInvoice {
    /// File name of the PDF, relative to the invoices directory.
    pub pdf: String,
    /// Recipient address.
    pub email: String,
}

fn queue_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))
}

/// Reads the pending queue at `path`.
///
/// The file has no header; each row is `pdf,email`. Rows with fewer than two
/// fields are skipped, extra fields are ignored, and both values are trimmed.
///
/// # Errors
///
/// Returns any errors from opening or parsing the CSV file.
pub fn read_pending(path: impl AsRef<Path>) -> Result<Vec<PendingInvoice>> {
    let path = path.as_ref();
    let mut pending = Vec::new();
    for result in queue_reader(path)?.records() {
        let record = result.with_context(|| format!("{}", path.display()))?;
        if record.len() < 2 {
            debug!("skipping short queue row: {record:?}");
            continue;
        }
        pending.push(PendingInvoice {
            pdf: record[0].trim().to_string(),
            email: record[1].trim().to_string(),
        });
    }
    Ok(pending)
}

/// Removes from the pending queue every invoice the send log marks as sent.
///
/// The send log is the source of truth: a queue row is dropped when its PDF
/// name appears in a three-field log row with status `exitoso`. Every other
/// row, including ones whose fields are all empty, is written back unchanged
/// in its original order. Blank lines are not rows and are dropped.
///
/// Returns the number of rows removed.
///
/// # Errors
///
/// Returns any errors from reading the log or the queue, or from rewriting
/// the queue.
pub fn prune_pending(pending_path: impl AsRef<Path>, log_path: impl AsRef<Path>) -> Result<usize> {
    let pending_path = pending_path.as_ref();
    let sent = send_log::sent_invoices(log_path)?;

    let mut kept = Vec::new();
    let mut removed = 0;
    for result in queue_reader(pending_path)?.records() {
        let record = result.with_context(|| format!("{}", pending_path.display()))?;
        if sent.contains(record[0].trim()) {
            removed += 1;
        } else {
            kept.push(record);
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(pending_path)
        .with_context(|| format!("rewriting {}", pending_path.display()))?;
    for record in &kept {
        writer.write_record(record)?;
    }
    writer.flush()?;

    info!(
        "removed {removed} sent invoice(s) from {}, {} still pending",
        pending_path.display(),
        kept.len()
    );
    Ok(removed)
}
