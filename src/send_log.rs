use anyhow::{Context, Result};
use log::warn;

use std::{
    collections::HashSet,
    fmt::Display,
    fs::{self, File, OpenOptions},
    path::Path,
};

/// Outcome of one delivery attempt, as written in the send log.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SendStatus {
    Sent,
    Failed,
}

impl SendStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SendStatus::Sent => "exitoso",
            SendStatus::Failed => "fallido",
        }
    }
}

impl Display for SendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only writer for the send log.
///
/// Each row is `pdf,email,status`, without a header. Rows are flushed as soon
/// as they are recorded, so a crash mid-batch keeps everything logged so far.
pub struct SendLog {
    writer: csv::Writer<File>,
}

impl SendLog {
    /// Opens the send log at `path` for appending, creating it (and its parent
    /// directories) if needed.
    ///
    /// # Errors
    ///
    /// Returns any errors from creating the directory or opening the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        Ok(Self { writer })
    }

    /// Appends the outcome for one invoice.
    ///
    /// # Errors
    ///
    /// Returns any errors from writing or flushing the row.
    pub fn record(&mut self, pdf: &str, email: &str, status: SendStatus) -> Result<()> {
        self.writer.write_record([pdf, email, status.as_str()])?;
        self.writer.flush()?;
        Ok(())
    }
}

fn log_reader(path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))
}

/// Counts the well-formed rows (exactly three fields) in the send log.
///
/// A missing log has no rows, so it counts as zero.
///
/// # Errors
///
/// Returns any errors from reading an existing log.
pub fn count_records(path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("send log {} does not exist yet", path.display());
        return Ok(0);
    }
    let mut count = 0;
    for result in log_reader(path)?.records() {
        let record = result.with_context(|| format!("{}", path.display()))?;
        if record.len() == 3 {
            count += 1;
        }
    }
    Ok(count)
}

/// Returns the PDF names the send log records as successfully delivered.
///
/// Only rows with exactly three fields and an `exitoso` status count.
///
/// # Errors
///
/// Returns any errors from opening or reading the log.
pub fn sent_invoices(path: impl AsRef<Path>) -> Result<HashSet<String>> {
    let path = path.as_ref();
    let mut sent = HashSet::new();
    for result in log_reader(path)?.records() {
        let record = result.with_context(|| format!("{}", path.display()))?;
        if record.len() == 3 && &record[2] == SendStatus::Sent.as_str() {
            sent.insert(record[0].trim().to_string());
        }
    }
    Ok(sent)
}
