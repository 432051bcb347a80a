#![doc = include_str!("../README.md")]
pub mod config;
pub mod dispatch;
pub mod email;
pub mod generator;
pub mod mailer;
pub mod money;
pub mod queue;
pub mod send_log;
pub mod summary;

pub use config::Config;
pub use dispatch::{process_pending, send_admin_report, send_invoice, Outcome};
pub use mailer::{Mailer, SmtpMailer};
pub use money::Colones;
pub use queue::{prune_pending, read_pending, PendingInvoice};
pub use summary::DailySummary;
