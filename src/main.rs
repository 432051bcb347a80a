use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use rand::Rng;

use std::path::PathBuf;

use invoice_mailer::{
    dispatch, generator, mailer::smtp_or_unavailable, queue, summary::DailySummary, Config,
    Mailer,
};

/// Emails queued PDF invoices and summarises the day's sales.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory containing the `data/` tree
    #[arg(short, long, default_value = ".")]
    base_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send pending invoices, prune the sent ones, and append the daily summary
    Run {
        /// Also email the summary to the administrator
        #[arg(long)]
        email_report: bool,
    },
    /// Send every pending invoice and log the results
    Send,
    /// Remove invoices the send log marks as sent from the pending queue
    Prune,
    /// Append the daily summary to the daily log
    Summary {
        /// Also email the summary to the administrator
        #[arg(long)]
        email: bool,
    },
    /// Write a file of synthetic purchase records
    Generate {
        /// Number of purchases (random, 1 to 10, if not given)
        #[arg(short, long)]
        count: Option<usize>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);
    let config = Config::from_env(&args.base_dir)?;

    match args.command.unwrap_or(Command::Run { email_report: false }) {
        Command::Run { email_report } => {
            let mailer = smtp_or_unavailable(&config);
            dispatch::process_pending(mailer.as_ref(), &config)?;
            prune(&config);
            write_summary(&config, email_report.then_some(mailer.as_ref()))?;
        }
        Command::Send => {
            let mailer = smtp_or_unavailable(&config);
            dispatch::process_pending(mailer.as_ref(), &config)?;
        }
        Command::Prune => {
            queue::prune_pending(&config.paths.pending, &config.paths.send_log)?;
        }
        Command::Summary { email } => {
            let mailer = email.then(|| smtp_or_unavailable(&config));
            write_summary(&config, mailer.as_deref())?;
        }
        Command::Generate { count } => {
            let mut rng = rand::thread_rng();
            let count = count.unwrap_or_else(|| rng.gen_range(1..=10));
            let now = chrono::Local::now().naive_local();
            let path = generator::generate_batch(&config.paths.purchases, count, &mut rng, now)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn init_logging(debug: bool) {
    if debug {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
}

/// A failed prune leaves the queue untouched, so the run carries on.
fn prune(config: &Config) {
    if let Err(e) = queue::prune_pending(&config.paths.pending, &config.paths.send_log) {
        error!("could not prune pending queue: {e:#}");
    }
}

fn write_summary(config: &Config, mailer: Option<&dyn Mailer>) -> Result<()> {
    let summary = DailySummary::collect(config)?;
    summary.append_to(&config.paths.daily_log)?;
    info!("daily summary appended to {}", config.paths.daily_log.display());
    print!("{summary}");
    if let Some(mailer) = mailer {
        if let Err(e) = dispatch::send_admin_report(mailer, config, &summary.to_string()) {
            error!("could not send daily report: {e:#}");
        }
    }
    Ok(())
}
