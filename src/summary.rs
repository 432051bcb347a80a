use anyhow::{bail, Context, Result};
use log::{debug, warn};
use serde::Deserialize;

use std::{
    fmt::Display,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{config::Config, money::Colones, send_log};

const PAID: &str = "exitoso";
const UNPAID: &str = "fallido";
const FULL_PAYMENT: &str = "completo";

/// Holds the daily delivery and sales figures.
///
/// To create an empty `DailySummary`, use [`DailySummary::new`].
///
/// To add sales data, use [`DailySummary::read_csv`] or
/// [`DailySummary::read_purchases`]. [`DailySummary::collect`] does both that
/// and the send-log count in one step.
///
/// To get the printable block appended to the daily log, use its [`Display`]
/// implementation.
#[derive(Debug, Default, Eq, PartialEq)]
pub struct DailySummary {
    pub emails_processed: usize,
    pub successful_orders: u32,
    pub failed_orders: u32,
    pub total_sold: Colones,
    pub full_payment_orders: u32,
}

impl DailySummary {
    /// Creates a new, empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the summary for `config`: rows in the send log plus every
    /// purchase file in the purchases directory.
    ///
    /// # Errors
    ///
    /// Returns any errors from reading the send log or a purchase file.
    pub fn collect(config: &Config) -> Result<Self> {
        let mut summary = Self::new();
        summary.emails_processed = send_log::count_records(&config.paths.send_log)?;
        summary.read_purchases(&config.paths.purchases)?;
        Ok(summary)
    }

    /// Reads purchase records from the CSV file at `path`, and updates the
    /// summary.
    ///
    /// Paid orders add their `monto_total` to the total sold, and count as full
    /// payments when `modalidad_pago` is `completo`. Unpaid orders are only
    /// counted. Rows with any other `estado_pago` are ignored.
    ///
    /// # Errors
    ///
    /// Returns any errors from opening or parsing the CSV file, including a
    /// malformed `monto_total` on a paid order.
    pub fn read_csv(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut rdr = csv::Reader::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        for result in rdr.deserialize() {
            let record: PurchaseRecord =
                result.with_context(|| format!("{}", path.display()))?;
            match record.payment_status.as_str() {
                PAID => {
                    let amount: Colones = record.total.parse().with_context(|| {
                        format!("{}: bad monto_total {:?}", path.display(), record.total)
                    })?;
                    let Some(total) = self.total_sold.checked_add(amount) else {
                        bail!("{}: total sold out of range after {amount}", path.display());
                    };
                    self.total_sold = total;
                    self.successful_orders += 1;
                    if record.payment_mode.trim().to_lowercase() == FULL_PAYMENT {
                        self.full_payment_orders += 1;
                    }
                }
                UNPAID => self.failed_orders += 1,
                other => debug!("ignoring purchase with estado_pago {other:?}"),
            }
        }
        Ok(())
    }

    /// Reads every `compras_*.csv` file in `dir`, in file name order.
    ///
    /// A missing directory simply contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns any errors from listing the directory or reading a file.
    pub fn read_purchases(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        for path in purchase_files(dir)? {
            self.read_csv(&path)?;
        }
        Ok(())
    }

    /// Appends the printable summary to the daily log at `path`, creating the
    /// file and its parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns any errors from creating or writing the file.
    pub fn append_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        write!(file, "{self}")?;
        Ok(())
    }
}

impl Display for DailySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total de correos procesados: {}", self.emails_processed)?;
        writeln!(f, "Pedidos exitosos: {}", self.successful_orders)?;
        writeln!(f, "Pedidos fallidos: {}", self.failed_orders)?;
        writeln!(f, "Total vendido: {}", self.total_sold)?;
        writeln!(f, "Pedidos con pago completo: {}", self.full_payment_orders)?;
        writeln!(f, "{:-<45}", "")?;
        Ok(())
    }
}

/// Lists the purchase files (`compras_*.csv`) in `dir`, sorted by name.
///
/// # Errors
///
/// Returns any errors from reading an existing directory.
pub fn purchase_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        warn!("purchases directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let is_purchase_file = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("compras_") && name.ends_with(".csv"));
        if is_purchase_file && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Defines the columns of a purchase record the summary needs.
///
/// Any other columns in the file are ignored.
#[derive(Debug, Deserialize)]
pub struct PurchaseRecord {
    #[serde(rename = "estado_pago")]
    pub payment_status: String,
    #[serde(rename = "modalidad_pago")]
    pub payment_mode: String,
    /// Kept as text: only paid orders need a parseable amount.
    #[serde(rename = "monto_total")]
    pub total: String,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn read_csv_fn_tallies_paid_and_unpaid_orders() {
        let mut summary = DailySummary::new();
        summary.read_csv("testdata/compras/compras_20250101_090000.csv").unwrap();
        assert_eq!(summary.successful_orders, 3, "wrong paid orders");
        assert_eq!(summary.failed_orders, 1, "wrong unpaid orders");
        assert_eq!(summary.full_payment_orders, 2, "wrong full payments");
        assert_eq!(summary.total_sold, Colones::from_str("40500").unwrap());
    }

    #[test]
    fn read_csv_fn_returns_error_for_bad_amount_on_paid_order() {
        let mut summary = DailySummary::new();
        assert!(summary.read_csv("testdata/compras_bad_amount.csv").is_err());
    }

    #[test]
    fn read_csv_fn_returns_error_for_huge_amount_on_paid_order() {
        let mut summary = DailySummary::new();
        let err = summary.read_csv("testdata/compras_huge_amount.csv").unwrap_err();
        assert!(format!("{err:#}").contains("out of range"), "{err:#}");
    }

    #[test]
    fn read_csv_fn_returns_error_when_total_overflows() {
        let mut summary = DailySummary::new();
        let err = summary.read_csv("testdata/compras_overflowing_total.csv").unwrap_err();
        assert!(err.to_string().contains("total sold out of range"), "{err:#}");
    }

    #[test]
    fn read_purchases_fn_reads_only_purchase_files() {
        let mut summary = DailySummary::new();
        summary.read_purchases("testdata/compras").unwrap();
        assert_eq!(summary.successful_orders, 4);
        assert_eq!(summary.failed_orders, 3);
        assert_eq!(summary.full_payment_orders, 2);
        assert_eq!(summary.total_sold, Colones::from_str("52500.50").unwrap());
    }

    #[test]
    fn read_purchases_fn_treats_missing_dir_as_empty() {
        let mut summary = DailySummary::new();
        summary.read_purchases("testdata/no_such_dir").unwrap();
        assert_eq!(summary, DailySummary::new());
    }

    #[test]
    fn display_fn_renders_daily_log_block() {
        let summary = DailySummary {
            emails_processed: 4,
            successful_orders: 3,
            failed_orders: 1,
            total_sold: Colones::from_str("40500").unwrap(),
            full_payment_orders: 2,
        };
        assert_eq!(
            summary.to_string(),
            "Total de correos procesados: 4\n\
             Pedidos exitosos: 3\n\
             Pedidos fallidos: 1\n\
             Total vendido: ₡40500.00\n\
             Pedidos con pago completo: 2\n\
             ---------------------------------------------\n"
        );
    }

    #[test]
    fn collect_fn_combines_send_log_and_purchases() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path());
        fs::create_dir_all(config.paths.send_log.parent().unwrap()).unwrap();
        fs::copy("testdata/log_envios.csv", &config.paths.send_log).unwrap();
        fs::create_dir_all(&config.paths.purchases).unwrap();
        fs::copy(
            "testdata/compras/compras_20250101_090000.csv",
            config.paths.purchases.join("compras_20250101_090000.csv"),
        )
        .unwrap();

        let summary = DailySummary::collect(&config).unwrap();

        assert_eq!(summary.emails_processed, 4);
        assert_eq!(summary.successful_orders, 3);
    }

    #[test]
    fn append_to_fn_accumulates_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("log_diario.log");
        let summary = DailySummary::new();

        summary.append_to(&path).unwrap();
        summary.append_to(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!("{summary}{summary}"));
        assert_eq!(text.matches("Total vendido: ₡0.00").count(), 2);
    }
}
