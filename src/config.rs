use anyhow::{Context, Result};

use std::{
    env,
    path::{Path, PathBuf},
};

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// File locations used by the mailer, all relative to one data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Directory holding the invoice PDFs.
    pub invoices: PathBuf,
    /// Pending queue: `pdf,email` rows, no header.
    pub pending: PathBuf,
    /// Send log: `pdf,email,status` rows, no header.
    pub send_log: PathBuf,
    /// Plain-text file the daily summaries are appended to.
    pub daily_log: PathBuf,
    /// Directory holding the `compras_*.csv` purchase records.
    pub purchases: PathBuf,
}

impl Paths {
    #[must_use]
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let data = base_dir.as_ref().join("data");
        let invoices = data.join("facturas_pdf");
        Self {
            pending: invoices.join("pendientes_envio.csv"),
            send_log: invoices.join("log_envios").join("log_envios.csv"),
            daily_log: data.join("logs").join("log_diario.log"),
            purchases: data.join("compras"),
            invoices,
        }
    }
}

/// Runtime configuration: SMTP settings plus the data layout.
#[derive(Debug, Clone)]
pub struct Config {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub admin_email: Option<String>,
    pub paths: Paths,
}

impl Config {
    /// Builds a configuration with default SMTP settings and no credentials.
    #[must_use]
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            smtp_server: DEFAULT_SMTP_SERVER.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_pass: None,
            admin_email: None,
            paths: Paths::new(base_dir),
        }
    }

    /// Reads SMTP settings from the environment, after loading `.env` if present.
    ///
    /// Recognised variables are `SMTP_SERVER`, `SMTP_PORT`, `SMTP_USER`,
    /// `SMTP_PASS` and `ADMIN_EMAIL`. Credentials are optional here; they are
    /// only checked when something is actually sent.
    ///
    /// # Errors
    ///
    /// Returns an error if `SMTP_PORT` is set but is not a valid port number.
    pub fn from_env(base_dir: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(base_dir, |key| env::var(key).ok())
    }

    /// Like [`Config::from_env`], but looks variables up with `var` instead of
    /// reading the process environment. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if `SMTP_PORT` is set but is not a valid port number.
    pub fn from_vars<F>(base_dir: impl AsRef<Path>, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(base_dir);
        if let Some(server) = lookup("SMTP_SERVER") {
            config.smtp_server = server;
        }
        if let Some(port) = lookup("SMTP_PORT") {
            config.smtp_port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid SMTP_PORT: {port:?}"))?;
        }
        config.smtp_user = lookup("SMTP_USER");
        config.smtp_pass = lookup("SMTP_PASS");
        config.admin_email = lookup("ADMIN_EMAIL");
        Ok(config)
    }

    /// Returns the SMTP user name and password.
    ///
    /// # Errors
    ///
    /// Returns an error naming whichever of `SMTP_USER` or `SMTP_PASS` is unset.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let user = self.smtp_user.as_deref().context("SMTP_USER is not set")?;
        let pass = self.smtp_pass.as_deref().context("SMTP_PASS is not set")?;
        Ok((user, pass))
    }

    /// Address the daily report goes to: `ADMIN_EMAIL`, falling back to the sender.
    #[must_use]
    pub fn admin_address(&self) -> Option<&str> {
        self.admin_email.as_deref().or(self.smtp_user.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_new_fn_derives_data_layout_from_base_dir() {
        let paths = Paths::new("/srv/billing");
        assert_eq!(paths.invoices, Path::new("/srv/billing/data/facturas_pdf"));
        assert_eq!(
            paths.pending,
            Path::new("/srv/billing/data/facturas_pdf/pendientes_envio.csv")
        );
        assert_eq!(
            paths.send_log,
            Path::new("/srv/billing/data/facturas_pdf/log_envios/log_envios.csv")
        );
        assert_eq!(
            paths.daily_log,
            Path::new("/srv/billing/data/logs/log_diario.log")
        );
        assert_eq!(paths.purchases, Path::new("/srv/billing/data/compras"));
    }

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn from_vars_fn_uses_defaults_when_nothing_is_set() {
        let config = Config::from_vars("/srv/billing", vars(&[])).unwrap();
        assert_eq!(config.smtp_server, DEFAULT_SMTP_SERVER);
        assert_eq!(config.smtp_port, DEFAULT_SMTP_PORT);
        assert_eq!(config.smtp_user, None);
        assert_eq!(config.paths, Paths::new("/srv/billing"));
    }

    #[test]
    fn from_vars_fn_applies_overrides() {
        let config = Config::from_vars(
            ".",
            vars(&[
                ("SMTP_SERVER", "mail.example.com"),
                ("SMTP_PORT", "2525"),
                ("SMTP_USER", "billing@example.com"),
                ("SMTP_PASS", "app-password"),
                ("ADMIN_EMAIL", "boss@example.com"),
            ]),
        )
        .unwrap();
        assert_eq!(config.smtp_server, "mail.example.com");
        assert_eq!(config.smtp_port, 2525);
        assert_eq!(config.smtp_user.as_deref(), Some("billing@example.com"));
        assert_eq!(config.smtp_pass.as_deref(), Some("app-password"));
        assert_eq!(config.admin_email.as_deref(), Some("boss@example.com"));
    }

    #[test]
    fn from_vars_fn_returns_error_for_bad_port() {
        let err = Config::from_vars(".", vars(&[("SMTP_PORT", "abc")])).unwrap_err();
        assert!(err.to_string().contains("SMTP_PORT"), "{err}");
        assert!(Config::from_vars(".", vars(&[("SMTP_PORT", "70000")])).is_err());
    }

    #[test]
    fn from_vars_fn_treats_blank_values_as_unset() {
        let config = Config::from_vars(
            ".",
            vars(&[("SMTP_USER", "  "), ("SMTP_SERVER", ""), ("SMTP_PORT", " ")]),
        )
        .unwrap();
        assert_eq!(config.smtp_user, None);
        assert_eq!(config.smtp_server, DEFAULT_SMTP_SERVER);
        assert_eq!(config.smtp_port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn credentials_fn_reports_missing_variable() {
        let mut config = Config::new(".");
        let err = config.credentials().unwrap_err();
        assert!(err.to_string().contains("SMTP_USER"));
        config.smtp_user = Some("billing@example.com".into());
        let err = config.credentials().unwrap_err();
        assert!(err.to_string().contains("SMTP_PASS"));
        config.smtp_pass = Some("app-password".into());
        assert_eq!(
            config.credentials().unwrap(),
            ("billing@example.com", "app-password")
        );
    }

    #[test]
    fn admin_address_fn_falls_back_to_smtp_user() {
        let mut config = Config::new(".");
        assert_eq!(config.admin_address(), None);
        config.smtp_user = Some("billing@example.com".into());
        assert_eq!(config.admin_address(), Some("billing@example.com"));
        config.admin_email = Some("boss@example.com".into());
        assert_eq!(config.admin_address(), Some("boss@example.com"));
    }
}
