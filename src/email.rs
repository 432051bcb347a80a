use regex::Regex;

use std::sync::OnceLock;

const EMAIL_PATTERN: &str = r"^[\w\.-]+@[\w\.-]+\.\w+$";

/// Reports whether `addr` looks like a deliverable email address.
///
/// This is a cheap shape check (`local@domain.tld`), not RFC 5322 parsing.
///
/// # Examples
///
/// ```
/// # use invoice_mailer::email::is_valid_email;
/// assert!(is_valid_email("ana.mora@example.co.cr"));
/// assert!(!is_valid_email("ana.mora@localhost"));
/// ```
#[must_use]
pub fn is_valid_email(addr: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
        .is_match(addr)
}
