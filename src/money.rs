use anyhow::{bail, Context};
use serde_with::DeserializeFromStr;

use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

/// Represents an amount of money in Costa Rican colones.
///
/// The amount is stored internally as an integer number of céntimos, but the
/// [`Display`] implementation formats it as colones to 2 decimal places.
#[derive(Clone, Copy, Default, DeserializeFromStr, Eq, PartialEq, Ord, PartialOrd)]
pub struct Colones(i64);

impl Colones {
    /// Adds `rhs`, or returns `None` if the sum does not fit.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

impl Debug for Colones {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Colones {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}₡{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Colones {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let cleaned = s.trim().replace(',', "");
        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            bail!("empty amount: {s:?}");
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            bail!("bad fractional part in amount: {s:?}");
        }
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().with_context(|| format!("bad amount: {s:?}"))?
        };
        let frac: i64 = format!("{frac:0<2}").parse()?;
        let Some(centimos) = whole.checked_mul(100).and_then(|c| c.checked_add(frac)) else {
            bail!("amount out of range: {s:?}");
        };
        Ok(Self(if negative { -centimos } else { centimos }))
    }
}
