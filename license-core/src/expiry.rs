//! Expiration arithmetic
//!
//! Two rules compute an expiry from an anchor date:
//! - calendar rollover: the first day of the month `n` months after the
//!   anchor's month, at 00:00:00 UTC
//! - fixed duration: the anchor plus a whole number of days
//!
//! A deployment picks one rule via [`ExpiryPolicy`] and uses it for
//! creation, redemption and renewal alike.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Policy used when nothing else is configured
pub const DEFAULT_EXPIRY_POLICY: ExpiryPolicy = ExpiryPolicy::CalendarRollover;

/// Renewal anchor used when nothing else is configured
pub const DEFAULT_RENEWAL_ANCHOR: RenewalAnchor = RenewalAnchor::LaterOfNowAndExpiry;

/// 9999-12-01T00:00:00Z as a Unix timestamp
const LATEST_EXPIRY_SECS: i64 = 253_399_622_400;

/// Latest expiry any policy will produce.
///
/// Kept within four-digit years so stored timestamps stay fixed-width. It
/// is the first of a month at midnight, so calendar rollover saturates onto
/// a valid rollover date.
pub fn latest_expiry() -> DateTime<Utc> {
    DateTime::from_timestamp(LATEST_EXPIRY_SECS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// First day of the month `months` after `date`'s month, at midnight UTC.
///
/// Day-of-month and time-of-day of `date` are discarded. Saturates at
/// [`latest_expiry`] instead of overflowing.
pub fn calendar_rollover(date: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let index = i64::from(date.year()) * 12 + i64::from(date.month0()) + i64::from(months);
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;

    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, 1))
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .min(latest_expiry())
}

/// `date` plus `days` whole days, saturating at [`latest_expiry`].
pub fn fixed_duration(date: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    date.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .min(latest_expiry())
}

/// How a deployment computes expiration dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExpiryPolicy {
    /// Expire on the first day of a following month
    CalendarRollover,
    /// Expire a fixed number of days after the anchor
    FixedDuration { days: u32 },
}

impl ExpiryPolicy {
    /// Provisional expiry for a token that has never been redeemed.
    pub fn initial_expiry(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        self.extend(created_at, 1)
    }

    /// Expiry granted at the moment of redemption: one cycle ahead.
    pub fn redemption_expiry(&self, redeemed_at: DateTime<Utc>) -> DateTime<Utc> {
        self.extend(redeemed_at, 1)
    }

    /// Advance `anchor` by `units` policy cycles (months or `days` blocks).
    pub fn extend(&self, anchor: DateTime<Utc>, units: u32) -> DateTime<Utc> {
        match self {
            ExpiryPolicy::CalendarRollover => calendar_rollover(anchor, units),
            ExpiryPolicy::FixedDuration { days } => {
                fixed_duration(anchor, days.saturating_mul(units))
            }
        }
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        DEFAULT_EXPIRY_POLICY
    }
}

impl fmt::Display for ExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryPolicy::CalendarRollover => write!(f, "calendar"),
            ExpiryPolicy::FixedDuration { days } => write!(f, "fixed:{}", days),
        }
    }
}

/// Parses `calendar` or `fixed:<days>`
impl FromStr for ExpiryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("calendar") {
            return Ok(ExpiryPolicy::CalendarRollover);
        }

        let days = s
            .strip_prefix("fixed:")
            .and_then(|days| days.trim().parse::<u32>().ok())
            .filter(|days| *days > 0)
            .ok_or_else(|| Error::InvalidPolicy(s.to_string()))?;

        Ok(ExpiryPolicy::FixedDuration { days })
    }
}

impl TryFrom<String> for ExpiryPolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExpiryPolicy> for String {
    fn from(policy: ExpiryPolicy) -> Self {
        policy.to_string()
    }
}

/// Which instant a renewal is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RenewalAnchor {
    /// Always renew from the current time
    Now,
    /// Renew from the current expiry while it is still in the future
    LaterOfNowAndExpiry,
}

impl RenewalAnchor {
    pub fn anchor(&self, now: DateTime<Utc>, current_expiry: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            RenewalAnchor::Now => now,
            RenewalAnchor::LaterOfNowAndExpiry => now.max(current_expiry),
        }
    }
}

impl Default for RenewalAnchor {
    fn default() -> Self {
        DEFAULT_RENEWAL_ANCHOR
    }
}

impl fmt::Display for RenewalAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenewalAnchor::Now => write!(f, "now"),
            RenewalAnchor::LaterOfNowAndExpiry => write!(f, "later"),
        }
    }
}

impl FromStr for RenewalAnchor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "now" => Ok(RenewalAnchor::Now),
            "later" => Ok(RenewalAnchor::LaterOfNowAndExpiry),
            other => Err(Error::InvalidPolicy(other.to_string())),
        }
    }
}

impl TryFrom<String> for RenewalAnchor {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RenewalAnchor> for String {
    fn from(anchor: RenewalAnchor) -> Self {
        anchor.to_string()
    }
}
