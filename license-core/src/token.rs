//! License token records and redemption outcomes

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::owner::OwnerInfo;
use crate::Result;

/// Random bytes in a token id (128 bits)
pub const TOKEN_ID_BYTES: usize = 16;

/// Device info recorded when the client does not send any
pub const UNKNOWN_DEVICE_INFO: &str = "Not provided";

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Opaque token identifier: 32 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl TokenId {
    /// Parse user-supplied text into a token id, normalizing case.
    pub fn parse(input: &str) -> Result<Self> {
        let id = input.trim();
        if id.len() != TOKEN_ID_BYTES * 2 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidTokenId);
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audit data captured at redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionContext {
    pub source_ip: Option<String>,
    pub device_info: String,
    pub timestamp: DateTime<Utc>,
}

/// A license token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub id: TokenId,
    pub owner_email: String,
    pub owner_name: String,
    pub owner_phone: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub redeemed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound_device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_context: Option<RedemptionContext>,
}

impl TokenRecord {
    /// A fresh, unredeemed token
    pub fn new(
        id: TokenId,
        owner: &OwnerInfo,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_email: owner.email().to_string(),
            owner_name: owner.name().to_string(),
            owner_phone: owner.phone().to_string(),
            created_at,
            expires_at,
            redeemed: false,
            redeemed_at: None,
            bound_device_id: None,
            redemption_context: None,
        }
    }

    /// Valid up to and including the expiry instant
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }

    /// Whole days left, rounded up; 0 once expired
    pub fn remaining_days(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.expires_at - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.remaining_days(now) > 0
    }
}

/// Result of a redemption attempt.
///
/// Rejections are ordinary outcomes, not errors. Variants are listed in the
/// order they take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionOutcome {
    NotFound,
    AlreadyRedeemed { redeemed_at: Option<DateTime<Utc>> },
    Expired { expired_at: DateTime<Utc> },
    Redeemed { expires_at: DateTime<Utc> },
}

impl RedemptionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RedemptionOutcome::Redeemed { .. })
    }

    /// Message safe to show to the redeeming client
    pub fn message(&self) -> &'static str {
        match self {
            RedemptionOutcome::NotFound => "Token not found",
            RedemptionOutcome::AlreadyRedeemed { .. } => "Token has already been redeemed",
            RedemptionOutcome::Expired { .. } => "Token expired",
            RedemptionOutcome::Redeemed { .. } => "Token validated and activated",
        }
    }
}
