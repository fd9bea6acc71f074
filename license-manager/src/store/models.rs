//! Query and update types for token storage

use chrono::{DateTime, Utc};
use license_core::{RedemptionContext, TokenRecord};

/// Which tokens a query selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenFilter {
    All,
    /// Redeemed tokens with `from <= expires_at <= to`
    RedeemedExpiringBetween {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    /// Tokens with `expires_at < cutoff`
    ExpiredBefore(DateTime<Utc>),
}

impl TokenFilter {
    pub fn matches(&self, record: &TokenRecord) -> bool {
        match self {
            TokenFilter::All => true,
            TokenFilter::RedeemedExpiringBetween { from, to } => {
                record.redeemed && record.expires_at >= *from && record.expires_at <= *to
            }
            TokenFilter::ExpiredBefore(cutoff) => record.expires_at < *cutoff,
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenOrder {
    /// `created_at` descending
    #[default]
    NewestFirst,
    /// `expires_at` ascending
    SoonestExpiry,
}

/// A filtered, ordered, paginated selection of tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenQuery {
    pub filter: TokenFilter,
    pub order: TokenOrder,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl TokenQuery {
    pub fn new(filter: TokenFilter) -> Self {
        Self {
            filter,
            order: TokenOrder::default(),
            offset: 0,
            limit: None,
        }
    }

    pub fn order(mut self, order: TokenOrder) -> Self {
        self.order = order;
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// Fields written by a successful redemption
#[derive(Debug, Clone)]
pub struct Redemption {
    pub device_id: String,
    pub context: RedemptionContext,
    pub redeemed_at: DateTime<Utc>,
    /// Candidate expiry; stores keep the later of this and the current one
    pub expires_at: DateTime<Utc>,
}

/// What the store observed during a conditional redemption
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemAttempt {
    /// The token was consumed; carries the updated record
    Redeemed(TokenRecord),
    /// The token exists but was already redeemed or expired; carries the
    /// record as seen in the same atomic step
    Rejected(TokenRecord),
    Missing,
}
