//! License Manager Core Library
//!
//! Domain types for single-use license tokens:
//! - Tokens are minted for a validated owner and expire on a calendar policy
//! - Redemption binds a token to exactly one device
//! - Share links let operators hand a fresh token to its owner

pub mod error;
pub mod expiry;
pub mod owner;
pub mod share;
pub mod token;

pub use error::Error;
pub use expiry::{
    calendar_rollover, fixed_duration, latest_expiry, ExpiryPolicy, RenewalAnchor, DEFAULT_EXPIRY_POLICY,
    DEFAULT_RENEWAL_ANCHOR,
};
pub use owner::OwnerInfo;
pub use share::{share_links, token_message, ShareLink};
pub use token::{RedemptionContext, RedemptionOutcome, TokenId, TokenRecord};

/// Result type for license-core operations
pub type Result<T> = std::result::Result<T, Error>;
