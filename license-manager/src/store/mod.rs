//! Storage abstractions for license tokens

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::InMemoryTokenStore;
pub use models::*;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use license_core::{TokenId, TokenRecord};

use crate::error::LicenseError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, LicenseError>;

/// Trait for durable token storage
pub trait TokenStore: Send + Sync {
    /// Insert a new token. Fails with `DuplicateId` if the id is taken.
    fn insert(&self, record: &TokenRecord) -> StoreResult<()>;

    /// Get a token by id
    fn get(&self, id: &TokenId) -> StoreResult<Option<TokenRecord>>;

    /// Atomically consume a token.
    ///
    /// Succeeds only if the stored token is unredeemed and
    /// `expires_at >= redemption.redeemed_at`; the check and every field
    /// written by the redemption happen as one indivisible step.
    fn redeem_if_available(&self, id: &TokenId, redemption: &Redemption)
        -> StoreResult<RedeemAttempt>;

    /// Set `expires_at` to the later of its current value and `expires_at`.
    ///
    /// Returns the updated token, or `None` if it does not exist.
    fn extend_expiry(
        &self,
        id: &TokenId,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<TokenRecord>>;

    /// List tokens matching a query
    fn query(&self, query: &TokenQuery) -> StoreResult<Vec<TokenRecord>>;

    /// Count tokens matching a filter
    fn count(&self, filter: &TokenFilter) -> StoreResult<u64>;
}

/// Allow sharing one store between several owners
impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn insert(&self, record: &TokenRecord) -> StoreResult<()> {
        (**self).insert(record)
    }

    fn get(&self, id: &TokenId) -> StoreResult<Option<TokenRecord>> {
        (**self).get(id)
    }

    fn redeem_if_available(
        &self,
        id: &TokenId,
        redemption: &Redemption,
    ) -> StoreResult<RedeemAttempt> {
        (**self).redeem_if_available(id, redemption)
    }

    fn extend_expiry(
        &self,
        id: &TokenId,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<TokenRecord>> {
        (**self).extend_expiry(id, expires_at)
    }

    fn query(&self, query: &TokenQuery) -> StoreResult<Vec<TokenRecord>> {
        (**self).query(query)
    }

    fn count(&self, filter: &TokenFilter) -> StoreResult<u64> {
        (**self).count(filter)
    }
}
