//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use license_core::{TokenId, TokenRecord};

use super::{
    RedeemAttempt, Redemption, StoreResult, TokenFilter, TokenOrder, TokenQuery, TokenStore,
};
use crate::error::LicenseError;

/// In-memory token store
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<TokenId, TokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Overwrite the expiry of a token (for testing purposes)
    pub fn set_expires_at(&self, id: &TokenId, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let mut tokens = self.tokens.write().unwrap();
        let record = tokens.get_mut(id).ok_or(LicenseError::NotFound)?;
        record.expires_at = expires_at;
        Ok(())
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn insert(&self, record: &TokenRecord) -> StoreResult<()> {
        let mut tokens = self.tokens.write().unwrap();
        if tokens.contains_key(&record.id) {
            return Err(LicenseError::DuplicateId);
        }
        tokens.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn get(&self, id: &TokenId) -> StoreResult<Option<TokenRecord>> {
        Ok(self.tokens.read().unwrap().get(id).cloned())
    }

    fn redeem_if_available(
        &self,
        id: &TokenId,
        redemption: &Redemption,
    ) -> StoreResult<RedeemAttempt> {
        // Check and mutation under one write lock
        let mut tokens = self.tokens.write().unwrap();
        let Some(record) = tokens.get_mut(id) else {
            return Ok(RedeemAttempt::Missing);
        };

        if record.redeemed || record.expires_at < redemption.redeemed_at {
            return Ok(RedeemAttempt::Rejected(record.clone()));
        }

        record.redeemed = true;
        record.redeemed_at = Some(redemption.redeemed_at);
        record.bound_device_id = Some(redemption.device_id.clone());
        record.redemption_context = Some(redemption.context.clone());
        record.expires_at = record.expires_at.max(redemption.expires_at);

        Ok(RedeemAttempt::Redeemed(record.clone()))
    }

    fn extend_expiry(
        &self,
        id: &TokenId,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<TokenRecord>> {
        let mut tokens = self.tokens.write().unwrap();
        Ok(tokens.get_mut(id).map(|record| {
            record.expires_at = record.expires_at.max(expires_at);
            record.clone()
        }))
    }

    fn query(&self, query: &TokenQuery) -> StoreResult<Vec<TokenRecord>> {
        let tokens = self.tokens.read().unwrap();
        let mut matching: Vec<TokenRecord> = tokens
            .values()
            .filter(|record| query.filter.matches(record))
            .cloned()
            .collect();

        match query.order {
            TokenOrder::NewestFirst => matching.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
            }),
            TokenOrder::SoonestExpiry => matching.sort_by(|a, b| {
                a.expires_at.cmp(&b.expires_at).then_with(|| a.id.cmp(&b.id))
            }),
        }

        let page = matching.into_iter().skip(query.offset);
        Ok(match query.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        })
    }

    fn count(&self, filter: &TokenFilter) -> StoreResult<u64> {
        let tokens = self.tokens.read().unwrap();
        Ok(tokens.values().filter(|record| filter.matches(record)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use license_core::{OwnerInfo, RedemptionContext};

    fn token(n: u8, created_at: DateTime<Utc>) -> TokenRecord {
        let owner = OwnerInfo::new("a@b.com", "Ana Lopez", "5551234567").unwrap();
        TokenRecord::new(
            TokenId(format!("{:032x}", n)),
            &owner,
            created_at,
            created_at + Duration::days(30),
        )
    }

    fn redemption(at: DateTime<Utc>, device: &str) -> Redemption {
        Redemption {
            device_id: device.to_string(),
            context: RedemptionContext {
                source_ip: None,
                device_info: "test".to_string(),
                timestamp: at,
            },
            redeemed_at: at,
            expires_at: at + Duration::days(60),
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let store = InMemoryTokenStore::new();
        let record = token(1, start());

        store.insert(&record).unwrap();
        assert!(matches!(store.insert(&record), Err(LicenseError::DuplicateId)));
    }

    #[test]
    fn test_redeem_once() {
        let store = InMemoryTokenStore::new();
        let record = token(1, start());
        store.insert(&record).unwrap();

        let at = start() + Duration::days(1);
        let first = store.redeem_if_available(&record.id, &redemption(at, "dev-1")).unwrap();
        let RedeemAttempt::Redeemed(redeemed) = &first else {
            panic!("expected redemption, got {:?}", first);
        };
        assert_eq!(redeemed.bound_device_id.as_deref(), Some("dev-1"));
        assert_eq!(redeemed.expires_at, at + Duration::days(60));

        let second = store.redeem_if_available(&record.id, &redemption(at, "dev-2")).unwrap();
        let RedeemAttempt::Rejected(seen) = &second else {
            panic!("expected rejection, got {:?}", second);
        };
        assert_eq!(seen.bound_device_id.as_deref(), Some("dev-1"));
    }

    #[test]
    fn test_redeem_rejects_expired_and_missing() {
        let store = InMemoryTokenStore::new();
        let record = token(1, start());
        store.insert(&record).unwrap();

        let late = record.expires_at + Duration::seconds(1);
        let attempt = store.redeem_if_available(&record.id, &redemption(late, "dev")).unwrap();
        assert!(matches!(attempt, RedeemAttempt::Rejected(r) if !r.redeemed));

        let missing = TokenId(format!("{:032x}", 99));
        let attempt = store.redeem_if_available(&missing, &redemption(late, "dev")).unwrap();
        assert_eq!(attempt, RedeemAttempt::Missing);
    }

    #[test]
    fn test_extend_expiry_never_shortens() {
        let store = InMemoryTokenStore::new();
        let record = token(1, start());
        store.insert(&record).unwrap();

        let shorter = record.expires_at - Duration::days(10);
        let updated = store.extend_expiry(&record.id, shorter).unwrap().unwrap();
        assert_eq!(updated.expires_at, record.expires_at);

        let longer = record.expires_at + Duration::days(10);
        let updated = store.extend_expiry(&record.id, longer).unwrap().unwrap();
        assert_eq!(updated.expires_at, longer);
    }

    #[test]
    fn test_query_newest_first_with_paging() {
        let store = InMemoryTokenStore::new();
        for n in 0..7u8 {
            store.insert(&token(n, start() + Duration::hours(n as i64))).unwrap();
        }

        let page = store
            .query(&TokenQuery::new(TokenFilter::All).page(2, 3))
            .unwrap();
        let ids: Vec<_> = page.iter().map(|r| r.created_at).collect();
        assert_eq!(
            ids,
            vec![
                start() + Duration::hours(4),
                start() + Duration::hours(3),
                start() + Duration::hours(2),
            ]
        );
        assert_eq!(store.count(&TokenFilter::All).unwrap(), 7);
    }
}
