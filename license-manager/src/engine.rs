//! Token lifecycle: create, check, redeem, renew and list
//!
//! The engine owns no state of its own. Every rule that must hold under
//! concurrency is delegated to a single atomic store call, so any number
//! of engines may share one store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use license_core::token::UNKNOWN_DEVICE_INFO;
use license_core::{
    share_links, ExpiryPolicy, OwnerInfo, RedemptionContext, RedemptionOutcome, RenewalAnchor,
    ShareLink, TokenId, TokenRecord,
};

use crate::clock::{Clock, SystemClock};
use crate::crypto::{IdGenerator, RandomIdGenerator};
use crate::error::LicenseError;
use crate::store::{
    RedeemAttempt, Redemption, TokenFilter, TokenOrder, TokenQuery, TokenStore,
};

/// Attempts at finding an unused id before giving up
pub const MAX_ID_ATTEMPTS: usize = 3;

/// Client details supplied with a redemption request
#[derive(Debug, Clone, Default)]
pub struct RedemptionRequest {
    pub source_ip: Option<String>,
    pub device_info: Option<String>,
}

pub struct LicenseEngine<S> {
    store: S,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    policy: ExpiryPolicy,
    renewal_anchor: RenewalAnchor,
}

impl<S: TokenStore> LicenseEngine<S> {
    /// Engine on the system clock with random ids and default policies
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIdGenerator),
            policy: ExpiryPolicy::default(),
            renewal_anchor: RenewalAnchor::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_renewal_anchor(mut self, anchor: RenewalAnchor) -> Self {
        self.renewal_anchor = anchor;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Mint a token for a validated owner.
    pub fn create(&self, owner: &OwnerInfo) -> Result<TokenRecord, LicenseError> {
        let created_at = self.clock.now();
        let expires_at = self.policy.initial_expiry(created_at);

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let record = TokenRecord::new(self.ids.next_id(), owner, created_at, expires_at);
            match self.store.insert(&record) {
                Ok(()) => {
                    tracing::info!(
                        token = %record.id,
                        email = %record.owner_email,
                        expires_at = %record.expires_at,
                        "Token created"
                    );
                    return Ok(record);
                }
                Err(LicenseError::DuplicateId) => {
                    tracing::warn!(attempt, "Token id collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(LicenseError::DuplicateId)
    }

    /// Whether a token exists and has not expired.
    ///
    /// Never fails: malformed ids, unknown ids and store errors are all
    /// reported as invalid.
    pub fn check_validity(&self, token_id: &str) -> bool {
        let Ok(id) = TokenId::parse(token_id) else {
            return false;
        };

        match self.store.get(&id) {
            Ok(Some(record)) => record.is_valid_at(self.clock.now()),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(token = %id, error = %e, "Validity check failed");
                false
            }
        }
    }

    /// Consume a token and bind it to `device_id`.
    ///
    /// Business rejections come back as [`RedemptionOutcome`] values; only
    /// storage failures are errors.
    pub fn validate_and_redeem(
        &self,
        token_id: &str,
        device_id: &str,
        request: RedemptionRequest,
    ) -> Result<RedemptionOutcome, LicenseError> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(LicenseError::InvalidRequest(
                "A device id is required".to_string(),
            ));
        }

        let Ok(id) = TokenId::parse(token_id) else {
            return Ok(RedemptionOutcome::NotFound);
        };

        let now = self.clock.now();
        let redemption = Redemption {
            device_id: device_id.to_string(),
            context: RedemptionContext {
                source_ip: request.source_ip,
                device_info: request
                    .device_info
                    .filter(|info| !info.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_DEVICE_INFO.to_string()),
                timestamp: now,
            },
            redeemed_at: now,
            expires_at: self.policy.redemption_expiry(now),
        };

        let outcome = match self.store.redeem_if_available(&id, &redemption)? {
            RedeemAttempt::Redeemed(record) => RedemptionOutcome::Redeemed {
                expires_at: record.expires_at,
            },
            RedeemAttempt::Rejected(record) if record.redeemed => {
                RedemptionOutcome::AlreadyRedeemed {
                    redeemed_at: record.redeemed_at,
                }
            }
            RedeemAttempt::Rejected(record) => RedemptionOutcome::Expired {
                expired_at: record.expires_at,
            },
            RedeemAttempt::Missing => RedemptionOutcome::NotFound,
        };

        tracing::info!(token = %id, outcome = outcome.message(), "Redemption attempt");
        Ok(outcome)
    }

    /// Push a token's expiry forward by `units` policy cycles.
    ///
    /// The result is never earlier than the expiry before the call.
    pub fn renew(&self, token_id: &str, units: u32) -> Result<TokenRecord, LicenseError> {
        if units == 0 {
            return Err(LicenseError::InvalidRequest(
                "Renewal must be for at least one period".to_string(),
            ));
        }

        let id = TokenId::parse(token_id).map_err(|_| LicenseError::NotFound)?;
        let current = self.store.get(&id)?.ok_or(LicenseError::NotFound)?;

        let anchor = self.renewal_anchor.anchor(self.clock.now(), current.expires_at);
        let candidate = self.policy.extend(anchor, units);

        let renewed = self
            .store
            .extend_expiry(&id, candidate)?
            .ok_or(LicenseError::NotFound)?;

        tracing::info!(
            token = %id,
            units,
            previous = %current.expires_at,
            expires_at = %renewed.expires_at,
            "Token renewed"
        );
        Ok(renewed)
    }

    /// A page of tokens, newest first, with the total count
    pub fn list_all(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<TokenRecord>, u64), LicenseError> {
        let tokens = self
            .store
            .query(&TokenQuery::new(TokenFilter::All).page(offset, limit))?;
        let total = self.store.count(&TokenFilter::All)?;
        Ok((tokens, total))
    }

    /// Redeemed tokens expiring within the next `days` days, soonest first
    pub fn list_expiring_within(&self, days: u32) -> Result<Vec<TokenRecord>, LicenseError> {
        let now = self.clock.now();
        let filter = TokenFilter::RedeemedExpiringBetween {
            from: now,
            to: now
                .checked_add_signed(Duration::days(i64::from(days)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.store
            .query(&TokenQuery::new(filter).order(TokenOrder::SoonestExpiry))
    }

    /// Tokens past their expiry, soonest first
    pub fn list_expired(&self) -> Result<Vec<TokenRecord>, LicenseError> {
        let filter = TokenFilter::ExpiredBefore(self.clock.now());
        self.store
            .query(&TokenQuery::new(filter).order(TokenOrder::SoonestExpiry))
    }

    /// Share links for an existing token
    pub fn share_links(&self, token_id: &str) -> Result<Vec<ShareLink>, LicenseError> {
        let id = TokenId::parse(token_id).map_err(|_| LicenseError::NotFound)?;
        let record = self.store.get(&id)?.ok_or(LicenseError::NotFound)?;
        Ok(share_links(&record))
    }
}
