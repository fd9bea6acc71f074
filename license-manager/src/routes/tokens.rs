//! Administrative token endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use license_core::{share_links, token_message, OwnerInfo, ShareLink, TokenRecord};
use serde::{Deserialize, Serialize};

use super::require_admin;
use crate::conversation::{SessionStore, EXPIRING_WINDOW_DAYS};
use crate::error::LicenseError;
use crate::notify::Notifier;
use crate::state::AppState;
use crate::store::TokenStore;

/// Tokens per page of `GET /api/tokens`
pub const API_PAGE_SIZE: usize = 5;

/// Admin view of a token; the bound device stays private
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    pub token: String,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_phone: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub redeemed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
    pub remaining_days: i64,
    pub active: bool,
}

impl TokenSummary {
    fn new(record: TokenRecord, now: DateTime<Utc>) -> Self {
        Self {
            remaining_days: record.remaining_days(now),
            active: record.is_active(now),
            token: record.id.0,
            owner_name: record.owner_name,
            owner_email: record.owner_email,
            owner_phone: record.owner_phone,
            created_at: record.created_at,
            expires_at: record.expires_at,
            redeemed: record.redeemed,
            redeemed_at: record.redeemed_at,
        }
    }
}

fn summaries(records: Vec<TokenRecord>, now: DateTime<Utc>) -> Vec<TokenSummary> {
    records
        .into_iter()
        .map(|record| TokenSummary::new(record, now))
        .collect()
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTokensResponse {
    pub tokens: Vec<TokenSummary>,
    pub current_page: usize,
    pub total_pages: usize,
}

/// GET /api/tokens?page=N
pub async fn list_tokens<S, C, N>(
    State(state): State<Arc<AppState<S, C, N>>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListTokensResponse>, LicenseError>
where
    S: TokenStore,
    C: SessionStore,
    N: Notifier,
{
    require_admin(&state, &headers)?;

    let page = query.page.filter(|p| *p > 0).unwrap_or(1);
    let offset = (page - 1).saturating_mul(API_PAGE_SIZE);
    let (tokens, total) = state.engine.list_all(offset, API_PAGE_SIZE)?;

    Ok(Json(ListTokensResponse {
        tokens: summaries(tokens, state.engine.now()),
        current_page: page,
        total_pages: (total as usize).div_ceil(API_PAGE_SIZE),
    }))
}

#[derive(Deserialize)]
pub struct CreateTokenRequest {
    pub email: String,
    pub name: String,
    pub phone: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenResponse {
    pub success: bool,
    pub token: TokenSummary,
    pub message: String,
    pub share_links: Vec<ShareLink>,
}

/// POST /api/tokens
///
/// Payment confirmations land here as well as manual issuance.
pub async fn create_token<S, C, N>(
    State(state): State<Arc<AppState<S, C, N>>>,
    headers: HeaderMap,
    Json(req): Json<CreateTokenRequest>,
) -> Result<Json<CreateTokenResponse>, LicenseError>
where
    S: TokenStore,
    C: SessionStore,
    N: Notifier,
{
    require_admin(&state, &headers)?;

    let owner = OwnerInfo::new(&req.email, &req.name, &req.phone)?;
    let record = state.engine.create(&owner)?;

    Ok(Json(CreateTokenResponse {
        success: true,
        message: token_message(&record),
        share_links: share_links(&record),
        token: TokenSummary::new(record, state.engine.now()),
    }))
}

#[derive(Deserialize)]
pub struct RenewRequest {
    /// Policy cycles to add: months under calendar rollover, periods
    /// of the fixed duration otherwise
    pub months: u32,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: TokenSummary,
}

/// POST /api/tokens/:token/renew
pub async fn renew_token<S, C, N>(
    State(state): State<Arc<AppState<S, C, N>>>,
    headers: HeaderMap,
    Path(token): Path<String>,
    Json(req): Json<RenewRequest>,
) -> Result<Json<TokenResponse>, LicenseError>
where
    S: TokenStore,
    C: SessionStore,
    N: Notifier,
{
    require_admin(&state, &headers)?;

    let record = state.engine.renew(&token, req.months)?;

    Ok(Json(TokenResponse {
        success: true,
        token: TokenSummary::new(record, state.engine.now()),
    }))
}

#[derive(Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<u32>,
}

#[derive(Serialize)]
pub struct TokenListResponse {
    pub tokens: Vec<TokenSummary>,
}

/// GET /api/tokens/expiring?days=N
pub async fn expiring_tokens<S, C, N>(
    State(state): State<Arc<AppState<S, C, N>>>,
    headers: HeaderMap,
    Query(query): Query<ExpiringQuery>,
) -> Result<Json<TokenListResponse>, LicenseError>
where
    S: TokenStore,
    C: SessionStore,
    N: Notifier,
{
    require_admin(&state, &headers)?;

    let days = query.days.unwrap_or(EXPIRING_WINDOW_DAYS);
    let tokens = state.engine.list_expiring_within(days)?;

    Ok(Json(TokenListResponse {
        tokens: summaries(tokens, state.engine.now()),
    }))
}

/// GET /api/tokens/expired
pub async fn expired_tokens<S, C, N>(
    State(state): State<Arc<AppState<S, C, N>>>,
    headers: HeaderMap,
) -> Result<Json<TokenListResponse>, LicenseError>
where
    S: TokenStore,
    C: SessionStore,
    N: Notifier,
{
    require_admin(&state, &headers)?;

    let tokens = state.engine.list_expired()?;

    Ok(Json(TokenListResponse {
        tokens: summaries(tokens, state.engine.now()),
    }))
}
