//! Client-facing redemption and validity endpoints

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use license_core::RedemptionOutcome;
use serde::{Deserialize, Serialize};

use crate::conversation::SessionStore;
use crate::engine::RedemptionRequest;
use crate::error::LicenseError;
use crate::notify::Notifier;
use crate::state::AppState;
use crate::store::TokenStore;

#[derive(Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
}

/// GET /api/status
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "API running",
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub token: Option<String>,
    pub machine_id: Option<String>,
    pub device_info: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl From<RedemptionOutcome> for ValidateResponse {
    fn from(outcome: RedemptionOutcome) -> Self {
        let (expires_at, redeemed_at) = match &outcome {
            RedemptionOutcome::NotFound => (None, None),
            RedemptionOutcome::AlreadyRedeemed { redeemed_at } => (None, *redeemed_at),
            RedemptionOutcome::Expired { expired_at } => (Some(*expired_at), None),
            RedemptionOutcome::Redeemed { expires_at } => (Some(*expires_at), None),
        };

        Self {
            success: outcome.is_success(),
            message: outcome.message().to_string(),
            expires_at,
            redeemed_at,
        }
    }
}

/// First hop of `X-Forwarded-For`, else the peer address
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// POST /api/validate
///
/// Business rejections are answered with 200 and `success: false`.
pub async fn validate<S, C, N>(
    State(state): State<Arc<AppState<S, C, N>>>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, LicenseError>
where
    S: TokenStore,
    C: SessionStore,
    N: Notifier,
{
    let token = req.token.filter(|t| !t.trim().is_empty());
    let machine_id = req.machine_id.filter(|m| !m.trim().is_empty());
    let (Some(token), Some(machine_id)) = (token, machine_id) else {
        return Err(LicenseError::InvalidRequest(
            "Token and machineId are required".to_string(),
        ));
    };

    let request = RedemptionRequest {
        source_ip: client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr)),
        device_info: req.device_info,
    };

    let outcome = state
        .engine
        .validate_and_redeem(&token, &machine_id, request)?;

    Ok(Json(outcome.into()))
}

#[derive(Serialize)]
pub struct ValidityResponse {
    pub valid: bool,
}

/// GET /api/check-validity/:token
pub async fn check_validity<S, C, N>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(token): Path<String>,
) -> Json<ValidityResponse>
where
    S: TokenStore,
    C: SessionStore,
    N: Notifier,
{
    Json(ValidityResponse {
        valid: state.engine.check_validity(&token),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        assert_eq!(
            client_ip(&headers, Some(peer)).as_deref(),
            Some("203.0.113.7")
        );
        assert_eq!(
            client_ip(&HeaderMap::new(), Some(peer)).as_deref(),
            Some("127.0.0.1")
        );
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_response_never_carries_device() {
        let body = serde_json::to_value(ValidateResponse::from(RedemptionOutcome::NotFound)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "success": false, "message": "Token not found" })
        );
    }
}
