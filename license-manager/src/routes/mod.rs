//! HTTP routes for the license manager

mod chat;
mod tokens;
mod validate;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::conversation::SessionStore;
use crate::error::LicenseError;
use crate::notify::Notifier;
use crate::state::AppState;
use crate::store::TokenStore;

/// Header carrying the admin key
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Create the router with all routes
pub fn create_router<S, C, N>(state: Arc<AppState<S, C, N>>) -> Router
where
    S: TokenStore + 'static,
    C: SessionStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/status", get(validate::status))
        .route("/api/validate", post(validate::validate))
        .route("/api/check-validity/:token", get(validate::check_validity))
        .route("/api/tokens", get(tokens::list_tokens).post(tokens::create_token))
        .route("/api/tokens/expiring", get(tokens::expiring_tokens))
        .route("/api/tokens/expired", get(tokens::expired_tokens))
        .route("/api/tokens/:token/renew", post(tokens::renew_token))
        .route("/chat/messages", post(chat::receive_message))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Reject the request unless it carries the configured admin key.
///
/// Admin routes are open when no key is configured.
fn require_admin<S, C, N>(
    state: &AppState<S, C, N>,
    headers: &HeaderMap,
) -> Result<(), LicenseError> {
    let Some(expected) = state.admin_key.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided == Some(expected) {
        Ok(())
    } else {
        tracing::warn!("Rejected admin request without a valid key");
        Err(LicenseError::Unauthorized)
    }
}
