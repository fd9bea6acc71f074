//! Chat transport bridge

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::require_admin;
use crate::conversation::{SessionId, SessionStore};
use crate::error::LicenseError;
use crate::notify::Notifier;
use crate::state::AppState;
use crate::store::TokenStore;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub chat_id: String,
    pub text: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub handled: bool,
}

/// POST /chat/messages
///
/// Replies go out through the notifier; the response only says whether
/// the message was consumed. The dialogue mints and lists tokens, so the
/// transport must present the admin key like any other admin caller.
pub async fn receive_message<S, C, N>(
    State(state): State<Arc<AppState<S, C, N>>>,
    headers: HeaderMap,
    Json(msg): Json<ChatMessage>,
) -> Result<Json<ChatResponse>, LicenseError>
where
    S: TokenStore,
    C: SessionStore,
    N: Notifier,
{
    require_admin(&state, &headers)?;

    let session_id = SessionId::new(msg.chat_id);
    let dispatch = state.conversation.handle_message(&session_id, &msg.text);
    tracing::debug!(session = %session_id.as_str(), ?dispatch, "Chat message dispatched");

    Ok(Json(ChatResponse {
        handled: dispatch.is_handled(),
    }))
}
