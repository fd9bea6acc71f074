//! Shared application state

use std::sync::Arc;

use crate::conversation::{Conversation, SessionStore};
use crate::engine::LicenseEngine;
use crate::notify::Notifier;
use crate::store::TokenStore;

/// State handed to every HTTP handler
pub struct AppState<S, C, N> {
    pub engine: Arc<LicenseEngine<S>>,
    pub conversation: Conversation<S, C, N>,
    /// Required in `x-admin-key` on admin routes when set
    pub admin_key: Option<String>,
}

impl<S, C, N> AppState<S, C, N>
where
    S: TokenStore,
    C: SessionStore,
    N: Notifier,
{
    pub fn new(
        engine: Arc<LicenseEngine<S>>,
        conversation: Conversation<S, C, N>,
        admin_key: Option<String>,
    ) -> Self {
        Self {
            engine,
            conversation,
            admin_key,
        }
    }
}
