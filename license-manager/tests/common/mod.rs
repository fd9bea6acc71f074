//! Common test utilities for license manager integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use license_core::{OwnerInfo, ShareLink, TokenId};
use license_manager::{
    routes, AppState, Conversation, IdGenerator, InMemorySessionStore, InMemoryTokenStore,
    LicenseEngine, ManualClock, Notifier, TokenStore,
};

/// A message captured by [`MockNotifier`]
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub destination: String,
    pub text: String,
    pub attachments: Vec<ShareLink>,
}

/// Mock notifier that captures everything sent
#[derive(Default, Clone)]
pub struct MockNotifier {
    pub sent: Arc<RwLock<Vec<SentMessage>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages_for(&self, destination: &str) -> Vec<SentMessage> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.destination == destination)
            .cloned()
            .collect()
    }

    /// Text of the last message sent to a destination
    pub fn last_text(&self, destination: &str) -> Option<String> {
        self.messages_for(destination).pop().map(|m| m.text)
    }

    pub fn count(&self) -> usize {
        self.sent.read().unwrap().len()
    }
}

impl Notifier for MockNotifier {
    fn send(
        &self,
        destination: &str,
        text: &str,
        attachments: &[ShareLink],
    ) -> Result<(), String> {
        self.sent.write().unwrap().push(SentMessage {
            destination: destination.to_string(),
            text: text.to_string(),
            attachments: attachments.to_vec(),
        });
        Ok(())
    }
}

/// Id generator that hands out a fixed sequence
pub struct SequenceIds {
    ids: Mutex<VecDeque<TokenId>>,
}

impl SequenceIds {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            ids: Mutex::new(ids.iter().map(|id| TokenId(id.to_string())).collect()),
        }
    }
}

impl IdGenerator for SequenceIds {
    fn next_id(&self) -> TokenId {
        self.ids
            .lock()
            .unwrap()
            .pop_front()
            .expect("SequenceIds exhausted")
    }
}

/// 2025-01-15 10:30 UTC
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()
}

pub fn owner() -> OwnerInfo {
    OwnerInfo::new("ana@example.com", "Ana Lopez", "+52 (555) 123-4567").unwrap()
}

/// Engine over `store` with a manual clock at [`start`]
pub fn engine_with<S: TokenStore>(store: S) -> (Arc<LicenseEngine<S>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    let engine = LicenseEngine::new(store).with_clock(clock.clone());
    (Arc::new(engine), clock)
}

pub fn test_engine() -> (Arc<LicenseEngine<InMemoryTokenStore>>, Arc<ManualClock>) {
    engine_with(InMemoryTokenStore::new())
}

pub type TestConversation = Conversation<InMemoryTokenStore, InMemorySessionStore, MockNotifier>;

pub fn test_conversation() -> (
    TestConversation,
    Arc<LicenseEngine<InMemoryTokenStore>>,
    MockNotifier,
    Arc<ManualClock>,
) {
    let (engine, clock) = test_engine();
    let notifier = MockNotifier::new();
    let conversation =
        Conversation::new(engine.clone(), InMemorySessionStore::new(), notifier.clone());
    (conversation, engine, notifier, clock)
}

/// Create a test server with a mock notifier and a manual clock
pub fn create_test_server(admin_key: Option<&str>) -> (TestServer, MockNotifier, Arc<ManualClock>) {
    let (conversation, engine, notifier, clock) = test_conversation();

    let state = Arc::new(AppState::new(
        engine,
        conversation,
        admin_key.map(str::to_string),
    ));

    let app = routes::create_router(state);
    let server = TestServer::new(app).expect("Failed to create test server");

    (server, notifier, clock)
}

pub fn admin_header(key: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-admin-key"),
        HeaderValue::from_static(key),
    )
}
