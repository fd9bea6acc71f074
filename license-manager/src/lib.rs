//! License Manager
//!
//! Issues single-use license tokens, binds them to a device on first
//! redemption, and keeps their expiry rolling forward on renewal. Tokens
//! are minted over an admin HTTP API or through a chat dialogue.

pub mod clock;
pub mod config;
pub mod conversation;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod notify;
pub mod routes;
pub mod state;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use conversation::{Conversation, Dispatch, InMemorySessionStore, SessionId, SessionStore};
pub use crypto::{IdGenerator, RandomIdGenerator};
pub use engine::{LicenseEngine, RedemptionRequest};
pub use error::LicenseError;
pub use notify::{ConsoleNotifier, Notifier, SmtpConfig, SmtpNotifier};
pub use state::AppState;
pub use store::{InMemoryTokenStore, SqliteStore, TokenStore};
