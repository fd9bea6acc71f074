//! Chat dialogue for minting tokens
//!
//! A session walks email -> name -> phone. Any invalid answer discards the
//! session on the spot; the operator has to start over with the begin
//! command. Standalone commands work whether or not a session is open and
//! leave an open session untouched.

pub mod replies;
pub mod session;

pub use session::{
    CollectedOwner, ConversationSession, InMemorySessionStore, SessionId, SessionStore, Step,
};

use std::sync::Arc;

use chrono::Duration;
use license_core::owner::{normalize_phone, validate_email, validate_name};
use license_core::{share_links, token_message, OwnerInfo, ShareLink, TokenId};

use crate::engine::LicenseEngine;
use crate::error::LicenseError;
use crate::notify::{chunk_message, Notifier, MAX_MESSAGE_CHARS};
use crate::store::TokenStore;

/// Idle sessions older than this are discarded
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

/// Tokens per page of `/list_tokens`
pub const LIST_PAGE_SIZE: usize = 25;

/// Window used by `/expiring_tokens`
pub const EXPIRING_WINDOW_DAYS: u32 = 7;

/// A recognized standalone command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Ping,
    NewToken,
    ListTokens { page: usize },
    ExpiringTokens,
    ExpiredTokens,
}

impl Command {
    /// Parse `/command[@bot] [args]`; `None` for anything else
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let head = words.next()?.strip_prefix('/')?;
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();

        let command = match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "ping" => Command::Ping,
            "new_token" | "generar_token" => Command::NewToken,
            "list_tokens" | "listar_tokens" => Command::ListTokens {
                page: words
                    .next()
                    .and_then(|p| p.parse().ok())
                    .filter(|p| *p > 0)
                    .unwrap_or(1),
            },
            "expiring_tokens" | "tokens_caducando" => Command::ExpiringTokens,
            "expired_tokens" | "tokens_expirados" => Command::ExpiredTokens,
            _ => return None,
        };
        Some(command)
    }
}

/// What happened to an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A standalone command ran
    Command(Command),
    /// The dialogue moved on and is now waiting at this step
    Advanced(Step),
    /// All answers were valid and a token was minted
    Completed(TokenId),
    /// The session was discarded
    Aborted,
    /// Not a command and no open session
    Ignored,
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        !matches!(self, Dispatch::Ignored)
    }
}

pub struct Conversation<S, C, N> {
    engine: Arc<LicenseEngine<S>>,
    sessions: C,
    notifier: N,
    session_ttl: Duration,
}

impl<S, C, N> Conversation<S, C, N>
where
    S: TokenStore,
    C: SessionStore,
    N: Notifier,
{
    pub fn new(engine: Arc<LicenseEngine<S>>, sessions: C, notifier: N) -> Self {
        Self {
            engine,
            sessions,
            notifier,
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn sessions(&self) -> &C {
        &self.sessions
    }

    /// Route one inbound chat message
    pub fn handle_message(&self, session_id: &SessionId, text: &str) -> Dispatch {
        if let Some(command) = Command::parse(text) {
            self.run_command(session_id, command);
            return Dispatch::Command(command);
        }

        let Some(mut session) = self.active_session(session_id) else {
            return Dispatch::Ignored;
        };

        match session.step {
            Step::AwaitingEmail => match validate_email(text) {
                Ok(email) => {
                    session.collected.email = Some(email);
                    self.advance(session, Step::AwaitingName, replies::ASK_NAME)
                }
                Err(_) => self.abort(session_id, replies::INVALID_EMAIL),
            },
            Step::AwaitingName => match validate_name(text) {
                Ok(name) => {
                    session.collected.name = Some(name);
                    self.advance(session, Step::AwaitingPhone, replies::ASK_PHONE)
                }
                Err(_) => self.abort(session_id, replies::INVALID_NAME),
            },
            Step::AwaitingPhone => match normalize_phone(text) {
                Ok(phone) => {
                    session.collected.phone = Some(phone);
                    self.complete(session)
                }
                Err(_) => self.abort(session_id, replies::INVALID_PHONE),
            },
        }
    }

    /// Drop sessions idle past the TTL
    pub fn purge_stale_sessions(&self) -> u64 {
        let Some(cutoff) = self.engine.now().checked_sub_signed(self.session_ttl) else {
            return 0;
        };
        match self.sessions.cleanup_expired(cutoff) {
            Ok(removed) => {
                if removed > 0 {
                    tracing::debug!(removed, "Purged stale sessions");
                }
                removed
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session cleanup failed");
                0
            }
        }
    }

    fn active_session(&self, session_id: &SessionId) -> Option<ConversationSession> {
        let session = match self.sessions.get(session_id) {
            Ok(session) => session?,
            Err(e) => {
                tracing::warn!(session = %session_id.as_str(), error = %e, "Session lookup failed");
                return None;
            }
        };

        if session.is_stale(self.engine.now(), self.session_ttl) {
            tracing::debug!(session = %session_id.as_str(), "Discarding stale session");
            self.discard(session_id);
            return None;
        }
        Some(session)
    }

    fn advance(&self, mut session: ConversationSession, next: Step, prompt: &str) -> Dispatch {
        session.step = next;
        let id = session.id.clone();
        if let Err(e) = self.sessions.put(session) {
            tracing::warn!(session = %id.as_str(), error = %e, "Failed to save session");
            self.discard(&id);
            self.reply(&id, replies::CREATION_FAILED, &[]);
            return Dispatch::Aborted;
        }
        self.reply(&id, prompt, &[]);
        Dispatch::Advanced(next)
    }

    fn abort(&self, session_id: &SessionId, message: &str) -> Dispatch {
        self.discard(session_id);
        self.reply(session_id, message, &[]);
        Dispatch::Aborted
    }

    fn complete(&self, session: ConversationSession) -> Dispatch {
        self.discard(&session.id);

        let CollectedOwner {
            email: Some(email),
            name: Some(name),
            phone: Some(phone),
        } = &session.collected
        else {
            tracing::error!(session = %session.id.as_str(), "Session completed with missing answers");
            self.reply(&session.id, replies::CREATION_FAILED, &[]);
            return Dispatch::Aborted;
        };

        let created = OwnerInfo::new(email, name, phone)
            .map_err(LicenseError::from)
            .and_then(|owner| self.engine.create(&owner));

        match created {
            Ok(record) => {
                self.reply(&session.id, &token_message(&record), &[]);
                self.reply(&session.id, replies::SHARE_HEADER, &share_links(&record));
                Dispatch::Completed(record.id)
            }
            Err(e) => {
                tracing::error!(session = %session.id.as_str(), error = %e, "Token creation failed");
                self.reply(&session.id, replies::CREATION_FAILED, &[]);
                Dispatch::Aborted
            }
        }
    }

    fn run_command(&self, session_id: &SessionId, command: Command) {
        match command {
            Command::Start => self.reply(session_id, replies::WELCOME, &[]),
            Command::Help => self.reply(session_id, replies::HELP, &[]),
            Command::Ping => self.reply(session_id, replies::PONG, &[]),
            Command::NewToken => {
                let session = ConversationSession::begin(session_id.clone(), self.engine.now());
                match self.sessions.put(session) {
                    Ok(()) => self.reply(session_id, replies::ASK_EMAIL, &[]),
                    Err(e) => {
                        tracing::warn!(session = %session_id.as_str(), error = %e, "Failed to open session");
                        self.reply(session_id, replies::CREATION_FAILED, &[]);
                    }
                }
            }
            Command::ListTokens { page } => {
                let offset = page.saturating_sub(1).saturating_mul(LIST_PAGE_SIZE);
                match self.engine.list_all(offset, LIST_PAGE_SIZE) {
                    Ok((tokens, total)) => {
                        let total_pages = (total as usize).div_ceil(LIST_PAGE_SIZE).max(1);
                        let text = replies::token_list(&tokens, page, total_pages, self.engine.now());
                        self.reply_chunked(session_id, &text);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to list tokens");
                        self.reply(session_id, replies::LIST_FAILED, &[]);
                    }
                }
            }
            Command::ExpiringTokens => match self.engine.list_expiring_within(EXPIRING_WINDOW_DAYS) {
                Ok(tokens) => self.reply_chunked(session_id, &replies::expiring_list(&tokens)),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to list expiring tokens");
                    self.reply(session_id, replies::EXPIRING_FAILED, &[]);
                }
            },
            Command::ExpiredTokens => match self.engine.list_expired() {
                Ok(tokens) => self.reply_chunked(session_id, &replies::expired_list(&tokens)),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to list expired tokens");
                    self.reply(session_id, replies::EXPIRED_FAILED, &[]);
                }
            },
        }
    }

    fn discard(&self, session_id: &SessionId) {
        if let Err(e) = self.sessions.remove(session_id) {
            tracing::warn!(session = %session_id.as_str(), error = %e, "Failed to remove session");
        }
    }

    fn reply(&self, session_id: &SessionId, text: &str, attachments: &[ShareLink]) {
        if let Err(e) = self.notifier.send(session_id.as_str(), text, attachments) {
            tracing::warn!(session = %session_id.as_str(), error = %e, "Notification failed");
        }
    }

    fn reply_chunked(&self, session_id: &SessionId, text: &str) {
        for chunk in chunk_message(text, MAX_MESSAGE_CHARS) {
            self.reply(session_id, &chunk, &[]);
        }
    }
}
