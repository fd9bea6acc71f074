//! Service configuration

use license_core::{ExpiryPolicy, RenewalAnchor};
use serde::Deserialize;

use crate::conversation::DEFAULT_SESSION_TTL_MINUTES;
use crate::notify::SmtpConfig;

/// Longest accepted session TTL, one week
pub const MAX_SESSION_TTL_MINUTES: i64 = 7 * 24 * 60;

#[derive(Clone, Deserialize)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// SQLite database file; tokens live in memory when unset
    pub database_path: Option<String>,

    /// Shared secret for admin routes; admin routes are open when unset
    pub admin_api_key: Option<String>,

    /// Idle chat sessions older than this are discarded
    pub session_ttl_minutes: i64,

    pub expiry_policy: ExpiryPolicy,

    pub renewal_anchor: RenewalAnchor,

    /// SMTP settings for mailing notifications to an operator
    #[serde(skip)]
    pub smtp: Option<SmtpConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_path: None,
            admin_api_key: None,
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            expiry_policy: ExpiryPolicy::default(),
            renewal_anchor: RenewalAnchor::default(),
            smtp: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// - PORT (default: 3000)
    /// - DATABASE_PATH
    /// - ADMIN_API_KEY
    /// - SESSION_TTL_MINUTES (default: 30, capped at one week)
    /// - EXPIRY_POLICY: `calendar` or `fixed:<days>` (default: calendar)
    /// - RENEWAL_ANCHOR: `now` or `later` (default: later)
    /// - SMTP_* (see [`SmtpConfig::from_env`])
    pub fn from_env() -> Result<Self, license_core::Error> {
        fn get_env(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|s| !s.is_empty())
        }

        let defaults = Self::default();

        let expiry_policy = match get_env("EXPIRY_POLICY") {
            Some(value) => value.parse()?,
            None => defaults.expiry_policy,
        };
        let renewal_anchor = match get_env("RENEWAL_ANCHOR") {
            Some(value) => value.parse()?,
            None => defaults.renewal_anchor,
        };

        Ok(Self {
            port: get_env("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            database_path: get_env("DATABASE_PATH"),
            admin_api_key: get_env("ADMIN_API_KEY"),
            session_ttl_minutes: parse_session_ttl(get_env("SESSION_TTL_MINUTES").as_deref())
                .unwrap_or(defaults.session_ttl_minutes),
            expiry_policy,
            renewal_anchor,
            smtp: SmtpConfig::from_env(),
        })
    }
}

/// Positive minutes, capped at [`MAX_SESSION_TTL_MINUTES`]
fn parse_session_ttl(raw: Option<&str>) -> Option<i64> {
    raw?.trim()
        .parse::<i64>()
        .ok()
        .filter(|m| *m > 0)
        .map(|m| m.min(MAX_SESSION_TTL_MINUTES))
}

/// Secrets stay out of logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_path", &self.database_path)
            .field("admin_api_key", &self.admin_api_key.as_ref().map(|_| "<set>"))
            .field("session_ttl_minutes", &self.session_ttl_minutes)
            .field("expiry_policy", &self.expiry_policy)
            .field("renewal_anchor", &self.renewal_anchor)
            .field("smtp", &self.smtp.as_ref().map(|s| &s.host))
            .finish()
    }
}
