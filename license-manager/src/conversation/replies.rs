//! Reply texts sent by the dialogue

use chrono::{DateTime, Utc};
use license_core::TokenRecord;

pub const WELCOME: &str = "🎉 Welcome to the License Manager bot!\nUse /help to see the available commands.";

pub const HELP: &str = "🔍 Available commands:\n\n\
    🎯 /new_token - Generate a new token\n\
    📋 /list_tokens [page] - Show all tokens\n\
    ⚠️ /expiring_tokens - Tokens expiring in the next 7 days\n\
    ❌ /expired_tokens - Tokens past their expiry\n\
    🏓 /ping - Check the bot is alive\n\
    ❓ /help - Show this message";

pub const PONG: &str = "pong!";

pub const ASK_EMAIL: &str = "📧 Please enter the user's email address:";
pub const ASK_NAME: &str = "👤 Please enter the full name:";
pub const ASK_PHONE: &str = "📱 Please enter the phone number (digits only):";

pub const INVALID_EMAIL: &str =
    "❌ Invalid email. Use /new_token to start again.";
pub const INVALID_NAME: &str =
    "❌ Name too short. Use /new_token to start again.";
pub const INVALID_PHONE: &str =
    "❌ Invalid phone number. Use /new_token to start again.";

pub const CREATION_FAILED: &str = "❌ Could not generate the token. Please try again.";
pub const LIST_FAILED: &str = "❌ Could not fetch the token list.";
pub const EXPIRING_FAILED: &str = "❌ Could not fetch tokens about to expire.";
pub const EXPIRED_FAILED: &str = "❌ Could not fetch expired tokens.";

pub const SHARE_HEADER: &str = "📤 Share options:";

fn status(record: &TokenRecord) -> &'static str {
    if record.redeemed {
        "✅ Redeemed"
    } else {
        "⏳ Not redeemed"
    }
}

/// Token list page, one block per token
pub fn token_list(
    tokens: &[TokenRecord],
    page: usize,
    total_pages: usize,
    now: DateTime<Utc>,
) -> String {
    if tokens.is_empty() {
        return "📋 No tokens on this page.".to_string();
    }

    let mut message = format!("📋 Tokens (page {} of {}):\n\n", page, total_pages);
    for token in tokens {
        message.push_str(&format!(
            "🔑 Token: {}\n👤 Owner: {}\n📧 Email: {}\n📅 Status: {}\n⏰ Days left: {}\n\n",
            token.id,
            token.owner_name,
            token.owner_email,
            status(token),
            token.remaining_days(now),
        ));
    }
    message
}

pub fn expiring_list(tokens: &[TokenRecord]) -> String {
    if tokens.is_empty() {
        return "✨ No tokens are about to expire!".to_string();
    }

    let mut message = "⚠️ Tokens about to expire:\n\n".to_string();
    for token in tokens {
        message.push_str(&format!(
            "🔑 Token: {}\n👤 Owner: {}\n📅 Expires: {}\n\n",
            token.id,
            token.owner_name,
            token.expires_at.format("%Y-%m-%d"),
        ));
    }
    message
}

pub fn expired_list(tokens: &[TokenRecord]) -> String {
    if tokens.is_empty() {
        return "✨ No expired tokens.".to_string();
    }

    let mut message = "❌ Expired tokens:\n\n".to_string();
    for token in tokens {
        message.push_str(&format!(
            "🔑 Token: {}\n👤 Owner: {}\n📅 Expired: {}\n\n",
            token.id,
            token.owner_name,
            token.expires_at.format("%Y-%m-%d"),
        ));
    }
    message
}
