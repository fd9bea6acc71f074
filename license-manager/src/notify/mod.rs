//! Outbound notification abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleNotifier;
pub use smtp::{SmtpConfig, SmtpNotifier};

use license_core::ShareLink;

/// Longest message a chat transport is sent in one piece, in characters
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Trait for delivering human-readable results.
///
/// Delivery is fire-and-forget from the caller's side: failures are
/// logged and never retried.
pub trait Notifier: Send + Sync {
    /// Send `text` to `destination`, with optional link attachments
    fn send(&self, destination: &str, text: &str, attachments: &[ShareLink])
        -> Result<(), String>;
}

/// Allow using Box<dyn Notifier> as a Notifier
impl Notifier for Box<dyn Notifier> {
    fn send(
        &self,
        destination: &str,
        text: &str,
        attachments: &[ShareLink],
    ) -> Result<(), String> {
        (**self).send(destination, text, attachments)
    }
}

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Prefers to break after a newline; falls back to a hard split on a
/// character boundary.
pub fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        let hard_end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let end = match rest[..hard_end].rfind('\n') {
            Some(newline) if newline > 0 => newline + 1,
            _ => hard_end,
        };
        chunks.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_is_one_chunk() {
        assert_eq!(chunk_message("pong!", 4000), vec!["pong!".to_string()]);
        assert_eq!(chunk_message("", 4000), vec![String::new()]);
    }

    #[test]
    fn test_chunks_break_on_newlines() {
        let text = "aaaa\nbbbb\ncccc\n";
        let chunks = chunk_message(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n", "cccc\n"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunks_respect_char_boundaries() {
        let text = "ñ".repeat(25);
        let chunks = chunk_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }
}
