//! Human-readable token summaries and share links
//!
//! These are conveniences for handing a freshly minted token to its owner.
//! Nothing here is authoritative; the stored record is.

use serde::Serialize;

use crate::token::TokenRecord;

/// Subject line used for email share links
pub const EMAIL_SUBJECT: &str = "Your License Token";

/// A labelled URL, rendered by chat transports as a button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLink {
    pub label: String,
    pub url: String,
}

impl ShareLink {
    fn new(label: &str, url: String) -> Self {
        Self {
            label: label.to_string(),
            url,
        }
    }
}

/// Summary of a token for its owner
pub fn token_message(record: &TokenRecord) -> String {
    format!(
        "Your license token is ready!\n\n\
         Token: {}\n\
         Owner: {}\n\
         Email: {}\n\
         Phone: {}\n\
         Valid until: {}\n\n\
         IMPORTANT:\n\
         - This token can only be redeemed once\n\
         - It can only be used on one device\n\
         - Misuse may result in cancellation",
        record.id,
        record.owner_name,
        record.owner_email,
        record.owner_phone,
        record.expires_at.format("%Y-%m-%d"),
    )
}

/// WhatsApp, Gmail and mailto links carrying [`token_message`]
pub fn share_links(record: &TokenRecord) -> Vec<ShareLink> {
    let message = token_message(record);
    let body = urlencoding::encode(&message);
    let subject = urlencoding::encode(EMAIL_SUBJECT);
    let to = urlencoding::encode(&record.owner_email);

    vec![
        ShareLink::new(
            "Share via WhatsApp",
            format!("https://wa.me/{}?text={}", record.owner_phone, body),
        ),
        ShareLink::new(
            "Open in Gmail",
            format!(
                "https://mail.google.com/mail/?view=cm&fs=1&to={}&su={}&body={}",
                to, subject, body
            ),
        ),
        ShareLink::new(
            "Send by email",
            format!("mailto:{}?subject={}&body={}", record.owner_email, subject, body),
        ),
    ]
}
