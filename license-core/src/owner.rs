//! Owner data captured when a token is minted

use serde::Serialize;

use crate::error::Error;
use crate::Result;

/// Minimum length of an owner's name, in characters
pub const MIN_NAME_LENGTH: usize = 3;

/// Minimum number of digits in a phone number
pub const MIN_PHONE_DIGITS: usize = 10;

/// Validated owner data.
///
/// Only constructible through [`OwnerInfo::new`], so holding one means the
/// email, name and phone have already passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerInfo {
    email: String,
    name: String,
    phone: String,
}

impl OwnerInfo {
    pub fn new(email: &str, name: &str, phone: &str) -> Result<Self> {
        Ok(Self {
            email: validate_email(email)?,
            name: validate_name(name)?,
            phone: normalize_phone(phone)?,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Phone number, digits only
    pub fn phone(&self) -> &str {
        &self.phone
    }
}

/// Check an address has the shape `local@domain.tld`.
///
/// Returns the trimmed address.
pub fn validate_email(input: &str) -> Result<String> {
    let email = input.trim();
    let invalid = || Error::InvalidEmail(email.to_string());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    // Needs a dot with something on both sides of it
    let dotted = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !dotted {
        return Err(invalid());
    }

    Ok(email.to_string())
}

/// Returns the trimmed name if it is long enough.
pub fn validate_name(input: &str) -> Result<String> {
    let name = input.trim();
    if name.chars().count() < MIN_NAME_LENGTH {
        return Err(Error::NameTooShort);
    }
    Ok(name.to_string())
}

/// Normalize a phone number to digits only.
///
/// Spaces, dashes, dots and parentheses are ignored; a single leading `+`
/// is allowed. Anything else is rejected, as is a number with fewer than
/// [`MIN_PHONE_DIGITS`] digits.
pub fn normalize_phone(input: &str) -> Result<String> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '.' | '(' | ')'))
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);

    if digits.len() < MIN_PHONE_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidPhone(input.trim().to_string()));
    }

    Ok(digits.to_string())
}
