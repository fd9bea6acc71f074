//! Token id generation

use license_core::token::TOKEN_ID_BYTES;
use license_core::TokenId;
use rand::RngCore;

/// Supplies fresh token ids
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> TokenId;
}

/// 128 bits from the thread-local CSPRNG, hex encoded
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> TokenId {
        generate_token_id()
    }
}

/// Generate a random token id
pub fn generate_token_id() -> TokenId {
    let mut bytes = [0u8; TOKEN_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    TokenId(hex::encode(bytes))
}
