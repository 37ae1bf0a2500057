use soroban_sdk::Address;

use crate::CoreError;

const STRKEY_LEN: usize = 56;
const CONTRACT_VERSION_CHAR: u8 = b'C';

fn is_base32(c: u8) -> bool {
    matches!(c, b'A'..=b'Z' | b'2'..=b'7')
}

/// Accepts only contract strkeys (`C` followed by 55 base32 characters).
/// Account keys (`G...`) are rejected with `InvalidToken`.
pub fn validate_token(token: &Address) -> Result<(), CoreError> {
    let encoded = token.to_string();
    if encoded.len() as usize != STRKEY_LEN {
        return Err(CoreError::InvalidToken);
    }

    let mut chars = [0u8; STRKEY_LEN];
    encoded.copy_into_slice(&mut chars);
    match chars.split_first() {
        Some((&CONTRACT_VERSION_CHAR, body)) if body.iter().copied().all(is_base32) => Ok(()),
        _ => Err(CoreError::InvalidToken),
    }
}
