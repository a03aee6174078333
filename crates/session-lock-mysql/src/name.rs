//! MySQL lock name encoding.
//!
//! `GET_LOCK` rejects names longer than 64 characters. When enabled on the
//! provider, over-long keys are shortened to a readable prefix followed by a
//! Base32 digest of the full key, so distinct keys stay distinct.

use std::borrow::Cow;

use sha2::{Digest, Sha512};

/// Maximum length for MySQL lock names.
pub const MAX_NAME_LENGTH: usize = 64;

/// Characters of digest appended to a shortened name (160 bits).
const HASH_LENGTH: usize = 32;

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Returns `name` unchanged when MySQL accepts it, otherwise a 64-character
/// name derived from it.
pub fn encode_lock_name(name: &str) -> Cow<'_, str> {
    if name.chars().count() <= MAX_NAME_LENGTH {
        return Cow::Borrowed(name);
    }

    let prefix: String = name.chars().take(MAX_NAME_LENGTH - HASH_LENGTH).collect();
    Cow::Owned(format!("{prefix}{}", digest(name.as_bytes())))
}

/// SHA-512 truncated to 160 bits, Base32 encoded.
fn digest(bytes: &[u8]) -> String {
    let hash = Sha512::digest(bytes);

    let mut out = String::with_capacity(HASH_LENGTH);
    let mut buffer = 0u32;
    let mut bits = 0;
    for &byte in &hash[..HASH_LENGTH * 5 / 8] {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 31) as usize] as char);
        }
    }
    out
}
